//! Data structures for catalog definitions.
//!
//! Plain deserializable mirrors of [`AssetSpec`](crate::catalog::AssetSpec)
//! and [`Prerequisite`](crate::requirements::Prerequisite), loaded from RON
//! and validated before they are turned into a registry and graph.
//!
//! **Note:** This module contains no IO - callers read the file and hand the
//! text to [`CatalogData::from_ron_str`].

mod asset_data;
mod catalog_data;

pub use asset_data::{AssetData, RequirementData};
pub use catalog_data::CatalogData;
