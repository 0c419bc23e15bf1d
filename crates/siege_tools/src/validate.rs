//! Catalog validation.

use std::path::Path;

use serde::Serialize;
use siege_core::catalog::AssetCategory;
use siege_core::data::CatalogData;

use crate::error::{read_file, Result};

/// What a valid catalog file contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    /// File that was checked.
    pub path: String,
    /// Building definitions.
    pub buildings: usize,
    /// Unit definitions.
    pub units: usize,
    /// Assets that upgrade another asset.
    pub upgrades: usize,
    /// Prerequisite rules.
    pub requirements: usize,
}

/// Load and validate a RON catalog file.
///
/// # Errors
///
/// Returns an error if the file is missing, unparsable or inconsistent.
pub fn validate_catalog_file(path: &Path) -> Result<CatalogSummary> {
    let source = read_file(path)?;
    let data = CatalogData::from_ron_str(&path.display().to_string(), &source)?;
    Ok(summarize(&path.display().to_string(), &data))
}

/// Count what a parsed catalog defines.
#[must_use]
pub fn summarize(path: &str, data: &CatalogData) -> CatalogSummary {
    let units = data
        .assets
        .iter()
        .filter(|a| a.category == AssetCategory::Unit)
        .count();
    CatalogSummary {
        path: path.to_string(),
        buildings: data.assets.len() - units,
        units,
        upgrades: data.assets.iter().filter(|a| a.upgrade_of.is_some()).count(),
        requirements: data.requirements.len(),
    }
}
