//! # Siege Development Tools
//!
//! Command-line tools for development:
//! - Catalog validators
//! - Scripted scenario runner

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod scenario;
pub mod validate;
