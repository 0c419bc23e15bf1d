//! # Siege Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Standard catalog and realm fixtures
//! - Determinism test harness
//! - Property-based testing strategies
//! - Battle balance sampling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
