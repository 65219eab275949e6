//! Shared test utilities for deedindex integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against a file-backed database
//! - Builders for spreadsheet fixtures (CSV and XLSX bytes)

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
