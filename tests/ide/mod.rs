//! IDE layer tests
//!
//! Tests for editor features over project snapshots:
//! - Similarity suggestions and quick fixes
//! - Hover, completion and goto-definition at editor positions

pub mod tests_features;
pub mod tests_quick_fixes;
