//! HIR layer tests
//!
//! Tests for the semantic model driven through a `Project`:
//! - Template reference diagnostics
//! - Configuration diagnostics (duplicates, metadata, values)
//! - Exclusion globs and severity settings
//! - User tag parameter inference from binary and source tags

pub mod tests_config_diagnostics;
pub mod tests_exclusions;
pub mod tests_tags;
pub mod tests_template_diagnostics;
