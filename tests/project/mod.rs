//! Project and workspace tests
//!
//! Tests for document lifecycle, config sources across documents and
//! the per-project isolation of a workspace.

pub mod tests_lifecycle;
pub mod tests_workspace;
