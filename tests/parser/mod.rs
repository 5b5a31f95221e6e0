//! Parser layer tests
//!
//! Tests for the three front ends through the public `parse` entry point:
//! - Termination and range nesting on well-formed and broken input
//! - Determinism of reparsing
//! - Closing rules for sections and flow collections

pub mod tests_tree_invariants;
pub mod tests_yaml_flow;
