//! Syntax: the arena tree shared by all front ends.
//!
//! - [`Document`] - text, URI and node arena
//! - [`Node`], [`NodeKind`], [`NodeId`] - tree structure
//! - [`Visitor`], [`walk`] - traversal with pre/post hooks

pub mod file;
mod tree;
mod visitor;

pub use file::DocumentKind;
pub use tree::{
    DeclarationData, Document, ExpressionData, LiteralKind, Node, NodeId, NodeKind,
    ParameterData, PartData, PropertyData, ScalarKind, SectionData, SectionKind,
};
pub use visitor::{Visitor, WalkAction, walk};

// Re-export Position and Span from base for convenience
pub use crate::base::{Position, Span};
