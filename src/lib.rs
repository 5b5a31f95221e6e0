//! # quill-base
//!
//! Core library for template and configuration language tooling: parsing,
//! type resolution against an external oracle, diagnostics and IDE queries.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project   → Projects, workspace, settings, metadata cache
//!   ↓
//! ide       → IDE features (completion, hover, goto-def, code actions)
//!   ↓
//! hir       → Type resolution, scopes, user tags, config metadata, diagnostics
//!   ↓
//! syntax    → Arena tree shared by all front ends
//!   ↓
//! parser    → Template, properties and YAML front ends
//!   ↓
//! base      → Primitives (positions, cancellation, project ids)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → hir → ide → project)
// ============================================================================

/// Foundation types: positions, line index, cancellation
pub mod base;

/// Parser: fault-tolerant template, properties and YAML front ends
pub mod parser;

/// Syntax: the arena tree, node kinds and traversal
pub mod syntax;

/// Semantic layer: resolution, scopes, tags, config and diagnostics
pub mod hir;

/// IDE features: completion, hover, goto-definition, code actions
pub mod ide;

/// Project management: documents, settings, per-project caches
pub mod project;

// Re-export foundation types
pub use base::{
    Cancelled, CancellationToken, LineCol, LineIndex, Position, PositionEncoding, ProjectId, Span,
    TextRange, TextSize,
};
pub use parser::parse;
pub use project::{Project, ProjectError, ProjectSettings, ValidationSettings, Workspace};
pub use syntax::{Document, DocumentKind};
