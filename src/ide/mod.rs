//! IDE features: high-level APIs for editor requests.
//!
//! Everything here reads an [`Analysis`] snapshot: one parsed document plus
//! the resolver, tag and configuration views that were current when the
//! snapshot was taken.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: Take data in, return data out
//! 2. **No protocol types**: Ranges, spans and kinds are our own
//! 3. **Composable**: Built on top of HIR queries
//!
//! ## Usage
//!
//! ```ignore
//! use quill::ide::Analysis;
//!
//! let analysis = project.analysis("file:///templates/page.html").unwrap();
//! let hover = analysis.hover(Position::new(3, 10), &cancel)?;
//! ```

mod analysis;
mod code_actions;
mod completion;
mod goto;
mod hover;
mod suggest;
pub mod text_utils;

pub use analysis::Analysis;
pub use code_actions::{CodeAction, CodeActionKind, TextEdit, WorkspaceEdit, code_actions};
pub use completion::{CompletionItem, CompletionKind, completions};
pub use goto::{GotoResult, GotoTarget, goto_definition};
pub use hover::{HoverResult, hover};
pub use suggest::{is_similar, similar_names, suggestions};
