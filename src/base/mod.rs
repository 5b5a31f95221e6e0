//! Foundation types for the quill toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Position`], [`Span`] - Editor positions for ranges
//! - [`Cancelled`] - Cooperative cancellation outcome
//! - [`ProjectId`] - Project identity
//!
//! This module has NO dependencies on other quill modules.

pub mod cancel;
mod position;
mod project_id;

pub use cancel::Cancelled;
pub use position::{LineCol, LineIndex, Position, PositionEncoding, Span};
pub use project_id::ProjectId;

// Re-export text-size types for convenience
pub use text_size;
pub use text_size::{TextRange, TextSize};
pub use tokio_util::sync::CancellationToken;
