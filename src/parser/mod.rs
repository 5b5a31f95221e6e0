//! Fault-tolerant front ends for templates and configuration files
//!
//! Every front end builds the same arena tree ([`Document`]) and never fails on
//! malformed input: unterminated constructs are kept with `closed == false`
//! and the only error is cancellation.
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! template  → Text / Comment / Section / ParameterDeclaration
//!     ↓           └─ expression (logos) → part chains
//! properties (logos) → Property(key, value) / Comment
//! yaml scanner → builder → Mapping / Sequence / Property / Scalar
//!     ↓
//! Document (arena, NodeId links)
//! ```
//!
//! Documents are rebuilt wholesale on every edit.

pub mod expression;
pub mod properties;
pub mod template;
pub mod yaml;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::base::{Cancelled, PositionEncoding};
use crate::syntax::{Document, DocumentKind};

/// Parse `text` with the front end chosen from the URI's extension.
pub fn parse(
    uri: impl Into<Arc<str>>,
    text: impl Into<Arc<str>>,
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    parse_with_encoding(uri, text, PositionEncoding::default(), cancel)
}

/// Like [`parse`], with an explicit column encoding for editor positions.
pub fn parse_with_encoding(
    uri: impl Into<Arc<str>>,
    text: impl Into<Arc<str>>,
    encoding: PositionEncoding,
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    let uri: Arc<str> = uri.into();
    let kind = DocumentKind::from_uri(&uri);
    let mut doc = Document::with_encoding(Arc::clone(&uri), kind, text, encoding);
    match kind {
        DocumentKind::Template => template::build(&mut doc, cancel)?,
        DocumentKind::Properties => properties::build(&mut doc, cancel)?,
        DocumentKind::Yaml => yaml::build_into(&mut doc, cancel)?,
    }
    debug!(uri = %uri, nodes = doc.len(), "parsed document");
    Ok(doc)
}
