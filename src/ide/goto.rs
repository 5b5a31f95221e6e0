//! Go-to-definition implementation.

use std::sync::Arc;

use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use crate::base::{Cancelled, Span};
use crate::hir::{LinkState, Location};
use crate::syntax::{Document, DocumentKind, NodeKind, SectionKind};

use super::analysis::Analysis;

/// Result of a go-to-definition request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GotoResult {
    /// The targets to jump to.
    pub targets: Vec<GotoTarget>,
}

impl GotoResult {
    /// Create an empty result (no targets found).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result with a single target.
    pub fn single(target: GotoTarget) -> Self {
        Self {
            targets: vec![target],
        }
    }

    /// Check if any targets were found.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A target location for go-to-definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GotoTarget {
    pub uri: Arc<str>,
    pub span: Span,
    /// Byte range, when the target is in the same document.
    pub range: Option<TextRange>,
}

impl GotoTarget {
    fn local(doc: &Document, range: TextRange) -> Self {
        Self {
            uri: Arc::clone(doc.uri()),
            span: doc.span(range),
            range: Some(range),
        }
    }
}

impl From<&Location> for GotoTarget {
    fn from(location: &Location) -> Self {
        Self {
            uri: Arc::clone(&location.uri),
            span: location.span,
            range: None,
        }
    }
}

/// Go to definition at a byte offset.
///
/// Bindings jump to where they are introduced, members and declared types
/// to the location the oracle reports, user tags to their template.
pub fn goto_definition(
    analysis: &Analysis,
    offset: TextSize,
    cancel: &CancellationToken,
) -> Result<GotoResult, Cancelled> {
    let doc = analysis.document();
    if doc.kind() != DocumentKind::Template {
        return Ok(GotoResult::empty());
    }
    let at = doc.node_at_offset(offset);
    let Some(target) = std::iter::once(at).chain(doc.ancestors(at)).find(|&id| {
        let kind = doc.kind_of(id);
        kind.part_name().is_some()
            || matches!(kind, NodeKind::ParameterDeclaration(_) | NodeKind::Section(_))
    }) else {
        return Ok(GotoResult::empty());
    };

    let found = match doc.kind_of(target) {
        NodeKind::ParameterDeclaration(data) => {
            if !data.type_range.contains_inclusive(offset) {
                return Ok(GotoResult::empty());
            }
            match analysis.resolver().resolve_type_name(&data.type_name) {
                LinkState::Resolved(ty) => ty.info.location.as_ref().map(GotoTarget::from),
                _ => None,
            }
        }
        NodeKind::Section(section) => {
            let name_start = section.start_tag.start() + TextSize::new(2);
            let on_name = TextRange::at(name_start, TextSize::of(section.name.as_str()))
                .contains_inclusive(offset);
            if section.kind != SectionKind::UserTag || !on_name {
                return Ok(GotoResult::empty());
            }
            analysis.tags().get(&section.name).map(|tag| GotoTarget {
                uri: Arc::clone(&tag.uri),
                span: Span::from_coords(0, 0, 0, 0),
                range: None,
            })
        }
        NodeKind::NamespacePart(_) => None,
        _ => {
            let link = analysis.resolver().resolve_part(doc, target, cancel)?;
            link.and_then(|link| {
                if let Some(binding) = &link.binding {
                    return Some(GotoTarget::local(doc, binding.range));
                }
                link.member
                    .as_ref()
                    .and_then(|m| m.location.as_ref())
                    .map(GotoTarget::from)
            })
        }
    };
    Ok(found.map(GotoResult::single).unwrap_or_default())
}
