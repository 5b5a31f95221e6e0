//! Hover information implementation.

use std::fmt::Write;

use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use crate::base::{Cancelled, Span};
use crate::hir::{
    Binding, BindingKind, LinkState, MemberInfo, ResolvedType, config_entries, strip_profile,
};
use crate::syntax::{Document, DocumentKind, NodeId, NodeKind, SectionKind};

use super::analysis::Analysis;

/// Result of a hover request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverResult {
    /// The hover content (markdown).
    pub contents: String,
    /// The hovered range.
    pub range: TextRange,
    pub span: Span,
}

impl HoverResult {
    fn new(doc: &Document, contents: String, range: TextRange) -> Self {
        Self {
            contents,
            range,
            span: doc.span(range),
        }
    }
}

/// Get hover information at a byte offset.
pub fn hover(analysis: &Analysis, offset: TextSize, cancel: &CancellationToken) -> Result<Option<HoverResult>, Cancelled> {
    match analysis.document().kind() {
        DocumentKind::Template => template_hover(analysis, offset, cancel),
        DocumentKind::Properties | DocumentKind::Yaml => Ok(config_hover(analysis, offset)),
    }
}

fn template_hover(
    analysis: &Analysis,
    offset: TextSize,
    cancel: &CancellationToken,
) -> Result<Option<HoverResult>, Cancelled> {
    let doc = analysis.document();
    let at = doc.node_at_offset(offset);
    let target = std::iter::once(at).chain(doc.ancestors(at)).find(|&id| {
        matches!(
            doc.kind_of(id),
            NodeKind::ObjectPart(_)
                | NodeKind::PropertyPart(_)
                | NodeKind::MethodPart(_)
                | NodeKind::NamespacePart(_)
                | NodeKind::ParameterDeclaration(_)
                | NodeKind::Section(_)
        )
    });
    let Some(target) = target else {
        return Ok(None);
    };

    match doc.kind_of(target) {
        NodeKind::NamespacePart(data) => {
            let range = doc.part_name_range(target);
            let contents = match analysis.resolver().namespace(&data.name) {
                Some(ns) => format!("Namespace `{}:` resolves to `{}`", ns.namespace, ns.root_type),
                None => format!("Unknown namespace `{}:`", data.name),
            };
            Ok(Some(HoverResult::new(doc, contents, range)))
        }
        NodeKind::ParameterDeclaration(data) => {
            let contents = if data.type_range.contains_inclusive(offset) {
                match analysis.resolver().resolve_type_name(&data.type_name) {
                    LinkState::Resolved(ty) => type_contents(&ty),
                    _ => return Ok(None),
                }
            } else {
                format!("```java\n{} {}\n```", data.type_name, data.alias)
            };
            Ok(Some(HoverResult::new(doc, contents, doc.range(target))))
        }
        NodeKind::Section(section) => {
            let name_start = section.start_tag.start() + TextSize::new(2);
            let name_range = TextRange::at(name_start, TextSize::of(section.name.as_str()));
            if !name_range.contains_inclusive(offset) {
                return Ok(None);
            }
            let contents = if section.kind == SectionKind::UserTag {
                let Some(tag) = analysis.tags().get(&section.name) else {
                    return Ok(None);
                };
                let signature = tag.signature(cancel)?;
                let mut contents = format!("User tag `#{}`\n", tag.name);
                for parameter in &signature.parameters {
                    let _ = write!(contents, "\n- `{}`", parameter.name);
                    if parameter.required {
                        contents.push_str(" (required)");
                    } else if let Some(default) = &parameter.default_value {
                        let _ = write!(contents, " (default: `{default}`)");
                    }
                }
                if signature.accepts_dynamic_args {
                    contents.push_str("\n\nAccepts any named argument.");
                }
                contents
            } else {
                format!("Built-in section `#{}`", section.name)
            };
            Ok(Some(HoverResult::new(doc, contents, name_range)))
        }
        _ => part_hover(analysis, target, cancel),
    }
}

fn part_hover(analysis: &Analysis, part: NodeId, cancel: &CancellationToken) -> Result<Option<HoverResult>, Cancelled> {
    let doc = analysis.document();
    let Some(expression) = doc.owning_expression(part) else {
        return Ok(None);
    };
    let chain = analysis.resolver().resolve_chain(doc, expression, cancel)?;
    let Some(link) = chain.link_for(part) else {
        return Ok(None);
    };
    let contents = match (&link.member, &link.binding, &link.state) {
        (Some(member), _, _) => member_contents(member, link.state.resolved()),
        (None, Some(binding), state) => binding_contents(binding, state.resolved()),
        (None, None, LinkState::Resolved(ty)) => type_contents(ty),
        _ => return Ok(None),
    };
    Ok(Some(HoverResult::new(doc, contents, doc.part_name_range(part))))
}

fn member_contents(member: &MemberInfo, ty: Option<&ResolvedType>) -> String {
    let mut contents = format!("```java\n{}.{}\n```", member.declaring_type, member.signature());
    if let Some(ty) = ty {
        let _ = write!(contents, "\n\nType: `{ty}`");
    }
    if let Some(doc) = &member.doc {
        let _ = write!(contents, "\n\n{doc}");
    }
    contents
}

fn binding_contents(binding: &Binding, ty: Option<&ResolvedType>) -> String {
    let ty = ty.map_or_else(|| "?".to_owned(), ToString::to_string);
    let what = match binding.kind {
        BindingKind::Declaration => "parameter declaration",
        BindingKind::LoopAlias => "loop element",
        BindingKind::LoopMetadata => "loop metadata",
        BindingKind::Let => "let binding",
    };
    format!("```java\n{ty} {}\n```\n\n{what}", binding.name)
}

fn type_contents(ty: &ResolvedType) -> String {
    let mut contents = format!("```java\n{ty}\n```");
    if let Some(doc) = &ty.info.doc {
        let _ = write!(contents, "\n\n{doc}");
    }
    contents
}

fn config_hover(analysis: &Analysis, offset: TextSize) -> Option<HoverResult> {
    let doc = analysis.document();
    let entry = config_entries(doc)
        .into_iter()
        .find(|e| e.key_range.contains_inclusive(offset))?;

    let mut contents = format!("**{}**", entry.key);
    let info = analysis.config().lookup(&entry.key);
    if let Some(info) = info {
        let _ = write!(contents, "\n\nType: `{}`", info.type_name);
        if let Some(default) = &info.default_value {
            let _ = write!(contents, "\n\nDefault: `{default}`");
        }
        if !info.enum_values.is_empty() {
            let values: Vec<&str> = info.enum_values.iter().map(|v| v.as_str()).collect();
            let _ = write!(contents, "\n\nAllowed: `{}`", values.join("`, `"));
        }
        if let Some(description) = &info.description {
            let _ = write!(contents, "\n\n{description}");
        }
    }

    let (profile, _) = strip_profile(&entry.key);
    let effective = analysis.sources().effective(&entry.key, profile);
    if let Some(value) = effective.and_then(|e| e.entry.value.as_ref()) {
        let _ = write!(contents, "\n\nEffective value: `{value}`");
    }
    if info.is_none() && effective.is_none() {
        return None;
    }
    Some(HoverResult::new(doc, contents, entry.key_range))
}
