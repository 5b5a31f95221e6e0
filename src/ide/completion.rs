//! Completion suggestions implementation.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use crate::base::Cancelled;
use crate::hir::{
    LinkState, MemberForm, MemberInfo, ResolvedType, ScopeEntry, strip_profile, visible_bindings,
    visible_scopes,
};
use crate::syntax::{Document, DocumentKind, NodeId, NodeKind, SectionKind};

use super::analysis::Analysis;
use super::text_utils::{char_before, line_prefix, word_start};

/// Value resolvers every object answers to.
const VALUE_RESOLVERS: &[(&str, &str)] = &[
    ("or", "Default when the value is null or not found"),
    ("orEmpty", "Empty list when the value is null"),
    ("ifTruthy", "The argument when the value is truthy"),
    ("raw", "Skip escaping"),
    ("safe", "Skip escaping"),
];

/// Kind of completion item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    Field,
    Method,
    Variable,
    Namespace,
    Section,
    UserTag,
    Property,
    Value,
    Keyword,
}

impl CompletionKind {
    /// Convert to LSP completion item kind number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            CompletionKind::Field => 5,
            CompletionKind::Method => 2,
            CompletionKind::Variable => 6,
            CompletionKind::Namespace => 9, // Module
            CompletionKind::Section => 14,  // Keyword
            CompletionKind::UserTag => 15,  // Snippet
            CompletionKind::Property => 10,
            CompletionKind::Value => 12,
            CompletionKind::Keyword => 14,
        }
    }
}

/// A completion suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    /// The text to insert.
    pub label: Arc<str>,
    /// The kind of completion.
    pub kind: CompletionKind,
    /// Detail text (shown after label).
    pub detail: Option<Arc<str>>,
    /// Documentation (shown in popup).
    pub documentation: Option<Arc<str>>,
    /// Text to insert (if different from label).
    pub insert_text: Option<Arc<str>>,
    /// Sort priority (lower = higher priority).
    pub sort_priority: u32,
}

impl CompletionItem {
    /// Create a new completion item.
    pub fn new(label: impl Into<Arc<str>>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            insert_text: None,
            sort_priority: 100,
        }
    }

    /// Set the detail text.
    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the documentation.
    pub fn with_documentation(mut self, doc: impl Into<Arc<str>>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    /// Set the insert text.
    pub fn with_insert_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.insert_text = Some(text.into());
        self
    }

    /// Set the sort priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.sort_priority = priority;
        self
    }
}

/// Get completions at a byte offset.
///
/// Items are filtered by the identifier typed so far and sorted by
/// priority, then label.
pub fn completions(
    analysis: &Analysis,
    offset: TextSize,
    cancel: &CancellationToken,
) -> Result<Vec<CompletionItem>, Cancelled> {
    let doc = analysis.document();
    let text = doc.text();
    let (prefix, mut items) = match doc.kind() {
        DocumentKind::Template => {
            let start = word_start(text, offset);
            let items = template_completions(analysis, start, offset, cancel)?;
            (doc.slice(TextRange::new(start, offset)), items)
        }
        DocumentKind::Properties => {
            let line = line_prefix(text, offset);
            let typed = match line.find(['=', ':']) {
                Some(separator) => line[separator + 1..].trim_start(),
                None => line.trim_start(),
            };
            (typed, properties_completions(analysis, line))
        }
        DocumentKind::Yaml => return Ok(Vec::new()),
    };

    let mut seen = FxHashSet::default();
    items.retain(|item| item.label.starts_with(prefix) && seen.insert(item.label.clone()));
    items.sort_by(|a, b| {
        a.sort_priority
            .cmp(&b.sort_priority)
            .then_with(|| a.label.cmp(&b.label))
    });
    Ok(items)
}

// ============================================================================
// TEMPLATES
// ============================================================================

fn template_completions(
    analysis: &Analysis,
    word: TextSize,
    offset: TextSize,
    cancel: &CancellationToken,
) -> Result<Vec<CompletionItem>, Cancelled> {
    let doc = analysis.document();
    let text = doc.text();
    match char_before(text, word) {
        Some('#') if text[..usize::from(word)].ends_with("{#") => Ok(section_items(analysis, cancel)),
        Some('.') => member_completions(analysis, word - TextSize::of('.'), cancel),
        Some(':') => Ok(namespace_member_items(analysis, word - TextSize::of(':'))),
        Some('{') => scope_items(analysis, doc.node_at_offset(offset), cancel),
        _ => {
            let at = doc.node_at_offset(offset);
            let in_expression = std::iter::once(at)
                .chain(doc.ancestors(at))
                .any(|id| matches!(doc.kind_of(id), NodeKind::Expression(_) | NodeKind::Parameter(_)));
            if in_expression {
                scope_items(analysis, at, cancel)
            } else {
                Ok(Vec::new())
            }
        }
    }
}

fn section_items(analysis: &Analysis, cancel: &CancellationToken) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = SectionKind::BUILTIN_NAMES
        .iter()
        .map(|name| CompletionItem::new(*name, CompletionKind::Section).with_priority(10))
        .collect();
    for tag in analysis.tags().iter() {
        let mut item = CompletionItem::new(tag.name.as_str(), CompletionKind::UserTag)
            .with_detail("user tag")
            .with_priority(20);
        if let Ok(signature) = tag.signature(cancel) {
            let required: Vec<String> = signature
                .required()
                .map(|p| format!("{}=", p.name))
                .collect();
            if !required.is_empty() {
                item = item.with_insert_text(format!("{} {} /", tag.name, required.join(" ")));
            }
        }
        items.push(item);
    }
    items
}

/// Members of whatever the part ending at `dot` resolves to.
fn member_completions(
    analysis: &Analysis,
    dot: TextSize,
    cancel: &CancellationToken,
) -> Result<Vec<CompletionItem>, Cancelled> {
    let doc = analysis.document();
    let Some((expression, part)) = part_before(doc, dot) else {
        return Ok(Vec::new());
    };
    let chain = analysis.resolver().resolve_chain(doc, expression, cancel)?;
    let Some(ty) = chain.link_for(part).and_then(|l| l.state.resolved()) else {
        return Ok(Vec::new());
    };
    let mut items = member_items(analysis, ty);
    items.extend(VALUE_RESOLVERS.iter().map(|(name, doc)| {
        CompletionItem::new(*name, CompletionKind::Keyword)
            .with_documentation(*doc)
            .with_priority(200)
    }));
    Ok(items)
}

/// The expression and the last part ending at or before `dot`.
fn part_before(doc: &Document, dot: TextSize) -> Option<(NodeId, NodeId)> {
    let at = doc.node_at_offset(dot);
    let expression = std::iter::once(at)
        .chain(doc.ancestors(at))
        .find(|&id| matches!(doc.kind_of(id), NodeKind::Expression(_)))?;
    let part = doc
        .parts(expression)
        .filter(|&p| !matches!(doc.kind_of(p), NodeKind::NamespacePart(_)))
        .filter(|&p| doc.range(p).end() <= dot)
        .last()?;
    Some((expression, part))
}

fn member_items(analysis: &Analysis, ty: &ResolvedType) -> Vec<CompletionItem> {
    let resolver = analysis.resolver();
    let ty = match resolver.unwrap_async(ty) {
        LinkState::Resolved(inner) => inner,
        _ => ty.clone(),
    };
    let mut items = Vec::new();
    for member in resolver.members_of(&ty) {
        items.extend(member_item(&member));
    }
    items
}

fn member_item(member: &MemberInfo) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    let documented = |item: CompletionItem| match &member.doc {
        Some(doc) => item.with_documentation(doc.as_str()),
        None => item,
    };
    match member.form {
        MemberForm::Field => {
            items.push(documented(
                CompletionItem::new(member.name.as_str(), CompletionKind::Field)
                    .with_detail(member.return_type.to_string()),
            ));
        }
        MemberForm::Method => {
            if let Some(property) = member.getter_property() {
                items.push(documented(
                    CompletionItem::new(property, CompletionKind::Field)
                        .with_detail(member.return_type.to_string()),
                ));
            }
            let insert = if member.parameters.is_empty() {
                format!("{}()", member.name)
            } else {
                format!("{}(", member.name)
            };
            items.push(documented(
                CompletionItem::new(member.name.as_str(), CompletionKind::Method)
                    .with_detail(member.signature())
                    .with_insert_text(insert)
                    .with_priority(110),
            ));
        }
    }
    items
}

fn namespace_member_items(analysis: &Analysis, colon: TextSize) -> Vec<CompletionItem> {
    let doc = analysis.document();
    let start = word_start(doc.text(), colon);
    let name = doc.slice(TextRange::new(start, colon));
    let Some(namespace) = analysis.resolver().namespace(name) else {
        return Vec::new();
    };
    match analysis.resolver().resolve_type_name(&namespace.root_type) {
        LinkState::Resolved(root) => member_items(analysis, &root),
        _ => Vec::new(),
    }
}

/// Bindings, `with` members and namespaces visible at `at`.
fn scope_items(analysis: &Analysis, at: NodeId, cancel: &CancellationToken) -> Result<Vec<CompletionItem>, Cancelled> {
    let doc = analysis.document();
    let resolver = analysis.resolver();
    let mut items = Vec::new();

    for binding in visible_bindings(doc, at) {
        let mut item = CompletionItem::new(binding.name.as_str(), CompletionKind::Variable).with_priority(10);
        if let LinkState::Resolved(ty) = resolver.binding_type(doc, &binding, cancel)? {
            item = item.with_detail(ty.to_string());
        }
        items.push(item);
    }

    for entry in visible_scopes(doc, at) {
        if let ScopeEntry::With { expression, .. } = entry
            && let LinkState::Resolved(ty) = resolver.type_of_expression(doc, expression, cancel)?
        {
            items.extend(member_items(analysis, &ty).into_iter().map(|i| i.with_priority(20)));
        }
    }

    items.extend(resolver.namespaces().iter().map(|ns| {
        CompletionItem::new(format!("{}:", ns.namespace), CompletionKind::Namespace)
            .with_detail(ns.root_type.as_str())
            .with_priority(30)
    }));
    Ok(items)
}

// ============================================================================
// PROPERTIES
// ============================================================================

/// Keys before the separator, values after it. `line` ends at the cursor.
fn properties_completions(analysis: &Analysis, line: &str) -> Vec<CompletionItem> {
    if line.trim_start().starts_with(['#', '!']) {
        return Vec::new();
    }
    match line.find(['=', ':']) {
        None => analysis
            .config()
            .iter()
            .map(|info| {
                let mut item = CompletionItem::new(info.name.as_str(), CompletionKind::Property)
                    .with_detail(info.type_name.as_str())
                    .with_insert_text(format!("{}=", info.name));
                if let Some(description) = &info.description {
                    item = item.with_documentation(description.as_str());
                }
                item
            })
            .collect(),
        Some(separator) => {
            let key = line[..separator].trim();
            let Some(info) = analysis.config().lookup(strip_profile(key).1) else {
                return Vec::new();
            };
            let mut values: Vec<&str> = info.enum_values.iter().map(|v| v.as_str()).collect();
            if values.is_empty() && matches!(info.type_name.as_str(), "boolean" | "java.lang.Boolean") {
                values = vec!["true", "false"];
            }
            values
                .into_iter()
                .map(|v| CompletionItem::new(v, CompletionKind::Value))
                .collect()
        }
    }
}
