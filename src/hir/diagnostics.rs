//! Diagnostics: structural, reference and configuration checks.
//!
//! [`DocumentChecker`] runs every check that applies to a document's kind
//! and then applies [`DiagnosticOptions`]: per-check severity overrides and
//! exclusion globs matched against each diagnostic's key.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::base::{Cancelled, Span, cancel};
use crate::parser::expression::chain_text;
use crate::syntax::{Document, DocumentKind, NodeId, NodeKind, SectionKind};

use super::config::{ConfigMetadata, check_value, config_entries};
use super::exclusion::ExclusionFilter;
use super::oracle::MemberKind;
use super::resolve::Resolver;
use super::tags::TagSnapshot;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// What a diagnostic reports. Every code is a check that can be configured
/// on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UnknownObject,
    UnknownNamespace,
    UnknownProperty,
    UnknownMethod,
    DuplicateKey,
    MissingSeparator,
    UnclosedSection,
    UnclosedCollection,
    UnknownConfigProperty,
    ValueTypeMismatch,
    UnknownSection,
    MissingTagParameter,
}

impl DiagnosticCode {
    pub const ALL: &'static [DiagnosticCode] = &[
        DiagnosticCode::UnknownObject,
        DiagnosticCode::UnknownNamespace,
        DiagnosticCode::UnknownProperty,
        DiagnosticCode::UnknownMethod,
        DiagnosticCode::DuplicateKey,
        DiagnosticCode::MissingSeparator,
        DiagnosticCode::UnclosedSection,
        DiagnosticCode::UnclosedCollection,
        DiagnosticCode::UnknownConfigProperty,
        DiagnosticCode::ValueTypeMismatch,
        DiagnosticCode::UnknownSection,
        DiagnosticCode::MissingTagParameter,
    ];

    /// The code as sent to clients and used as the settings key.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnknownObject => "unknownObject",
            DiagnosticCode::UnknownNamespace => "unknownNamespace",
            DiagnosticCode::UnknownProperty => "unknownProperty",
            DiagnosticCode::UnknownMethod => "unknownMethod",
            DiagnosticCode::DuplicateKey => "duplicateKey",
            DiagnosticCode::MissingSeparator => "missingSeparator",
            DiagnosticCode::UnclosedSection => "unclosedSection",
            DiagnosticCode::UnclosedCollection => "unclosedCollection",
            DiagnosticCode::UnknownConfigProperty => "unknownConfigProperty",
            DiagnosticCode::ValueTypeMismatch => "valueTypeMismatch",
            DiagnosticCode::UnknownSection => "unknownSection",
            DiagnosticCode::MissingTagParameter => "missingTagParameter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::DuplicateKey
            | DiagnosticCode::UnknownConfigProperty
            | DiagnosticCode::MissingTagParameter => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Extra data for quick fixes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticData {
    /// An unresolved first part.
    Reference {
        name: SmolStr,
        part: NodeId,
        expression: NodeId,
    },
    /// An unresolved member of a resolved type.
    Member {
        name: SmolStr,
        base_type: SmolStr,
        kind: MemberKind,
        part: NodeId,
    },
    Namespace { namespace: SmolStr },
    ConfigKey { key: String },
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    pub uri: Arc<str>,
    pub range: TextRange,
    pub span: Span,
    pub message: Arc<str>,
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub uri: Arc<str>,
    pub range: TextRange,
    /// Editor span of `range`.
    pub span: Span,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: Arc<str>,
    /// What exclusion globs are matched against (key path or chain text).
    pub key: Option<SmolStr>,
    pub data: Option<DiagnosticData>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn new(doc: &Document, range: TextRange, code: DiagnosticCode, message: impl Into<Arc<str>>) -> Self {
        Self {
            uri: Arc::clone(doc.uri()),
            range,
            span: doc.span(range),
            severity: code.default_severity(),
            code,
            message: message.into(),
            key: None,
            data: None,
            related: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_data(mut self, data: DiagnosticData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Per-check configuration.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// `None` keeps the default severity.
    pub severity: Option<Severity>,
    /// Drop the check's diagnostics entirely.
    pub ignore: bool,
    pub exclusions: ExclusionFilter,
}

#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub enabled: bool,
    pub exclusions: ExclusionFilter,
    pub checks: FxHashMap<DiagnosticCode, CheckOptions>,
    /// Matched against document URIs.
    pub disabled_documents: ExclusionFilter,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            exclusions: ExclusionFilter::default(),
            checks: FxHashMap::default(),
            disabled_documents: ExclusionFilter::default(),
        }
    }
}

impl DiagnosticOptions {
    pub fn is_document_disabled(&self, uri: &str) -> bool {
        !self.enabled || self.disabled_documents.is_excluded(uri)
    }

    /// Apply severity overrides and exclusions; `None` drops the diagnostic.
    /// Exclusion never downgrades, it removes.
    pub fn apply(&self, mut diagnostic: Diagnostic) -> Option<Diagnostic> {
        let check = self.checks.get(&diagnostic.code);
        if check.is_some_and(|c| c.ignore) {
            return None;
        }
        if let Some(key) = diagnostic.key.as_deref() {
            let excluded = self.exclusions.is_excluded(key)
                || check.is_some_and(|c| c.exclusions.is_excluded(key));
            if excluded {
                return None;
            }
        }
        if let Some(severity) = check.and_then(|c| c.severity) {
            diagnostic.severity = severity;
        }
        Some(diagnostic)
    }
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during a check.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

// ============================================================================
// DOCUMENT CHECKER
// ============================================================================

/// Everything a check may consult besides the document itself.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub resolver: &'a Resolver,
    pub tags: &'a TagSnapshot,
    pub config: &'a ConfigMetadata,
    /// Free names in tag templates are parameters, not errors.
    pub is_tag_template: bool,
    pub options: &'a DiagnosticOptions,
}

/// Runs the checks for one document.
pub struct DocumentChecker<'a> {
    ctx: CheckContext<'a>,
    collector: DiagnosticCollector,
}

/// Check a document with `ctx`.
pub fn check_document(
    ctx: CheckContext<'_>,
    doc: &Document,
    cancel: &CancellationToken,
) -> Result<Vec<Diagnostic>, Cancelled> {
    DocumentChecker::new(ctx).check(doc, cancel)
}

impl<'a> DocumentChecker<'a> {
    pub fn new(ctx: CheckContext<'a>) -> Self {
        Self {
            ctx,
            collector: DiagnosticCollector::new(),
        }
    }

    pub fn check(mut self, doc: &Document, cancel: &CancellationToken) -> Result<Vec<Diagnostic>, Cancelled> {
        if self.ctx.options.is_document_disabled(doc.uri()) {
            return Ok(Vec::new());
        }
        match doc.kind() {
            DocumentKind::Template => self.check_template(doc, cancel)?,
            DocumentKind::Properties => {
                let root = doc.root();
                self.check_duplicate_keys(doc, root);
                self.check_separators(doc);
                self.check_config(doc, cancel)?;
            }
            DocumentKind::Yaml => {
                for id in doc.ids() {
                    cancel::check(cancel)?;
                    let kind = doc.kind_of(id);
                    if matches!(kind, NodeKind::Mapping { .. }) {
                        self.check_duplicate_keys(doc, id);
                    }
                    if kind.is_flow() && !doc.node(id).closed {
                        self.unclosed_collection(doc, id);
                    }
                }
                self.check_config(doc, cancel)?;
            }
        }

        let options = self.ctx.options;
        let diagnostics: Vec<Diagnostic> = self
            .collector
            .take()
            .into_iter()
            .filter_map(|d| options.apply(d))
            .collect();
        debug!(uri = %doc.uri(), count = diagnostics.len(), "checked document");
        Ok(diagnostics)
    }

    // ------------------------------------------------------------------
    // templates
    // ------------------------------------------------------------------

    fn check_template(&mut self, doc: &Document, cancel: &CancellationToken) -> Result<(), Cancelled> {
        for id in doc.ids() {
            cancel::check(cancel)?;
            match doc.kind_of(id) {
                NodeKind::Section(section) => {
                    if !doc.node(id).closed {
                        self.collector.add(
                            Diagnostic::new(
                                doc,
                                section.start_tag,
                                DiagnosticCode::UnclosedSection,
                                format!("Section '{{#{}}}' is not closed", section.name),
                            )
                            .with_key(section.name.clone()),
                        );
                    }
                    if section.kind == SectionKind::UserTag {
                        self.check_user_tag(doc, id, &section.name, section.start_tag, cancel)?;
                    }
                }
                NodeKind::Expression(_) => self.check_expression(doc, id, cancel)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn check_user_tag(
        &mut self,
        doc: &Document,
        section: NodeId,
        name: &SmolStr,
        start_tag: TextRange,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let Some(tag) = self.ctx.tags.get(name) else {
            self.collector.add(
                Diagnostic::new(
                    doc,
                    start_tag,
                    DiagnosticCode::UnknownSection,
                    format!("No section helper or user tag named '{name}'"),
                )
                .with_key(name.clone()),
            );
            return Ok(());
        };

        let mut named = Vec::new();
        let mut positional = 0usize;
        for &child in doc.children(section) {
            if let NodeKind::Parameter(data) = doc.kind_of(child) {
                match &data.name {
                    Some(n) => named.push(n.clone()),
                    None => positional += 1,
                }
            }
        }
        let signature = tag.signature(cancel)?;
        for parameter in signature.required() {
            let supplied = named.contains(&parameter.name) || (parameter.name == "it" && positional > 0);
            if !supplied {
                self.collector.add(
                    Diagnostic::new(
                        doc,
                        start_tag,
                        DiagnosticCode::MissingTagParameter,
                        format!("Missing required parameter '{}' of tag '{name}'", parameter.name),
                    )
                    .with_key(format!("{name}.{}", parameter.name)),
                );
            }
        }
        Ok(())
    }

    fn check_expression(&mut self, doc: &Document, expression: NodeId, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let optional = matches!(doc.kind_of(expression), NodeKind::Expression(data) if data.optional);
        let chain = self.ctx.resolver.resolve_chain(doc, expression, cancel)?;
        let Some((index, link)) = chain.first_unresolved() else {
            return Ok(());
        };
        let part = link.part;
        let Some(name) = doc.kind_of(part).part_name().cloned() else {
            return Ok(());
        };
        let range = doc.part_name_range(part);

        if index == 0 {
            if let Some(namespace) = doc.part_namespace(part)
                && self.ctx.resolver.namespace(namespace).is_none()
            {
                if optional {
                    return Ok(());
                }
                let namespace_part = doc.prev_sibling(part).unwrap_or(part);
                self.collector.add(
                    Diagnostic::new(
                        doc,
                        doc.part_name_range(namespace_part),
                        DiagnosticCode::UnknownNamespace,
                        format!("No namespace resolver found for '{namespace}'"),
                    )
                    .with_key(namespace.clone())
                    .with_data(DiagnosticData::Namespace {
                        namespace: namespace.clone(),
                    }),
                );
                return Ok(());
            }
            if optional || self.ctx.is_tag_template {
                return Ok(());
            }
            self.collector.add(
                Diagnostic::new(
                    doc,
                    range,
                    DiagnosticCode::UnknownObject,
                    format!("'{name}' cannot be resolved to an object"),
                )
                .with_key(chain_text(doc, part))
                .with_data(DiagnosticData::Reference {
                    name,
                    part,
                    expression,
                }),
            );
            return Ok(());
        }

        let Some(base) = chain.base_type(index) else {
            return Ok(());
        };
        let (code, kind, what) = match doc.kind_of(part) {
            NodeKind::MethodPart(_) => (DiagnosticCode::UnknownMethod, MemberKind::Method, "method"),
            _ => (DiagnosticCode::UnknownProperty, MemberKind::Property, "property"),
        };
        let base_type = SmolStr::new(base.name());
        self.collector.add(
            Diagnostic::new(
                doc,
                range,
                code,
                format!("'{name}' cannot be resolved to a {what} of '{base}'"),
            )
            .with_key(chain_text(doc, part))
            .with_data(DiagnosticData::Member {
                name,
                base_type,
                kind,
                part,
            }),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // configuration
    // ------------------------------------------------------------------

    /// Keys of `container`'s properties that occur more than once; every
    /// occurrence is reported. The profile prefix is part of the key.
    fn check_duplicate_keys(&mut self, doc: &Document, container: NodeId) {
        let mut by_key: FxHashMap<&str, Vec<NodeId>> = FxHashMap::default();
        let mut order = Vec::new();
        for &child in doc.children(container) {
            let NodeKind::Property(data) = doc.kind_of(child) else {
                continue;
            };
            let Some(key) = data.key else { continue };
            let text = doc.scalar_text(key);
            let occurrences = by_key.entry(text).or_default();
            if occurrences.is_empty() {
                order.push(text);
            }
            occurrences.push(key);
        }

        for key in order {
            let occurrences = &by_key[key];
            if occurrences.len() < 2 {
                continue;
            }
            for &node in occurrences {
                let mut diagnostic = Diagnostic::new(
                    doc,
                    doc.range(node),
                    DiagnosticCode::DuplicateKey,
                    format!("Duplicate key '{key}'"),
                )
                .with_key(key);
                for &other in occurrences.iter().filter(|&&o| o != node) {
                    let range = doc.range(other);
                    diagnostic = diagnostic.with_related(RelatedInfo {
                        uri: Arc::clone(doc.uri()),
                        range,
                        span: doc.span(range),
                        message: Arc::from(format!("'{key}' is also defined here")),
                    });
                }
                self.collector.add(diagnostic);
            }
        }
    }

    fn check_separators(&mut self, doc: &Document) {
        for &child in doc.children(doc.root()) {
            let NodeKind::Property(data) = doc.kind_of(child) else {
                continue;
            };
            if data.separator.is_some() {
                continue;
            }
            let Some(key) = data.key else { continue };
            let text = doc.text_of(key);
            self.collector.add(
                Diagnostic::new(
                    doc,
                    doc.range(key),
                    DiagnosticCode::MissingSeparator,
                    format!("Missing '=' after key '{text}'"),
                )
                .with_key(text),
            );
        }
    }

    fn unclosed_collection(&mut self, doc: &Document, node: NodeId) {
        let start = doc.range(node).start();
        let (open, close) = match doc.kind_of(node) {
            NodeKind::Mapping { .. } => ('{', '}'),
            _ => ('[', ']'),
        };
        let mut diagnostic = Diagnostic::new(
            doc,
            TextRange::at(start, TextSize::of(open)),
            DiagnosticCode::UnclosedCollection,
            format!("'{open}' is not closed by '{close}'"),
        );
        let key = enclosing_key_path(doc, node);
        if !key.is_empty() {
            diagnostic = diagnostic.with_key(key);
        }
        self.collector.add(diagnostic);
    }

    fn check_config(&mut self, doc: &Document, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if self.ctx.config.is_empty() {
            return Ok(());
        }
        for entry in config_entries(doc) {
            cancel::check(cancel)?;
            if entry.key == "config_ordinal" {
                continue;
            }
            let Some(info) = self.ctx.config.lookup(&entry.key) else {
                self.collector.add(
                    Diagnostic::new(
                        doc,
                        entry.key_range,
                        DiagnosticCode::UnknownConfigProperty,
                        format!("Unknown property '{}'", entry.key),
                    )
                    .with_key(entry.key.as_str())
                    .with_data(DiagnosticData::ConfigKey {
                        key: entry.key.clone(),
                    }),
                );
                continue;
            };
            let (Some(value), Some(value_range)) = (&entry.value, entry.value_range) else {
                continue;
            };
            if let Err(mismatch) = check_value(info, value) {
                self.collector.add(
                    Diagnostic::new(doc, value_range, DiagnosticCode::ValueTypeMismatch, mismatch.to_string())
                        .with_key(entry.key.as_str()),
                );
            }
        }
        Ok(())
    }
}

/// Dotted key path of the properties enclosing `node`, outermost first.
fn enclosing_key_path(doc: &Document, node: NodeId) -> String {
    let mut keys: Vec<&str> = std::iter::once(node)
        .chain(doc.ancestors(node))
        .filter_map(|id| doc.property_key(id))
        .filter(|key| *key != "~")
        .collect();
    keys.reverse();
    keys.join(".")
}
