//! Analysis: an immutable per-document snapshot for IDE queries.

use std::sync::Arc;

use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use crate::base::{Cancelled, Position, Span};
use crate::hir::{ConfigMetadata, ConfigSources, Diagnostic, Resolver, TagSnapshot};
use crate::syntax::Document;

use super::code_actions::CodeAction;
use super::completion::CompletionItem;
use super::goto::GotoResult;
use super::hover::HoverResult;

/// Everything an IDE request reads, captured at one point in time.
///
/// A project hands these out per document; edits after that produce new
/// snapshots and never change an existing one.
#[derive(Clone)]
pub struct Analysis {
    doc: Arc<Document>,
    resolver: Resolver,
    tags: Arc<TagSnapshot>,
    config: Arc<ConfigMetadata>,
    sources: Arc<ConfigSources>,
}

impl Analysis {
    pub fn new(doc: Arc<Document>, resolver: Resolver) -> Self {
        Self {
            doc,
            resolver,
            tags: Arc::default(),
            config: Arc::default(),
            sources: Arc::default(),
        }
    }

    pub fn with_tags(mut self, tags: Arc<TagSnapshot>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_config(mut self, config: Arc<ConfigMetadata>) -> Self {
        self.config = config;
        self
    }

    pub fn with_sources(mut self, sources: Arc<ConfigSources>) -> Self {
        self.sources = sources;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn tags(&self) -> &TagSnapshot {
        &self.tags
    }

    pub fn config(&self) -> &ConfigMetadata {
        &self.config
    }

    pub fn sources(&self) -> &ConfigSources {
        &self.sources
    }

    fn offset(&self, position: Position) -> Option<TextSize> {
        self.doc.offset(position)
    }

    // ==================== Position-based features ====================

    /// Get hover information at a position.
    pub fn hover(&self, position: Position, cancel: &CancellationToken) -> Result<Option<HoverResult>, Cancelled> {
        match self.offset(position) {
            Some(offset) => super::hover(self, offset, cancel),
            None => Ok(None),
        }
    }

    /// Get completions at a position.
    pub fn completions(
        &self,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompletionItem>, Cancelled> {
        match self.offset(position) {
            Some(offset) => super::completions(self, offset, cancel),
            None => Ok(Vec::new()),
        }
    }

    /// Go to definition at a position.
    pub fn goto_definition(&self, position: Position, cancel: &CancellationToken) -> Result<GotoResult, Cancelled> {
        match self.offset(position) {
            Some(offset) => super::goto_definition(self, offset, cancel),
            None => Ok(GotoResult::empty()),
        }
    }

    // ==================== Diagnostic-based features ====================

    /// Quick fixes for the diagnostics overlapping `span`.
    pub fn code_actions(&self, span: Span, diagnostics: &[Diagnostic]) -> Vec<CodeAction> {
        let start = self.offset(span.start).unwrap_or_default();
        let end = self
            .offset(span.end)
            .unwrap_or_else(|| TextSize::of(self.doc.text()));
        super::code_actions(self, TextRange::new(start, end.max(start)), diagnostics)
    }
}
