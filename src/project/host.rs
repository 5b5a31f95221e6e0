//! Project: owns one document set and the caches built for it.
//!
//! All mutation goes through `&mut self` (document edits, settings) or the
//! serialized refresh of a [`SnapshotCell`] (oracle change events). Readers
//! take [`Analysis`] snapshots that keep working after later edits.
//!
//! ## Usage
//!
//! ```ignore
//! let mut project = Project::new(ProjectId::new("app"), oracle, ProjectSettings::default());
//! project.open_document("file:///app/templates/page.html", text, &cancel)?;
//! let diagnostics = project.diagnostics("file:///app/templates/page.html", &cancel)?;
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::base::{Cancelled, ProjectId};
use crate::hir::{
    CheckContext, ConfigMetadata, ConfigSources, Diagnostic, DiagnosticOptions, ResolutionCache,
    Resolver, SnapshotCell, TagRegistry, TagSnapshot, TypeOracle, check_document,
};
use crate::ide::Analysis;
use crate::parser;
use crate::syntax::{Document, DocumentKind};

use super::error::ProjectError;
use super::settings::{ProjectSettings, ValidationSettings};

/// One project: its open documents, user tags, configuration metadata and
/// resolution cache, and the oracle they are computed from.
pub struct Project {
    id: ProjectId,
    oracle: Arc<dyn TypeOracle>,
    settings: ProjectSettings,
    options: DiagnosticOptions,
    /// Open documents in the order they were opened.
    documents: IndexMap<Arc<str>, Arc<Document>>,
    tags: TagRegistry,
    config: SnapshotCell<ConfigMetadata>,
    cache: Arc<ResolutionCache>,
    resolver: Resolver,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

impl Project {
    /// Create a project and load its tags and configuration metadata.
    ///
    /// Oracle failures are logged; the project starts with empty snapshots
    /// and picks the data up on the next [`Project::on_type_info_changed`].
    pub fn new(id: ProjectId, oracle: Arc<dyn TypeOracle>, settings: ProjectSettings) -> Self {
        let cache = Arc::new(ResolutionCache::new());
        let resolver = Resolver::new(Arc::clone(&oracle), Arc::clone(&cache))
            .with_namespaces(settings.namespaces.clone());
        let project = Self {
            options: settings.validation.to_options(),
            tags: TagRegistry::new(settings.tag_roots.clone()),
            config: SnapshotCell::default(),
            documents: IndexMap::new(),
            id,
            oracle,
            settings,
            cache,
            resolver,
        };
        if let Err(err) = project.refresh() {
            warn!(project = %project.id, error = %err, "initial project load failed");
        }
        info!(project = %project.id, "project created");
        project
    }

    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    pub fn oracle(&self) -> &Arc<dyn TypeOracle> {
        &self.oracle
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Replace the validation settings. Takes effect on the next check.
    pub fn set_validation_settings(&mut self, validation: ValidationSettings) {
        self.options = validation.to_options();
        self.settings.validation = validation;
        debug!(project = %self.id, "validation settings updated");
    }

    // ------------------------------------------------------------------
    // documents
    // ------------------------------------------------------------------

    /// Parse and store a document. Opening an already open URI replaces it.
    pub fn open_document(
        &mut self,
        uri: impl Into<Arc<str>>,
        text: impl Into<Arc<str>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<Document>, Cancelled> {
        let uri: Arc<str> = uri.into();
        let doc = Arc::new(parser::parse_with_encoding(
            Arc::clone(&uri),
            text,
            self.settings.encoding,
            cancel,
        )?);
        self.tags.update_source(&uri, doc.text());
        self.documents.insert(uri, Arc::clone(&doc));
        Ok(doc)
    }

    /// Reparse an open document with its new text.
    pub fn update_document(
        &mut self,
        uri: &str,
        text: impl Into<Arc<str>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<Document>, ProjectError> {
        let Some(key) = self.documents.get_key_value(uri).map(|(k, _)| Arc::clone(k)) else {
            return Err(ProjectError::DocumentNotOpen(Arc::from(uri)));
        };
        Ok(self.open_document(key, text, cancel)?)
    }

    pub fn close_document(&mut self, uri: &str) -> Result<Arc<Document>, ProjectError> {
        let doc = self
            .documents
            .shift_remove(uri)
            .ok_or_else(|| ProjectError::DocumentNotOpen(Arc::from(uri)))?;
        self.tags.reload_source(uri);
        Ok(doc)
    }

    pub fn document(&self, uri: &str) -> Option<Arc<Document>> {
        self.documents.get(uri).cloned()
    }

    pub fn has_document(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    // ------------------------------------------------------------------
    // snapshots
    // ------------------------------------------------------------------

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn tags(&self) -> Arc<TagSnapshot> {
        self.tags.snapshot()
    }

    pub fn tag_registry(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn config(&self) -> Arc<ConfigMetadata> {
        self.config.load()
    }

    /// Every open properties and YAML document, in opening order.
    pub fn config_sources(&self) -> ConfigSources {
        let mut sources = ConfigSources::new();
        for doc in self.documents.values() {
            if doc.kind() != DocumentKind::Template {
                sources.add_document(doc);
            }
        }
        sources
    }

    /// An IDE snapshot of one open document.
    pub fn analysis(&self, uri: &str) -> Option<Analysis> {
        let doc = self.document(uri)?;
        Some(
            Analysis::new(doc, self.resolver.clone())
                .with_tags(self.tags())
                .with_config(self.config())
                .with_sources(Arc::new(self.config_sources())),
        )
    }

    // ------------------------------------------------------------------
    // diagnostics
    // ------------------------------------------------------------------

    /// Check one open document.
    pub fn diagnostics(&self, uri: &str, cancel: &CancellationToken) -> Result<Vec<Diagnostic>, ProjectError> {
        let doc = self
            .documents
            .get(uri)
            .ok_or_else(|| ProjectError::DocumentNotOpen(Arc::from(uri)))?;
        let tags = self.tags();
        let config = self.config();
        Ok(self.check(doc, &tags, &config, cancel)?)
    }

    /// Check every open document in parallel, in opening order.
    pub fn all_diagnostics(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<(Arc<str>, Vec<Diagnostic>)>, Cancelled> {
        let tags = self.tags();
        let config = self.config();
        let docs: Vec<&Arc<Document>> = self.documents.values().collect();
        docs.par_iter()
            .map(|doc| {
                let diagnostics = self.check(doc, &tags, &config, cancel)?;
                Ok((Arc::clone(doc.uri()), diagnostics))
            })
            .collect()
    }

    fn check(
        &self,
        doc: &Document,
        tags: &TagSnapshot,
        config: &ConfigMetadata,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>, Cancelled> {
        let ctx = CheckContext {
            resolver: &self.resolver,
            tags,
            config,
            is_tag_template: self.tags.is_tag_template(doc.uri()),
            options: &self.options,
        };
        check_document(ctx, doc, cancel)
    }

    // ------------------------------------------------------------------
    // oracle events
    // ------------------------------------------------------------------

    /// The oracle's view of this project changed: drop every cached
    /// resolution and reload tags and configuration metadata.
    ///
    /// The cache is cleared even when a reload fails.
    pub fn on_type_info_changed(&self) -> Result<(), ProjectError> {
        self.cache.invalidate();
        info!(
            project = %self.id,
            generation = self.cache.generation(),
            "type info changed, resolution cache invalidated"
        );
        self.refresh()
    }

    /// Reload tags and configuration metadata independently; the first
    /// failure is returned after both were attempted.
    fn refresh(&self) -> Result<(), ProjectError> {
        let tags = self
            .tags
            .refresh(self.oracle.as_ref(), &self.id)
            .map(|_| self.reapply_open_tags())
            .map_err(ProjectError::from);
        let oracle = &self.oracle;
        let id = &self.id;
        let config = self
            .config
            .refresh(|_| oracle.config_properties(id).map(ConfigMetadata::new))
            .map(drop)
            .map_err(|err| {
                warn!(project = %self.id, error = %err, "config metadata refresh failed");
                ProjectError::from(err)
            });
        tags.and(config)
    }

    /// Open tag templates win over what the tag roots hold on disk.
    fn reapply_open_tags(&self) {
        for (uri, doc) in &self.documents {
            self.tags.update_source(uri, doc.text());
        }
    }
}
