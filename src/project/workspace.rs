//! Workspace: the set of projects open in one editor session.
//!
//! Change events name a project and only ever touch that project's caches.

use std::sync::Arc;

use futures::FutureExt;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::base::ProjectId;
use crate::hir::{ConfigMetadata, OracleError, TypeOracle};

use super::error::ProjectError;
use super::host::Project;
use super::metadata_cache::{MetadataCache, SharedFetch};
use super::settings::ProjectSettings;

/// Result of fetching a project's configuration metadata.
pub type MetadataResult = Result<Arc<ConfigMetadata>, OracleError>;

#[derive(Default)]
pub struct Workspace {
    projects: FxHashMap<ProjectId, Project>,
    metadata: MetadataCache<ProjectId, MetadataResult>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(
        &mut self,
        id: ProjectId,
        oracle: Arc<dyn TypeOracle>,
        settings: ProjectSettings,
    ) -> Result<&mut Project, ProjectError> {
        if self.projects.contains_key(&id) {
            return Err(ProjectError::DuplicateProject(id));
        }
        let project = Project::new(id.clone(), oracle, settings);
        Ok(self.projects.entry(id).or_insert(project))
    }

    /// Tear a project down with everything it cached.
    pub fn remove_project(&mut self, id: &ProjectId) -> Result<Project, ProjectError> {
        self.metadata.invalidate(id);
        let project = self
            .projects
            .remove(id)
            .ok_or_else(|| ProjectError::UnknownProject(id.clone()))?;
        info!(project = %id, "project removed");
        Ok(project)
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn project_mut(&mut self, id: &ProjectId) -> Option<&mut Project> {
        self.projects.get_mut(id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// The project that has `uri` open.
    pub fn project_for_document(&self, uri: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.has_document(uri))
    }

    /// Configuration metadata of a project, fetched once and shared by
    /// concurrent callers until the next change event for that project.
    pub fn config_metadata(&self, id: &ProjectId) -> Result<SharedFetch<MetadataResult>, ProjectError> {
        let project = self
            .projects
            .get(id)
            .ok_or_else(|| ProjectError::UnknownProject(id.clone()))?;
        let oracle = Arc::clone(project.oracle());
        let key = id.clone();
        Ok(self.metadata.get_or_fetch(id.clone(), move || {
            async move {
                oracle
                    .config_properties(&key)
                    .map(|properties| Arc::new(ConfigMetadata::new(properties)))
            }
            .boxed()
        }))
    }

    /// Push notification from the oracle: invalidate the named project only.
    pub fn on_type_info_changed(&self, id: &ProjectId) -> Result<(), ProjectError> {
        let project = self
            .projects
            .get(id)
            .ok_or_else(|| ProjectError::UnknownProject(id.clone()))?;
        self.metadata.invalidate(id);
        project.on_type_info_changed()
    }
}
