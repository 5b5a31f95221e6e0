use std::sync::Arc;

use crate::base::{Cancelled, ProjectId};
use crate::hir::{OracleError, TagError};

/// Errors from project and workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("document is not open: {0}")]
    DocumentNotOpen(Arc<str>),
    #[error("unknown project: {0}")]
    UnknownProject(ProjectId),
    #[error("project already exists: {0}")]
    DuplicateProject(ProjectId),
    #[error(transparent)]
    Tags(#[from] TagError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl ProjectError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProjectError::Cancelled(_))
    }
}
