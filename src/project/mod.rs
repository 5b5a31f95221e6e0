//! Project management: documents, settings and per-project caches.
//!
//! - [`Project`] - one document set with its tags, config metadata and
//!   resolution cache
//! - [`Workspace`] - projects by id; routes oracle change events
//! - [`MetadataCache`] - coalescing cache of externally fetched metadata
//! - [`ValidationSettings`] - client settings for diagnostics

mod error;
mod host;
pub mod metadata_cache;
mod settings;
mod workspace;

pub use error::ProjectError;
pub use host::Project;
pub use metadata_cache::{MetadataCache, SharedFetch};
pub use settings::{CheckSettings, ProjectSettings, SeverityLevel, ValidationSettings};
pub use workspace::{MetadataResult, Workspace};
