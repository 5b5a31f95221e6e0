//! High-level IR (HIR): Semantic model over parsed documents.
//!
//! Everything here is computed from a [`Document`](crate::syntax::Document)
//! plus facts pulled from a [`TypeOracle`]. Oracle answers are memoized in a
//! [`ResolutionCache`] that is invalidated wholesale when the host reports a
//! type change.
//!
//! ## Key Types
//!
//! - [`TypeOracle`] - The host's type system (classes, members, user tags)
//! - [`Resolver`] - Resolves part chains to types
//! - [`TagRegistry`] - User tags and their inferred parameters
//! - [`ConfigMetadata`] - Known configuration properties
//! - [`DocumentChecker`] - Produces [`Diagnostic`]s
//!
//! ## Layers
//!
//! ```text
//! Document (syntax)
//!     │
//!     ▼
//! scope(at)                 ← bindings visible at a node
//!     │
//!     ▼
//! resolve_chain(expr)       ← oracle lookups, memoized per generation
//!     │
//!     ▼
//! check_document(doc)       ← diagnostics, then options (severity, exclusions)
//! ```

mod cache;
mod config;
mod diagnostics;
mod exclusion;
mod oracle;
mod resolve;
mod scope;
mod tags;
mod types;

pub use cache::{CacheStats, MemberKey, ResolutionCache, SnapshotCell};
pub use config::{
    ConfigEntry, ConfigMetadata, ConfigSources, ConverterKind, PROPERTIES_ORDINAL, PropertyInfo,
    SourcedEntry, ValueMismatch, YAML_ORDINAL, check_value, config_entries, flatten_yaml,
    hyphenate, split_key, strip_profile,
};
pub use diagnostics::{
    CheckContext, CheckOptions, Diagnostic, DiagnosticCode, DiagnosticCollector, DiagnosticData,
    DiagnosticOptions, DocumentChecker, RelatedInfo, Severity, check_document,
};
pub use exclusion::{ExclusionFilter, Glob};
pub use oracle::{MemberKind, OracleError, StaticOracle, TypeOracle, find_member};
pub use resolve::{ChainResolution, Link, LinkState, NamespaceResolver, Resolver};
pub use scope::{
    Binding, BindingKind, BindingType, LOOP_METADATA, ScopeEntry, declarations, lookup,
    visible_bindings, visible_scopes,
};
pub use tags::{
    TagError, TagOrigin, TagParameter, TagPayload, TagRegistry, TagSignature, TagSnapshot,
    UserTag, infer_signature,
};
pub use types::{
    Location, MemberForm, MemberInfo, ParameterInfo, ResolvedType, TypeInfo, TypeSignature,
};
