//! The Type Oracle: the external provider of type, tag and config metadata.
//!
//! Everything the crate knows about the host program's types comes through
//! [`TypeOracle`]. Failures are reported as [`OracleError`] and turned into
//! "unknown" results by the resolver; they never become diagnostics.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::ProjectId;

use super::config::PropertyInfo;
use super::tags::TagPayload;
use super::types::{MemberForm, MemberInfo, TypeInfo};

/// Why the oracle could not answer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("type oracle unavailable: {0}")]
    Unavailable(String),
    #[error("type oracle timed out")]
    Timeout,
    #[error("type oracle error: {0}")]
    Other(String),
}

/// What kind of member a part asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// `a.b`: a field, a `getB`/`isB` getter, or a no-arg method.
    Property,
    /// `a.b(...)`: a method.
    Method,
}

/// External type/member metadata provider.
pub trait TypeOracle: Send + Sync {
    /// Look up a type by qualified name. `Ok(None)` means the type does not
    /// exist.
    fn resolve_type(&self, qualified_name: &str) -> Result<Option<TypeInfo>, OracleError>;

    /// Find a member declared directly on `ty`. Supertypes are walked by the
    /// resolver so that generic arguments can be substituted on the way.
    fn resolve_member(
        &self,
        ty: &TypeInfo,
        name: &str,
        arg_count: usize,
        kind: MemberKind,
    ) -> Result<Option<MemberInfo>, OracleError> {
        Ok(find_member(ty, name, arg_count, kind).cloned())
    }

    /// Binary user tags contributed by dependencies of a project.
    fn list_user_tags(&self, _project: &ProjectId) -> Result<Vec<TagPayload>, OracleError> {
        Ok(Vec::new())
    }

    /// Configuration property metadata of a project.
    fn config_properties(&self, _project: &ProjectId) -> Result<Vec<PropertyInfo>, OracleError> {
        Ok(Vec::new())
    }
}

/// Member lookup over the declared members of one type.
///
/// Properties prefer a field, then a `getX`/`isX` getter, then a no-arg
/// method named `x`. Methods prefer an exact arity match, then the first
/// declared overload.
pub fn find_member<'t>(
    ty: &'t TypeInfo,
    name: &str,
    arg_count: usize,
    kind: MemberKind,
) -> Option<&'t MemberInfo> {
    match kind {
        MemberKind::Property => ty
            .members
            .iter()
            .find(|m| m.form == MemberForm::Field && m.name == name)
            .or_else(|| {
                ty.members
                    .iter()
                    .find(|m| m.getter_property().as_deref() == Some(name))
            })
            .or_else(|| {
                ty.members.iter().find(|m| {
                    m.form == MemberForm::Method && m.name == name && m.parameters.is_empty()
                })
            }),
        MemberKind::Method => {
            let mut overloads = ty
                .members
                .iter()
                .filter(|m| m.form == MemberForm::Method && m.name == name);
            let first = overloads.clone().next();
            overloads
                .find(|m| m.parameters.len() == arg_count)
                .or(first)
        }
    }
}

// ============================================================================
// IN-MEMORY ORACLE
// ============================================================================

/// An oracle backed by in-memory tables, for tests and embedding.
#[derive(Debug, Default)]
pub struct StaticOracle {
    types: RwLock<FxHashMap<SmolStr, TypeInfo>>,
    tags: RwLock<Vec<TagPayload>>,
    properties: RwLock<Vec<PropertyInfo>>,
    unavailable: AtomicBool,
    type_lookups: AtomicUsize,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(self, info: TypeInfo) -> Self {
        self.insert_type(info);
        self
    }

    pub fn with_tag(self, payload: TagPayload) -> Self {
        self.tags.write().push(payload);
        self
    }

    pub fn with_property(self, property: PropertyInfo) -> Self {
        self.insert_property(property);
        self
    }

    pub fn insert_property(&self, property: PropertyInfo) {
        self.properties.write().push(property);
    }

    /// Add or replace a type.
    pub fn insert_type(&self, info: TypeInfo) {
        self.types.write().insert(info.name.clone(), info);
    }

    pub fn remove_type(&self, name: &str) {
        self.types.write().remove(name);
    }

    pub fn set_tags(&self, tags: Vec<TagPayload>) {
        *self.tags.write() = tags;
    }

    /// Make every call fail with [`OracleError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `resolve_type` calls served so far.
    pub fn type_lookups(&self) -> usize {
        self.type_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), OracleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(OracleError::Unavailable("static oracle disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl TypeOracle for StaticOracle {
    fn resolve_type(&self, qualified_name: &str) -> Result<Option<TypeInfo>, OracleError> {
        self.type_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.types.read().get(qualified_name).cloned())
    }

    fn resolve_member(
        &self,
        ty: &TypeInfo,
        name: &str,
        arg_count: usize,
        kind: MemberKind,
    ) -> Result<Option<MemberInfo>, OracleError> {
        self.check_available()?;
        Ok(find_member(ty, name, arg_count, kind).cloned())
    }

    fn list_user_tags(&self, _project: &ProjectId) -> Result<Vec<TagPayload>, OracleError> {
        self.check_available()?;
        Ok(self.tags.read().clone())
    }

    fn config_properties(&self, _project: &ProjectId) -> Result<Vec<PropertyInfo>, OracleError> {
        self.check_available()?;
        Ok(self.properties.read().clone())
    }
}
