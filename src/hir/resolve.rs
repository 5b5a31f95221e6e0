//! Part-chain resolution against the Type Oracle.
//!
//! The first part of a chain is resolved from the template scope (or a
//! namespace resolver); every following part is a member lookup on the
//! previous part's type. An unresolved link ends the chain, but the links
//! before it are still returned.
//!
//! ```text
//! {item.price.scale()}
//!  │    │     └─ member "scale"/0 on java.math.BigDecimal
//!  │    └─ member "price" on org.acme.Item (field, getPrice, price())
//!  └─ binding "item" (declaration, loop alias, let, with)
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::base::{Cancelled, cancel};
use crate::parser::expression::argument_count;
use crate::syntax::{Document, LiteralKind, NodeId, NodeKind};

use super::cache::{MemberKey, ResolutionCache};
use super::oracle::{MemberKind, OracleError, TypeOracle, find_member};
use super::scope::{Binding, BindingType, ScopeEntry, visible_scopes};
use super::types::{MemberInfo, ResolvedType, TypeSignature};

/// Bound on binding-to-binding indirection (`{#let a=b}{#let b=c}...`).
const MAX_DEPTH: u8 = 16;
/// Bound on supertype walks.
const MAX_SUPER_TYPES: usize = 64;

/// Types whose first generic argument is what a loop iterates over.
const ITERABLE_TYPES: &[&str] = &[
    "java.util.List",
    "java.util.Set",
    "java.util.Collection",
    "java.lang.Iterable",
    "java.util.Iterator",
    "java.util.stream.Stream",
];

/// Wrappers unwrapped once before a member lookup.
const ASYNC_TYPES: &[&str] = &[
    "java.util.concurrent.CompletionStage",
    "java.util.concurrent.CompletableFuture",
    "java.util.concurrent.Future",
    "io.smallrye.mutiny.Uni",
];

// ============================================================================
// RESULTS
// ============================================================================

/// A named root scope such as `inject:` or `config:`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceResolver {
    pub namespace: SmolStr,
    /// Type whose members are the namespace's top-level names.
    pub root_type: SmolStr,
}

impl NamespaceResolver {
    pub fn new(namespace: impl Into<SmolStr>, root_type: impl Into<SmolStr>) -> Self {
        Self {
            namespace: namespace.into(),
            root_type: root_type.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkState {
    Resolved(ResolvedType),
    /// The name does not exist where it was looked up.
    Unresolved,
    /// The oracle could not tell (failure, opaque or missing type).
    Unknown,
}

impl LinkState {
    pub fn resolved(&self) -> Option<&ResolvedType> {
        match self {
            LinkState::Resolved(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, LinkState::Unresolved)
    }
}

/// Outcome for one part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub part: NodeId,
    pub state: LinkState,
    /// The member a non-first part (or a `with` lookup) resolved to.
    pub member: Option<Arc<MemberInfo>>,
    /// The binding a first part resolved to.
    pub binding: Option<Binding>,
}

impl Link {
    fn new(part: NodeId, state: LinkState) -> Self {
        Self {
            part,
            state,
            member: None,
            binding: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainResolution {
    pub expression: NodeId,
    /// One link per resolved part, up to and including the first
    /// unresolved one.
    pub links: Vec<Link>,
}

impl ChainResolution {
    pub fn first_unresolved(&self) -> Option<(usize, &Link)> {
        self.links
            .iter()
            .enumerate()
            .find(|(_, link)| link.state.is_unresolved())
    }

    /// Type of the part before `links[index]`.
    pub fn base_type(&self, index: usize) -> Option<&ResolvedType> {
        index
            .checked_sub(1)
            .and_then(|i| self.links.get(i))
            .and_then(|link| link.state.resolved())
    }

    pub fn link_for(&self, part: NodeId) -> Option<&Link> {
        self.links.iter().find(|link| link.part == part)
    }

    /// Type of the whole expression, when every part resolved.
    pub fn result_type(&self, doc: &Document) -> Option<&ResolvedType> {
        let parts = doc
            .parts(self.expression)
            .filter(|&p| !matches!(doc.kind_of(p), NodeKind::NamespacePart(_)))
            .count();
        if parts == 0 || self.links.len() != parts {
            return None;
        }
        self.links.last().and_then(|link| link.state.resolved())
    }
}

enum MemberLookup {
    Found {
        member: Arc<MemberInfo>,
        view: ResolvedType,
    },
    NotFound,
    Unknown,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves part chains for one project.
#[derive(Clone)]
pub struct Resolver {
    oracle: Arc<dyn TypeOracle>,
    cache: Arc<ResolutionCache>,
    namespaces: Vec<NamespaceResolver>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(oracle: Arc<dyn TypeOracle>, cache: Arc<ResolutionCache>) -> Self {
        Self {
            oracle,
            cache,
            namespaces: Vec::new(),
        }
    }

    pub fn with_namespaces(mut self, namespaces: Vec<NamespaceResolver>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn namespaces(&self) -> &[NamespaceResolver] {
        &self.namespaces
    }

    pub fn namespace(&self, name: &str) -> Option<&NamespaceResolver> {
        self.namespaces.iter().find(|ns| ns.namespace == name)
    }

    /// Resolve every part of `expression`.
    pub fn resolve_chain(
        &self,
        doc: &Document,
        expression: NodeId,
        cancel: &CancellationToken,
    ) -> Result<ChainResolution, Cancelled> {
        self.chain(doc, expression, cancel, 0)
    }

    /// The link of one part, resolving its chain.
    pub fn resolve_part(
        &self,
        doc: &Document,
        part: NodeId,
        cancel: &CancellationToken,
    ) -> Result<Option<Link>, Cancelled> {
        let Some(expression) = doc.owning_expression(part) else {
            return Ok(None);
        };
        let chain = self.resolve_chain(doc, expression, cancel)?;
        Ok(chain.link_for(part).cloned())
    }

    /// Type of a whole expression; anything short of a full resolution is
    /// `Unknown`.
    pub fn type_of_expression(
        &self,
        doc: &Document,
        expression: NodeId,
        cancel: &CancellationToken,
    ) -> Result<LinkState, Cancelled> {
        self.expression_type(doc, expression, cancel, 0)
    }

    /// The type a binding stands for.
    pub fn binding_type(
        &self,
        doc: &Document,
        binding: &Binding,
        cancel: &CancellationToken,
    ) -> Result<LinkState, Cancelled> {
        self.binding_state(doc, binding, cancel, 0)
    }

    /// Resolve a written type name (`int`, `org.acme.Item[]`, `List<Item>`).
    pub fn resolve_type_name(&self, name: &str) -> LinkState {
        self.resolve_signature(&TypeSignature::parse(name))
    }

    pub fn resolve_signature(&self, sig: &TypeSignature) -> LinkState {
        if let Some(element) = sig.array_element() {
            return LinkState::Resolved(ResolvedType::array_of(element));
        }
        let name = sig.boxed().unwrap_or(sig.name.as_str());
        match self.cache.type_info(name, || self.oracle.resolve_type(name)) {
            Ok(Some(info)) => LinkState::Resolved(ResolvedType::new(info, sig.args.clone())),
            Ok(None) => {
                trace!(type_name = name, "type not found");
                LinkState::Unknown
            }
            Err(err) => {
                oracle_failed(&err, name);
                LinkState::Unknown
            }
        }
    }

    /// What iterating over `ty` yields.
    pub fn element_type(&self, ty: &ResolvedType) -> LinkState {
        self.element_state(ty, 0)
    }

    /// `Uni<T>`, `CompletionStage<T>`, ... → `T`; other types unchanged.
    pub fn unwrap_async(&self, ty: &ResolvedType) -> LinkState {
        if ASYNC_TYPES.contains(&ty.name()) {
            return match ty.args.first() {
                Some(inner) => self.resolve_signature(inner),
                None => LinkState::Unknown,
            };
        }
        LinkState::Resolved(ty.clone())
    }

    /// Members of `ty` and its supertypes with generic arguments
    /// substituted, nearest declaration first.
    pub fn members_of(&self, ty: &ResolvedType) -> Vec<MemberInfo> {
        let mut members: Vec<MemberInfo> = Vec::new();
        for view in self.type_hierarchy(ty) {
            for member in &view.info.members {
                let shadowed = members
                    .iter()
                    .any(|m| m.name == member.name && m.parameters.len() == member.parameters.len());
                if !shadowed {
                    let mut member = member.clone();
                    member.return_type = view.substitute(&member.return_type);
                    members.push(member);
                }
            }
        }
        members
    }

    // ------------------------------------------------------------------
    // chains
    // ------------------------------------------------------------------

    fn chain(
        &self,
        doc: &Document,
        expression: NodeId,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<ChainResolution, Cancelled> {
        let mut links: Vec<Link> = Vec::new();
        for part in doc.parts(expression) {
            cancel::check(cancel)?;
            if matches!(doc.kind_of(part), NodeKind::NamespacePart(_)) {
                continue;
            }
            let link = match links.last().map(|l| &l.state) {
                None => self.first_link(doc, part, cancel, depth)?,
                Some(LinkState::Resolved(base)) => {
                    let base = base.clone();
                    self.member_link(doc, part, &base, cancel, depth)?
                }
                Some(LinkState::Unknown) => Link::new(part, LinkState::Unknown),
                Some(LinkState::Unresolved) => break,
            };
            links.push(link);
        }
        trace!(
            expression = ?expression,
            links = links.len(),
            "resolved part chain"
        );
        Ok(ChainResolution { expression, links })
    }

    fn first_link(
        &self,
        doc: &Document,
        part: NodeId,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<Link, Cancelled> {
        let (name, kind, arity) = match doc.kind_of(part) {
            NodeKind::Literal(literal) => {
                return Ok(Link::new(part, self.literal_type(*literal)));
            }
            NodeKind::ObjectPart(data) => (data.name.clone(), MemberKind::Property, 0),
            NodeKind::MethodPart(data) => {
                (data.name.clone(), MemberKind::Method, argument_count(doc, part))
            }
            _ => return Ok(Link::new(part, LinkState::Unknown)),
        };

        if let Some(namespace) = doc.part_namespace(part) {
            return Ok(self.namespace_link(part, namespace, &name, arity, kind));
        }

        for entry in visible_scopes(doc, part) {
            match entry {
                ScopeEntry::Binding(binding) if binding.name == name => {
                    let state = self.binding_state(doc, &binding, cancel, depth)?;
                    return Ok(Link {
                        part,
                        state,
                        member: None,
                        binding: Some(binding),
                    });
                }
                ScopeEntry::With { expression, .. } => {
                    let object = match self.expression_type(doc, expression, cancel, depth + 1)? {
                        LinkState::Resolved(ty) => ty,
                        _ => return Ok(Link::new(part, LinkState::Unknown)),
                    };
                    match self.find_member(&object, &name, arity, kind) {
                        MemberLookup::Found { member, view } => {
                            return Ok(self.member_found(part, member, &view));
                        }
                        MemberLookup::Unknown => return Ok(Link::new(part, LinkState::Unknown)),
                        MemberLookup::NotFound => {}
                    }
                }
                ScopeEntry::Binding(_) => {}
            }
        }
        Ok(Link::new(part, LinkState::Unresolved))
    }

    fn namespace_link(
        &self,
        part: NodeId,
        namespace: &str,
        name: &str,
        arity: usize,
        kind: MemberKind,
    ) -> Link {
        let Some(resolver) = self.namespace(namespace) else {
            return Link::new(part, LinkState::Unresolved);
        };
        let root = match self.resolve_type_name(&resolver.root_type) {
            LinkState::Resolved(root) => root,
            _ => return Link::new(part, LinkState::Unknown),
        };
        match self.find_member(&root, name, arity, kind) {
            MemberLookup::Found { member, view } => self.member_found(part, member, &view),
            MemberLookup::NotFound => Link::new(part, LinkState::Unresolved),
            MemberLookup::Unknown => Link::new(part, LinkState::Unknown),
        }
    }

    fn member_link(
        &self,
        doc: &Document,
        part: NodeId,
        base: &ResolvedType,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<Link, Cancelled> {
        let (name, kind, arity) = match doc.kind_of(part) {
            NodeKind::PropertyPart(data) | NodeKind::ObjectPart(data) => {
                (data.name.clone(), MemberKind::Property, 0)
            }
            NodeKind::MethodPart(data) => {
                (data.name.clone(), MemberKind::Method, argument_count(doc, part))
            }
            _ => return Ok(Link::new(part, LinkState::Unknown)),
        };

        if let Some(state) = self.builtin(doc, part, &name, base, cancel, depth)? {
            return Ok(Link::new(part, state));
        }

        let target = match self.unwrap_async(base) {
            LinkState::Resolved(target) => target,
            other => return Ok(Link::new(part, other)),
        };
        Ok(match self.find_member(&target, &name, arity, kind) {
            MemberLookup::Found { member, view } => self.member_found(part, member, &view),
            MemberLookup::NotFound => Link::new(part, LinkState::Unresolved),
            MemberLookup::Unknown => Link::new(part, LinkState::Unknown),
        })
    }

    fn member_found(&self, part: NodeId, member: Arc<MemberInfo>, view: &ResolvedType) -> Link {
        let state = self.resolve_signature(&view.substitute(&member.return_type));
        Link {
            part,
            state,
            member: Some(member),
            binding: None,
        }
    }

    /// Value resolvers that work on any type.
    fn builtin(
        &self,
        doc: &Document,
        part: NodeId,
        name: &str,
        base: &ResolvedType,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<Option<LinkState>, Cancelled> {
        Ok(match name {
            "or" | "?:" | "orEmpty" | "raw" | "safe" => Some(LinkState::Resolved(base.clone())),
            "ifTruthy" => {
                let argument = doc
                    .children(part)
                    .iter()
                    .copied()
                    .find(|&c| matches!(doc.kind_of(c), NodeKind::Expression(_)));
                Some(match argument {
                    Some(argument) => self.expression_type(doc, argument, cancel, depth + 1)?,
                    None => LinkState::Unknown,
                })
            }
            _ => None,
        })
    }

    fn literal_type(&self, literal: LiteralKind) -> LinkState {
        let name = match literal {
            LiteralKind::String => "java.lang.String",
            LiteralKind::Integer => "java.lang.Integer",
            LiteralKind::Long => "java.lang.Long",
            LiteralKind::Double => "java.lang.Double",
            LiteralKind::Boolean => "java.lang.Boolean",
            LiteralKind::Null => return LinkState::Unknown,
        };
        self.resolve_type_name(name)
    }

    // ------------------------------------------------------------------
    // bindings and expressions
    // ------------------------------------------------------------------

    fn expression_type(
        &self,
        doc: &Document,
        expression: NodeId,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<LinkState, Cancelled> {
        if depth > MAX_DEPTH {
            return Ok(LinkState::Unknown);
        }
        let chain = self.chain(doc, expression, cancel, depth)?;
        Ok(match chain.result_type(doc) {
            Some(ty) => LinkState::Resolved(ty.clone()),
            None => LinkState::Unknown,
        })
    }

    fn binding_state(
        &self,
        doc: &Document,
        binding: &Binding,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<LinkState, Cancelled> {
        if depth > MAX_DEPTH {
            return Ok(LinkState::Unknown);
        }
        Ok(match &binding.ty {
            BindingType::Declared(sig) | BindingType::Fixed(sig) => self.resolve_signature(sig),
            BindingType::Expression(expression) => {
                self.expression_type(doc, *expression, cancel, depth + 1)?
            }
            BindingType::ElementOf(iterable) => {
                match self.expression_type(doc, *iterable, cancel, depth + 1)? {
                    LinkState::Resolved(ty) => self.element_type(&ty),
                    _ => LinkState::Unknown,
                }
            }
            BindingType::Unknown => LinkState::Unknown,
        })
    }

    // ------------------------------------------------------------------
    // type hierarchy
    // ------------------------------------------------------------------

    fn element_state(&self, ty: &ResolvedType, depth: u8) -> LinkState {
        if let Some(element) = ty.array_element() {
            return self.resolve_signature(element);
        }
        let name = ty.name();
        if name == "java.util.Map" {
            let entry = TypeSignature::simple("java.util.Map.Entry").with_args(ty.args.clone());
            return self.resolve_signature(&entry);
        }
        if ITERABLE_TYPES.contains(&name) {
            return match ty.args.first() {
                Some(element) => self.resolve_signature(element),
                None => LinkState::Unknown,
            };
        }
        if matches!(name, "java.lang.Integer" | "java.lang.Long") {
            return self.resolve_type_name(name);
        }
        if depth == 0 {
            // a user type implementing one of the above
            for view in self.type_hierarchy(ty).into_iter().skip(1) {
                if view.name() == "java.util.Map" || ITERABLE_TYPES.contains(&view.name()) {
                    return self.element_state(&view, depth + 1);
                }
            }
        }
        LinkState::Unknown
    }

    /// `ty` followed by its resolvable supertypes, breadth first, each
    /// viewed with the generic arguments `ty` gives it.
    fn type_hierarchy(&self, ty: &ResolvedType) -> Vec<ResolvedType> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([ty.clone()]);
        while let Some(view) = queue.pop_front() {
            if out.len() >= MAX_SUPER_TYPES || !seen.insert(view.info.name.clone()) {
                continue;
            }
            for sup in &view.info.super_types {
                if let LinkState::Resolved(parent) = self.resolve_signature(&view.substitute(sup)) {
                    queue.push_back(parent);
                }
            }
            out.push(view);
        }
        out
    }

    fn find_member(
        &self,
        ty: &ResolvedType,
        name: &str,
        arity: usize,
        kind: MemberKind,
    ) -> MemberLookup {
        if ty.is_array() {
            // synthesized, the oracle knows nothing about it
            return match find_member(&ty.info, name, arity, kind) {
                Some(member) => MemberLookup::Found {
                    member: Arc::new(member.clone()),
                    view: ty.clone(),
                },
                None => MemberLookup::NotFound,
            };
        }

        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([ty.clone()]);
        let mut failed = false;
        while let Some(view) = queue.pop_front() {
            if seen.len() >= MAX_SUPER_TYPES || !seen.insert(view.info.name.clone()) {
                continue;
            }
            let key = MemberKey::new(name, arity, kind);
            let looked_up = self.cache.member(&view.info.name, key, || {
                self.oracle.resolve_member(&view.info, name, arity, kind)
            });
            match looked_up {
                Ok(Some(member)) => return MemberLookup::Found { member, view },
                Ok(None) => {}
                Err(err) => {
                    oracle_failed(&err, &view.info.name);
                    failed = true;
                }
            }
            for sup in &view.info.super_types {
                if let LinkState::Resolved(parent) = self.resolve_signature(&view.substitute(sup)) {
                    queue.push_back(parent);
                }
            }
        }
        if failed {
            MemberLookup::Unknown
        } else {
            MemberLookup::NotFound
        }
    }
}

fn oracle_failed(err: &OracleError, type_name: &str) {
    warn!(type_name, error = %err, "type oracle lookup failed");
}

#[cfg(test)]
mod tests;
