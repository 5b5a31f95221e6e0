//! User tags: reusable template fragments invoked as `{#name ...}`.
//!
//! Tags come from two places: binary payloads listed by the oracle
//! (dependencies) and template files under the project's tag roots. A tag's
//! parameters are inferred from its body the first time they are asked for.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::TextRange;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::base::{Cancelled, ProjectId};
use crate::parser::template;
use crate::syntax::{Document, NodeId, NodeKind, SectionKind, Visitor, WalkAction, walk};

use super::cache::SnapshotCell;
use super::oracle::{OracleError, TypeOracle};

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("failed to list user tags: {0}")]
    Oracle(#[from] OracleError),
    #[error("failed to read tag {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A tag shipped in a dependency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPayload {
    pub name: SmolStr,
    pub content: String,
    /// Where the content can be shown from (e.g. a `jar:` URI).
    pub uri: Arc<str>,
}

impl TagPayload {
    pub fn new(name: impl Into<SmolStr>, content: impl Into<String>, uri: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            uri: uri.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagOrigin {
    Binary { payload: TagPayload },
    Source { path: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagParameter {
    pub name: SmolStr,
    pub required: bool,
    pub default_value: Option<String>,
    /// First use in the tag body.
    pub first_use: TextRange,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSignature {
    pub parameters: Vec<TagParameter>,
    /// The body reads `_args`, so any named argument is accepted.
    pub accepts_dynamic_args: bool,
}

impl TagSignature {
    pub fn parameter(&self, name: &str) -> Option<&TagParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &TagParameter> {
        self.parameters.iter().filter(|p| p.required)
    }
}

#[derive(Debug)]
pub struct UserTag {
    pub name: SmolStr,
    pub origin: TagOrigin,
    pub uri: Arc<str>,
    content: Arc<str>,
    signature: OnceLock<TagSignature>,
}

impl UserTag {
    pub fn binary(payload: TagPayload) -> Self {
        Self {
            name: payload.name.clone(),
            uri: Arc::clone(&payload.uri),
            content: Arc::from(payload.content.as_str()),
            origin: TagOrigin::Binary { payload },
            signature: OnceLock::new(),
        }
    }

    /// Load a tag from a template file; the tag is named after the file stem.
    pub fn from_path(path: &Path) -> Result<Self, TagError> {
        let content = std::fs::read_to_string(path).map_err(|source| TagError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::source(path, content))
    }

    pub fn source(path: &Path, content: impl Into<Arc<str>>) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: SmolStr::new(name),
            uri: Arc::from(format!("file://{}", path.display())),
            origin: TagOrigin::Source {
                path: path.to_path_buf(),
            },
            content: content.into(),
            signature: OnceLock::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Parameters inferred from the body, computed once. A cancelled
    /// computation is not remembered.
    pub fn signature(&self, cancel: &CancellationToken) -> Result<&TagSignature, Cancelled> {
        if let Some(signature) = self.signature.get() {
            return Ok(signature);
        }
        let doc = template::parse(Arc::clone(&self.content), Arc::clone(&self.uri), cancel)?;
        let computed = infer_signature(&doc, cancel)?;
        debug!(tag = %self.name, parameters = computed.parameters.len(), "inferred tag signature");
        Ok(self.signature.get_or_init(|| computed))
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Default)]
pub struct TagSnapshot {
    tags: IndexMap<SmolStr, Arc<UserTag>>,
}

impl TagSnapshot {
    pub fn get(&self, name: &str) -> Option<&Arc<UserTag>> {
        self.tags.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<UserTag>> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// The user tags of one project.
#[derive(Debug)]
pub struct TagRegistry {
    snapshot: SnapshotCell<TagSnapshot>,
    roots: Vec<PathBuf>,
}

impl TagRegistry {
    /// `roots` are directories holding tag templates.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            snapshot: SnapshotCell::default(),
            roots,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Rebuild from the oracle and the tag roots. Source tags shadow binary
    /// tags of the same name. If the oracle fails the previous snapshot
    /// stays published.
    pub fn refresh(
        &self,
        oracle: &dyn TypeOracle,
        project: &ProjectId,
    ) -> Result<Arc<TagSnapshot>, TagError> {
        let refreshed = self.snapshot.refresh(|_| {
            let mut tags = IndexMap::new();
            for payload in oracle.list_user_tags(project)? {
                tags.insert(payload.name.clone(), Arc::new(UserTag::binary(payload)));
            }
            for root in &self.roots {
                for entry in WalkDir::new(root) {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(err) => {
                            warn!(root = %root.display(), error = %err, "skipping tag root entry");
                            continue;
                        }
                    };
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    match UserTag::from_path(entry.path()) {
                        Ok(tag) => {
                            tags.insert(tag.name.clone(), Arc::new(tag));
                        }
                        Err(err) => warn!(error = %err, "skipping user tag"),
                    }
                }
            }
            Ok::<_, TagError>(TagSnapshot { tags })
        });
        match &refreshed {
            Ok(snapshot) => debug!(project = %project, tags = snapshot.len(), "user tags refreshed"),
            Err(err) => warn!(project = %project, error = %err, "user tag refresh failed"),
        }
        refreshed
    }

    pub fn snapshot(&self) -> Arc<TagSnapshot> {
        self.snapshot.load()
    }

    /// An open tag template was edited: publish its new body under the
    /// tag's name. Returns `None` when `uri` is not a tag template.
    pub fn update_source(&self, uri: &str, content: impl Into<Arc<str>>) -> Option<Arc<UserTag>> {
        if !self.is_tag_template(uri) {
            return None;
        }
        let tag = Arc::new(UserTag::source(Path::new(uri_path(uri)), content));
        self.insert(Arc::clone(&tag));
        debug!(tag = %tag.name, "user tag updated from open document");
        Some(tag)
    }

    /// An open tag template was closed: its file on disk is the body again.
    pub fn reload_source(&self, uri: &str) {
        if !self.is_tag_template(uri) {
            return;
        }
        match UserTag::from_path(Path::new(uri_path(uri))) {
            Ok(tag) => self.insert(Arc::new(tag)),
            Err(err) => debug!(uri, error = %err, "closed tag template has no file"),
        }
    }

    fn insert(&self, tag: Arc<UserTag>) {
        let Ok(_) = self.snapshot.refresh(|current| {
            let mut tags = current.tags.clone();
            tags.insert(tag.name.clone(), tag);
            Ok::<_, std::convert::Infallible>(TagSnapshot { tags })
        });
    }

    pub fn get(&self, name: &str) -> Option<Arc<UserTag>> {
        self.snapshot.load().get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<UserTag>> {
        self.snapshot.load().iter().cloned().collect()
    }

    /// Whether `uri` is a tag template (its free names are parameters, not
    /// errors).
    pub fn is_tag_template(&self, uri: &str) -> bool {
        let path = uri_path(uri);
        path.contains("/templates/tags/")
            || self
                .roots
                .iter()
                .any(|root| Path::new(path).starts_with(root))
    }
}

fn uri_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

// ============================================================================
// PARAMETER INFERENCE
// ============================================================================

enum Frame {
    /// Names tested by a condition.
    Conditional(FxHashSet<SmolStr>),
    /// Names assigned by the section, with their `?=` default.
    Assignment(FxHashMap<SmolStr, Option<String>>),
    /// `{#with}`: any name may be a member of the object.
    With,
    None,
}

enum Usage {
    Local,
    Parameter {
        required: bool,
        default_value: Option<String>,
    },
}

#[derive(Default)]
struct SignatureInference {
    frames: Vec<Frame>,
    parameters: IndexMap<SmolStr, TagParameter>,
    dynamic: bool,
}

/// Infer a tag's parameters from its parsed body.
pub fn infer_signature(doc: &Document, cancel: &CancellationToken) -> Result<TagSignature, Cancelled> {
    let mut inference = SignatureInference::default();
    walk(doc, doc.root(), &mut inference, cancel)?;

    let mut parameters: Vec<TagParameter> = inference.parameters.into_values().collect();
    if let Some(it) = parameters.iter().position(|p| p.name == "it") {
        let it = parameters.remove(it);
        parameters.insert(0, it);
    }
    Ok(TagSignature {
        parameters,
        accepts_dynamic_args: inference.dynamic,
    })
}

impl SignatureInference {
    fn frame_for(doc: &Document, section: NodeId, kind: SectionKind) -> Frame {
        let parameters = doc.children(section).iter().filter_map(|&c| match doc.kind_of(c) {
            NodeKind::Parameter(data) => Some((c, data)),
            _ => None,
        });
        match kind {
            SectionKind::If | SectionKind::Else | SectionKind::When | SectionKind::Is => {
                let tested = parameters
                    .flat_map(|(p, _)| doc.descendants(p))
                    .filter_map(|n| match doc.kind_of(n) {
                        NodeKind::ObjectPart(part) => Some(part.name.clone()),
                        _ => None,
                    })
                    .collect();
                Frame::Conditional(tested)
            }
            SectionKind::Let | SectionKind::Set => Frame::Assignment(
                parameters
                    .filter_map(|(_, data)| {
                        let name = data.name.clone()?;
                        let default = data
                            .default_assignment
                            .then(|| doc.slice(data.value).to_owned());
                        Some((name, default))
                    })
                    .collect(),
            ),
            SectionKind::For | SectionKind::Each => {
                let mut assigned = FxHashMap::default();
                if let Some(alias) = parameters.filter_map(|(_, d)| d.name.clone()).next() {
                    for suffix in ["index", "count", "hasNext", "isFirst", "isLast", "odd", "even", "indexParity"] {
                        assigned.insert(SmolStr::new(format!("{alias}_{suffix}")), None);
                    }
                    assigned.insert(alias, None);
                }
                Frame::Assignment(assigned)
            }
            SectionKind::With => Frame::With,
            _ => Frame::None,
        }
    }

    fn classify(&self, name: &str) -> Usage {
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Assignment(names) => match names.get(name) {
                    Some(Some(default)) => {
                        return Usage::Parameter {
                            required: false,
                            default_value: Some(default.clone()),
                        };
                    }
                    Some(None) => return Usage::Local,
                    None => {}
                },
                Frame::With => return Usage::Local,
                Frame::Conditional(tested) if tested.contains(name) => {
                    return Usage::Parameter {
                        required: false,
                        default_value: None,
                    };
                }
                Frame::Conditional(_) | Frame::None => {}
            }
        }
        Usage::Parameter {
            required: true,
            default_value: None,
        }
    }

    fn record(&mut self, name: &SmolStr, range: TextRange, required: bool, default_value: Option<String>) {
        match self.parameters.get_mut(name) {
            Some(existing) => {
                existing.required |= required;
                if existing.default_value.is_none() {
                    existing.default_value = default_value;
                }
            }
            None => {
                self.parameters.insert(
                    name.clone(),
                    TagParameter {
                        name: name.clone(),
                        required,
                        default_value,
                        first_use: range,
                    },
                );
            }
        }
    }
}

/// `{nested-content}` renders the body the tag was invoked with.
fn is_nested_content(doc: &Document, part: NodeId) -> bool {
    doc.kind_of(part).part_name().is_some_and(|n| n == "nested")
        && doc
            .text()
            .get(usize::from(doc.range(part).end())..)
            .is_some_and(|rest| rest.starts_with("-content"))
}

/// Whether `part` sits in a parameter of a non-conditional section.
fn in_own_parameters(doc: &Document, part: NodeId) -> bool {
    doc.ancestors(part)
        .find(|&a| matches!(doc.kind_of(a), NodeKind::Parameter(_)))
        .and_then(|parameter| doc.parent(parameter))
        .is_some_and(|section| {
            matches!(doc.kind_of(section), NodeKind::Section(data) if !data.kind.is_conditional())
        })
}

impl Visitor for SignatureInference {
    fn visit(&mut self, doc: &Document, node: NodeId) -> WalkAction {
        match doc.kind_of(node) {
            NodeKind::Section(section) => {
                self.frames.push(Self::frame_for(doc, node, section.kind));
            }
            NodeKind::ObjectPart(part) if doc.part_namespace(node).is_none() => {
                let name = &part.name;
                if name == "_args" {
                    self.dynamic = true;
                } else if !is_nested_content(doc, node) {
                    // a section's own parameters see the outer frames only,
                    // except that a condition makes its own operands optional
                    let usage = if in_own_parameters(doc, node) {
                        let own = self.frames.pop();
                        let usage = self.classify(name);
                        self.frames.extend(own);
                        usage
                    } else {
                        self.classify(name)
                    };
                    if let Usage::Parameter {
                        required,
                        default_value,
                    } = usage
                    {
                        self.record(name, doc.range(node), required, default_value);
                    }
                }
            }
            _ => {}
        }
        WalkAction::Continue
    }

    fn end_visit(&mut self, doc: &Document, node: NodeId) {
        if matches!(doc.kind_of(node), NodeKind::Section(_)) {
            self.frames.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::oracle::StaticOracle;

    fn signature(body: &str) -> TagSignature {
        let tag = UserTag::binary(TagPayload::new("t", body, "jar:tags/t.html"));
        tag.signature(&CancellationToken::new()).unwrap().clone()
    }

    fn params(sig: &TagSignature) -> Vec<(String, bool)> {
        sig.parameters
            .iter()
            .map(|p| (p.name.to_string(), p.required))
            .collect()
    }

    #[test]
    fn test_free_name_is_required() {
        assert_eq!(params(&signature("{foo}")), vec![("foo".to_owned(), true)]);
    }

    #[test]
    fn test_conditional_name_is_optional() {
        assert_eq!(
            params(&signature("{#if foo}{foo}{/if}")),
            vec![("foo".to_owned(), false)]
        );
    }

    #[test]
    fn test_required_wins_across_uses() {
        assert_eq!(
            params(&signature("{#if foo}{foo}{/if}{foo.bar}")),
            vec![("foo".to_owned(), true)]
        );
    }

    #[test]
    fn test_let_default_and_locals() {
        let sig = signature("{#let size?=10 local=1}{size}{local}{/let}{#for x in xs}{x}{/for}");
        assert_eq!(
            params(&sig),
            vec![("size".to_owned(), false), ("xs".to_owned(), true)]
        );
        assert_eq!(sig.parameter("size").unwrap().default_value.as_deref(), Some("10"));
    }

    #[test]
    fn test_with_names_are_local() {
        assert_eq!(
            params(&signature("{#with item}{name}{/with}")),
            vec![("item".to_owned(), true)]
        );
    }

    #[test]
    fn test_it_first_and_dynamic_args() {
        let sig = signature("{title}{it}{_args.size}{nested-content}");
        assert_eq!(
            params(&sig),
            vec![("it".to_owned(), true), ("title".to_owned(), true)]
        );
        assert!(sig.accepts_dynamic_args);
    }

    #[test]
    fn test_registry_source_shadows_binary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("card.html"), "{title}").unwrap();
        let oracle = StaticOracle::new()
            .with_tag(TagPayload::new("card", "{other}", "jar:card.html"))
            .with_tag(TagPayload::new("badge", "{#if x}{/if}", "jar:badge.html"));
        let registry = TagRegistry::new(vec![dir.path().to_path_buf()]);
        let snapshot = registry.refresh(&oracle, &ProjectId::new("p")).unwrap();
        assert_eq!(snapshot.len(), 2);

        let card = registry.get("card").unwrap();
        assert!(matches!(card.origin, TagOrigin::Source { .. }));
        let sig = card.signature(&CancellationToken::new()).unwrap();
        assert_eq!(sig.parameters[0].name, "title");
    }

    #[test]
    fn test_refresh_failure_keeps_snapshot() {
        let oracle = StaticOracle::new().with_tag(TagPayload::new("a", "", "jar:a"));
        let registry = TagRegistry::new(Vec::new());
        registry.refresh(&oracle, &ProjectId::new("p")).unwrap();
        oracle.set_unavailable(true);
        assert!(registry.refresh(&oracle, &ProjectId::new("p")).is_err());
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_edited_source_replaces_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.html");
        std::fs::write(&path, "{title}").unwrap();
        let registry = TagRegistry::new(vec![dir.path().to_path_buf()]);
        registry.refresh(&StaticOracle::new(), &ProjectId::new("p")).unwrap();
        let before = registry.snapshot();

        let uri = format!("file://{}", path.display());
        let tag = registry.update_source(&uri, "{title}{subtitle}").unwrap();
        assert_eq!(tag.name, "card");
        let names: Vec<_> = registry
            .get("card")
            .unwrap()
            .signature(&CancellationToken::new())
            .unwrap()
            .parameters
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        assert_eq!(names, vec!["title", "subtitle"]);
        // readers of the old snapshot are unaffected
        assert_eq!(before.get("card").unwrap().content(), "{title}");

        registry.reload_source(&uri);
        assert_eq!(registry.get("card").unwrap().content(), "{title}");
        assert!(registry.update_source("file:///app/templates/index.html", "{x}").is_none());
    }

    #[test]
    fn test_is_tag_template() {
        let registry = TagRegistry::new(vec![PathBuf::from("/work/tags")]);
        assert!(registry.is_tag_template("file:///app/src/main/resources/templates/tags/card.html"));
        assert!(registry.is_tag_template("file:///work/tags/x.html"));
        assert!(!registry.is_tag_template("file:///app/templates/index.html"));
    }
}
