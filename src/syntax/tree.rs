//! Arena-backed concrete syntax tree.
//!
//! A [`Document`] owns every node in a flat vector. Parent/child links are
//! [`NodeId`] indices, so a tree can be rebuilt wholesale on every edit without
//! any aliasing between old and new nodes.

use std::sync::Arc;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{LineIndex, Position, PositionEncoding, Span};

use super::file::DocumentKind;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The document node.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lexical class of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Number,
    Boolean,
    Null,
    /// Unclassified text (property keys, unquoted values).
    Plain,
}

/// A key/value pair inside a mapping or a properties file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyData {
    pub key: Option<NodeId>,
    pub value: Option<NodeId>,
    /// Offset of the `:`/`=` separator; `None` until it has been scanned.
    pub separator: Option<TextSize>,
}

/// Built-in section kinds; everything else is a user tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    If,
    Else,
    For,
    Each,
    Let,
    Set,
    With,
    When,
    Is,
    Include,
    Insert,
    Fragment,
    Cached,
    Eval,
    UserTag,
}

impl SectionKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "if" => SectionKind::If,
            "else" => SectionKind::Else,
            "for" => SectionKind::For,
            "each" => SectionKind::Each,
            "let" => SectionKind::Let,
            "set" => SectionKind::Set,
            "with" => SectionKind::With,
            "when" | "switch" => SectionKind::When,
            "is" | "case" => SectionKind::Is,
            "include" => SectionKind::Include,
            "insert" => SectionKind::Insert,
            "fragment" | "capture" => SectionKind::Fragment,
            "cached" => SectionKind::Cached,
            "eval" => SectionKind::Eval,
            _ => SectionKind::UserTag,
        }
    }

    /// Names of all built-in sections, for completion.
    pub const BUILTIN_NAMES: &'static [&'static str] = &[
        "if", "else", "for", "each", "let", "set", "with", "when", "switch", "is", "case",
        "include", "insert", "fragment", "capture", "cached", "eval",
    ];

    /// `{#else}` and `{#is}` split their owner's body instead of nesting.
    pub fn is_block_separator(&self) -> bool {
        matches!(self, SectionKind::Else | SectionKind::Is)
    }

    /// Sections that test a condition.
    pub fn is_conditional(&self) -> bool {
        matches!(self, SectionKind::If | SectionKind::Else | SectionKind::When | SectionKind::Is)
    }

    /// Sections that introduce named bindings.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            SectionKind::For | SectionKind::Each | SectionKind::Let | SectionKind::Set
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionData {
    pub name: SmolStr,
    pub kind: SectionKind,
    /// The `{#name ...}` start tag.
    pub start_tag: TextRange,
    /// The `{/name}` end tag, if one was seen.
    pub end_tag: Option<TextRange>,
    pub self_closing: bool,
}

/// `{@type alias}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationData {
    pub type_name: SmolStr,
    pub type_range: TextRange,
    pub alias: SmolStr,
    pub alias_range: TextRange,
}

/// One parameter of a section start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterData {
    /// `name` in `name=value`, or the alias of a loop.
    pub name: Option<SmolStr>,
    pub name_range: Option<TextRange>,
    /// Range of the value text.
    pub value: TextRange,
    /// `name?=value`: only assigned when `name` is not already set.
    pub default_assignment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpressionData {
    /// Text between the delimiters (or the parameter value).
    pub content: TextRange,
    /// Ends with the `??` optional marker.
    pub optional: bool,
}

/// One link of a part chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartData {
    pub name: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Mapping { flow: bool },
    Sequence { flow: bool },
    Scalar(ScalarKind),
    Property(PropertyData),
    Comment,
    Text,
    Section(SectionData),
    ParameterDeclaration(DeclarationData),
    Parameter(ParameterData),
    Expression(ExpressionData),
    ObjectPart(PartData),
    PropertyPart(PartData),
    MethodPart(PartData),
    NamespacePart(PartData),
    Literal(LiteralKind),
}

impl NodeKind {
    pub fn is_part(&self) -> bool {
        matches!(
            self,
            NodeKind::ObjectPart(_)
                | NodeKind::PropertyPart(_)
                | NodeKind::MethodPart(_)
                | NodeKind::NamespacePart(_)
                | NodeKind::Literal(_)
        )
    }

    pub fn part_name(&self) -> Option<&SmolStr> {
        match self {
            NodeKind::ObjectPart(p)
            | NodeKind::PropertyPart(p)
            | NodeKind::MethodPart(p)
            | NodeKind::NamespacePart(p) => Some(&p.name),
            _ => None,
        }
    }

    /// Flow-style collections need an explicit terminator to be closed.
    pub fn is_flow(&self) -> bool {
        matches!(
            self,
            NodeKind::Mapping { flow: true } | NodeKind::Sequence { flow: true }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    /// Set once the construct has been syntactically terminated.
    pub closed: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A parsed document: text, URI and the node arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    uri: Arc<str>,
    kind: DocumentKind,
    text: Arc<str>,
    line_index: LineIndex,
    nodes: Vec<Node>,
}

impl Document {
    /// Create a document holding only its root node.
    pub fn new(uri: impl Into<Arc<str>>, kind: DocumentKind, text: impl Into<Arc<str>>) -> Self {
        Self::with_encoding(uri, kind, text, PositionEncoding::default())
    }

    pub fn with_encoding(
        uri: impl Into<Arc<str>>,
        kind: DocumentKind,
        text: impl Into<Arc<str>>,
        encoding: PositionEncoding,
    ) -> Self {
        let text: Arc<str> = text.into();
        let root = Node {
            kind: NodeKind::Document,
            range: TextRange::up_to(TextSize::of(&*text)),
            closed: false,
            parent: None,
            children: Vec::new(),
        };
        Self {
            uri: uri.into(),
            kind,
            line_index: LineIndex::with_encoding(&text, encoding),
            text,
            nodes: vec![root],
        }
    }

    pub fn uri(&self) -> &Arc<str> {
        &self.uri
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the text, for builders that mutate the arena while
    /// reading it.
    pub fn source(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind_of(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.index()].range
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Source text of a node.
    pub fn text_of(&self, id: NodeId) -> &str {
        self.slice(self.range(id))
    }

    /// Source text of a range; out-of-bounds ranges yield `""`.
    pub fn slice(&self, range: TextRange) -> &str {
        self.text.get(usize::from(range.start())..usize::from(range.end())).unwrap_or("")
    }

    /// Editor span of a byte range.
    pub fn span(&self, range: TextRange) -> Span {
        self.line_index.span(&self.text, range)
    }

    /// Byte offset of an editor position, `None` past the last line.
    pub fn offset(&self, position: Position) -> Option<TextSize> {
        self.line_index.offset(&self.text, position)
    }

    /// All node ids in arena (creation) order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Pre-order traversal of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![id];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.children(next).iter().rev());
            Some(next)
        })
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&s| s == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Deepest node whose range contains `offset` (end inclusive).
    pub fn node_at_offset(&self, offset: TextSize) -> NodeId {
        let mut current = NodeId::ROOT;
        'descend: loop {
            for &child in self.children(current).iter().rev() {
                let range = self.range(child);
                if range.start() <= offset && offset <= range.end() {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// The expression a part belongs to.
    pub fn owning_expression(&self, part: NodeId) -> Option<NodeId> {
        let parent = self.parent(part)?;
        matches!(self.kind_of(parent), NodeKind::Expression(_)).then_some(parent)
    }

    /// Parts of an expression in chain order.
    pub fn parts(&self, expression: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(expression)
            .iter()
            .copied()
            .filter(|&c| self.kind_of(c).is_part())
    }

    /// Following link of a part chain.
    pub fn next_part(&self, part: NodeId) -> Option<NodeId> {
        self.next_sibling(part).filter(|&n| self.kind_of(n).is_part())
    }

    /// Namespace attached to the first part of a chain.
    pub fn part_namespace(&self, part: NodeId) -> Option<&SmolStr> {
        let prev = self.prev_sibling(part)?;
        match self.kind_of(prev) {
            NodeKind::NamespacePart(data) => Some(&data.name),
            _ => None,
        }
    }

    /// Range of a part's name (method parts also cover their arguments).
    pub fn part_name_range(&self, part: NodeId) -> TextRange {
        let range = self.range(part);
        match self.kind_of(part).part_name() {
            Some(name) => TextRange::at(range.start(), TextSize::of(name.as_str())),
            None => range,
        }
    }

    /// Nearest enclosing section, if any.
    pub fn enclosing_section(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| matches!(self.kind_of(a), NodeKind::Section(_)))
    }

    /// Key text of a property node.
    pub fn property_key(&self, property: NodeId) -> Option<&str> {
        match self.kind_of(property) {
            NodeKind::Property(data) => data.key.map(|k| self.scalar_text(k)),
            _ => None,
        }
    }

    /// Scalar text with surrounding quotes removed.
    pub fn scalar_text(&self, scalar: NodeId) -> &str {
        let text = self.text_of(scalar);
        for quote in ['"', '\''] {
            if let Some(inner) = text.strip_prefix(quote) {
                return inner.strip_suffix(quote).unwrap_or(inner);
            }
        }
        text
    }

    // ------------------------------------------------------------------
    // Building (used by the parsers)
    // ------------------------------------------------------------------

    /// Append a new open node under `parent`.
    pub(crate) fn alloc(&mut self, parent: NodeId, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            range,
            closed: false,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        self.extend_to(parent, range.end());
        id
    }

    /// Append a node that is already terminated.
    pub(crate) fn alloc_closed(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        range: TextRange,
    ) -> NodeId {
        let id = self.alloc(parent, kind, range);
        self.nodes[id.index()].closed = true;
        id
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    /// Grow `id` and its open ancestors so they end at least at `end`.
    pub(crate) fn extend_to(&mut self, id: NodeId, end: TextSize) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id.index()];
            if node.closed || node.range.end() >= end {
                break;
            }
            node.range = TextRange::new(node.range.start(), end);
            current = node.parent;
        }
    }

    /// Mark a node terminated, fixing its end offset.
    pub(crate) fn close(&mut self, id: NodeId, end: TextSize) {
        self.extend_to(id, end);
        self.nodes[id.index()].closed = true;
    }

    /// Mark a node terminated at its current end.
    pub(crate) fn close_here(&mut self, id: NodeId) {
        self.nodes[id.index()].closed = true;
    }
}
