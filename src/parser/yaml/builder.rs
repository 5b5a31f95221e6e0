//! YAML tree builder.
//!
//! Consumes scanner tokens and maintains a stack of open frames, each with
//! the column it was opened at (`-1` for the document). Block frames are
//! popped by indentation when a token starts a line; flow frames are only
//! popped by their matching close token, so an unterminated `{`/`[` stays
//! open (`closed == false`) to the end of the document.

use std::sync::Arc;

use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::base::{Cancelled, cancel};
use crate::syntax::{Document, DocumentKind, NodeId, NodeKind, PropertyData, ScalarKind};

use super::scanner::{Token, TokenKind, YamlScanner};

/// Parse a YAML document.
pub fn build(
    text: impl Into<Arc<str>>,
    uri: impl Into<Arc<str>>,
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    let mut doc = Document::new(uri, DocumentKind::Yaml, text);
    build_into(&mut doc, cancel)?;
    Ok(doc)
}

/// Populate an empty YAML document.
pub(crate) fn build_into(doc: &mut Document, cancel: &CancellationToken) -> Result<(), Cancelled> {
    let text = doc.source();
    let mut scanner = YamlScanner::new(&text);
    let mut builder = TreeBuilder {
        doc,
        frames: vec![Frame {
            node: NodeId::ROOT,
            indent: -1,
        }],
    };

    loop {
        cancel::check(cancel)?;
        let token = scanner.scan();
        if token.kind == TokenKind::EndOfStream {
            break;
        }
        builder.token(token, &mut scanner);
    }
    builder.finish(TextSize::of(&*text));
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    indent: i64,
}

struct TreeBuilder<'d> {
    doc: &'d mut Document,
    /// Open frames, document at the bottom.
    frames: Vec<Frame>,
}

impl TreeBuilder<'_> {
    fn top(&self) -> Frame {
        self.frames[self.frames.len() - 1]
    }

    fn in_flow(&self) -> bool {
        self.frames
            .iter()
            .any(|f| self.doc.kind_of(f.node).is_flow())
    }

    fn push(&mut self, node: NodeId, indent: i64) {
        self.frames.push(Frame { node, indent });
    }

    /// Pop the top frame. Block nodes are closed where they currently end;
    /// flow nodes are left as they are.
    fn pop(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(frame) = self.frames.pop()
            && !self.doc.kind_of(frame.node).is_flow()
        {
            self.doc.close_here(frame.node);
        }
    }

    fn is_property(&self, node: NodeId) -> bool {
        matches!(self.doc.kind_of(node), NodeKind::Property(_))
    }

    fn property_has_value(&self, node: NodeId) -> bool {
        matches!(self.doc.kind_of(node), NodeKind::Property(data) if data.value.is_some())
    }

    /// Pop block frames that a line starting at `column` has left.
    fn dedent(&mut self, token: &Token, extra: impl Fn(&Self, Frame, i64) -> bool) {
        if !token.first_on_line || self.in_flow() {
            return;
        }
        let column = token.column as i64;
        while self.frames.len() > 1 {
            let top = self.top();
            if top.indent > column || extra(self, top, column) {
                self.pop();
            } else {
                break;
            }
        }
    }

    fn token(&mut self, token: Token, scanner: &mut YamlScanner<'_>) {
        match token.kind {
            TokenKind::Key => self.key(&token),
            TokenKind::Colon => self.colon(&token),
            TokenKind::Dash => self.dash(&token),
            TokenKind::Comment => {
                let parent = self.top().node;
                self.doc.alloc_closed(parent, NodeKind::Comment, token.range);
            }
            TokenKind::ObjectOpen | TokenKind::ArrayOpen => self.flow_open(&token),
            TokenKind::ObjectClose | TokenKind::ArrayClose => self.flow_close(&token),
            TokenKind::Comma => self.unwind_to_flow(),
            TokenKind::String | TokenKind::Number | TokenKind::Boolean | TokenKind::Null => {
                let kind = match token.kind {
                    TokenKind::Number => ScalarKind::Number,
                    TokenKind::Boolean => ScalarKind::Boolean,
                    TokenKind::Null => ScalarKind::Null,
                    _ => ScalarKind::String,
                };
                self.scalar(&token, kind, token.range);
            }
            TokenKind::QuoteStart => {
                // fold the content/end tokens into one scalar
                let mut range = token.range;
                while let Some(next) = scanner.next_quote_part() {
                    range = range.cover(next.range);
                }
                self.scalar(&token, ScalarKind::String, range);
            }
            TokenKind::QuoteContent | TokenKind::QuoteEnd => {}
            TokenKind::DocumentStart => {
                while self.frames.len() > 1 {
                    self.pop();
                }
            }
            TokenKind::Default | TokenKind::EndOfStream => {}
        }
    }

    fn key(&mut self, token: &Token) {
        let column = token.column as i64;
        self.dedent(token, |b, top, column| {
            (b.is_property(top.node) || b.is_sequence(top.node)) && top.indent >= column
        });

        // a property that already holds a value cannot own this key
        while self.frames.len() > 1
            && self.is_property(self.top().node)
            && self.property_has_value(self.top().node)
        {
            self.pop();
        }

        let top = self.top();
        let mapping = match self.doc.kind_of(top.node) {
            NodeKind::Mapping { .. } => top.node,
            NodeKind::Property(_) => {
                let mapping = self.open_mapping(top.node, token.range, column);
                self.set_value(top.node, mapping);
                mapping
            }
            _ => self.open_mapping(top.node, token.range, column),
        };

        let property = self.doc.alloc(
            mapping,
            NodeKind::Property(PropertyData::default()),
            token.range,
        );
        let quoted = matches!(self.doc.slice(token.range).as_bytes().first(), Some(b'"' | b'\''));
        let scalar = if quoted {
            ScalarKind::String
        } else {
            ScalarKind::Plain
        };
        let key = self
            .doc
            .alloc_closed(property, NodeKind::Scalar(scalar), token.range);
        if let NodeKind::Property(data) = self.doc.kind_mut(property) {
            data.key = Some(key);
        }
        self.push(property, column);
    }

    fn open_mapping(&mut self, parent: NodeId, at: TextRange, column: i64) -> NodeId {
        let mapping = self
            .doc
            .alloc(parent, NodeKind::Mapping { flow: false }, at);
        self.push(mapping, column);
        mapping
    }

    fn is_sequence(&self, node: NodeId) -> bool {
        matches!(self.doc.kind_of(node), NodeKind::Sequence { .. })
    }

    fn set_value(&mut self, property: NodeId, value: NodeId) {
        if let NodeKind::Property(data) = self.doc.kind_mut(property) {
            data.value = Some(value);
        }
    }

    fn colon(&mut self, token: &Token) {
        let top = self.top().node;
        if let NodeKind::Property(data) = self.doc.kind_mut(top)
            && data.separator.is_none()
        {
            data.separator = Some(token.range.start());
            self.doc.extend_to(top, token.range.end());
        }
    }

    fn dash(&mut self, token: &Token) {
        if self.in_flow() {
            return;
        }
        let column = token.column as i64;
        self.dedent(token, |b, top, column| {
            let kind = b.doc.kind_of(top.node);
            top.indent >= column
                && (matches!(kind, NodeKind::Mapping { .. })
                    || (b.is_property(top.node) && b.property_has_value(top.node)))
        });

        let top = self.top();
        match self.doc.kind_of(top.node) {
            // next item of the current sequence
            NodeKind::Sequence { flow: false } if top.indent == column => {
                self.doc.extend_to(top.node, token.range.end());
            }
            NodeKind::Property(data) if data.value.is_none() => {
                let sequence = self.open_sequence(top.node, token.range, column);
                self.set_value(top.node, sequence);
            }
            _ => {
                self.open_sequence(top.node, token.range, column);
            }
        }
    }

    fn open_sequence(&mut self, parent: NodeId, at: TextRange, column: i64) -> NodeId {
        let sequence = self
            .doc
            .alloc(parent, NodeKind::Sequence { flow: false }, at);
        self.push(sequence, column);
        sequence
    }

    /// Where a value starting with `token` attaches: the open valueless
    /// property, else a sequence element, else the current node.
    fn value_parent(&mut self, token: &Token) -> (NodeId, bool) {
        self.dedent(token, |b, top, column| {
            b.is_property(top.node) && b.property_has_value(top.node) && top.indent >= column
        });
        let top = self.top().node;
        match self.doc.kind_of(top) {
            NodeKind::Property(data) if data.value.is_none() => (top, true),
            _ => (top, false),
        }
    }

    fn scalar(&mut self, token: &Token, kind: ScalarKind, range: TextRange) {
        let (parent, is_value) = self.value_parent(token);
        let scalar = self.doc.alloc_closed(parent, NodeKind::Scalar(kind), range);
        if is_value {
            self.set_value(parent, scalar);
        }
    }

    fn flow_open(&mut self, token: &Token) {
        let (parent, is_value) = self.value_parent(token);
        let kind = if token.kind == TokenKind::ObjectOpen {
            NodeKind::Mapping { flow: true }
        } else {
            NodeKind::Sequence { flow: true }
        };
        let node = self.doc.alloc(parent, kind, token.range);
        if is_value {
            self.set_value(parent, node);
        }
        self.push(node, token.column as i64);
    }

    fn flow_close(&mut self, token: &Token) {
        let want_mapping = token.kind == TokenKind::ObjectClose;
        let Some(index) = self
            .frames
            .iter()
            .rposition(|f| self.doc.kind_of(f.node).is_flow())
        else {
            trace!(offset = ?token.range.start(), "flow terminator outside a flow collection");
            return;
        };
        let node = self.frames[index].node;
        let matches = match self.doc.kind_of(node) {
            NodeKind::Mapping { .. } => want_mapping,
            _ => !want_mapping,
        };
        if !matches {
            trace!(offset = ?token.range.start(), "mismatched flow terminator");
            return;
        }
        while self.frames.len() > index + 1 {
            self.pop();
        }
        self.doc.close(node, token.range.end());
        self.frames.pop();
    }

    /// `,` ends the current entry of the innermost flow collection.
    fn unwind_to_flow(&mut self) {
        let Some(index) = self
            .frames
            .iter()
            .rposition(|f| self.doc.kind_of(f.node).is_flow())
        else {
            return;
        };
        while self.frames.len() > index + 1 {
            self.pop();
        }
    }

    fn finish(&mut self, end: TextSize) {
        while self.frames.len() > 1 {
            self.pop();
        }
        self.doc.close(NodeId::ROOT, end);
    }
}
