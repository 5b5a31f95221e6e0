//! Template front end.
//!
//! Builds `Document -> {Text, Comment, Expression, Section, ParameterDeclaration}`
//! from markup with embedded `{...}` constructs:
//!
//! ```text
//! {expr}            expression (part chain)
//! {! comment !}     comment
//! {#name params}    section start, `{#name params /}` self-closing
//! {/name} {/}       section end
//! {@type alias}     parameter declaration
//! {| raw |}  \{     text
//! ```
//!
//! Unterminated constructs are kept with `closed == false`. Nothing here fails
//! except cancellation.

mod params;

use std::sync::Arc;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::base::{Cancelled, cancel};
use crate::syntax::{
    DeclarationData, Document, DocumentKind, NodeId, NodeKind, SectionData, SectionKind,
};

use super::expression::parse_expression;

/// Parse a template document.
pub fn parse(
    text: impl Into<Arc<str>>,
    uri: impl Into<Arc<str>>,
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    let mut doc = Document::new(uri, DocumentKind::Template, text);
    build(&mut doc, cancel)?;
    Ok(doc)
}

/// Populate an empty template document.
pub(crate) fn build(doc: &mut Document, cancel: &CancellationToken) -> Result<(), Cancelled> {
    let text = doc.source();
    let mut builder = TemplateBuilder {
        doc,
        text: &text,
        open: Vec::new(),
        text_start: None,
    };
    builder.run(cancel)
}

fn offset(i: usize) -> TextSize {
    TextSize::new(i as u32)
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(offset(start), offset(end))
}

/// Where a `{...}` construct ends.
enum TagEnd {
    /// Index of the closing `}`.
    Closed(usize),
    /// Index where scanning gave up (next `{` or end of text).
    Open(usize),
}

impl TagEnd {
    fn next(&self) -> usize {
        match *self {
            TagEnd::Closed(i) => i + 1,
            TagEnd::Open(i) => i,
        }
    }

    fn content_end(&self) -> usize {
        match *self {
            TagEnd::Closed(i) | TagEnd::Open(i) => i,
        }
    }

    fn is_closed(&self) -> bool {
        matches!(self, TagEnd::Closed(_))
    }
}

struct TemplateBuilder<'a> {
    doc: &'a mut Document,
    text: &'a str,
    /// Open sections, innermost last.
    open: Vec<NodeId>,
    /// Start of the pending text run.
    text_start: Option<usize>,
}

impl TemplateBuilder<'_> {
    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId::ROOT)
    }

    fn run(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let text = self.text;
        let bytes = text.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' if bytes.get(pos + 1) == Some(&b'{') => {
                    self.mark_text(pos);
                    pos += 2;
                }
                b'{' => {
                    cancel::check(cancel)?;
                    pos = self.construct(pos);
                }
                _ => {
                    self.mark_text(pos);
                    pos += 1;
                }
            }
        }
        self.flush_text(bytes.len());

        let end = offset(bytes.len());
        for &section in &self.open {
            self.doc.extend_to(section, end);
        }
        if !self.open.is_empty() {
            trace!(open = self.open.len(), "template ended with open sections");
        }
        self.doc.close(NodeId::ROOT, end);
        Ok(())
    }

    /// Handle the construct starting with the `{` at `pos`; returns the index
    /// to continue from.
    fn construct(&mut self, pos: usize) -> usize {
        let text = self.text;
        let bytes = text.as_bytes();
        match bytes.get(pos + 1) {
            Some(b'!') => {
                self.flush_text(pos);
                self.comment(pos)
            }
            Some(b'#') => self.section_start(pos),
            Some(b'/') => self.section_end(pos),
            Some(b'@') => {
                self.flush_text(pos);
                self.declaration(pos)
            }
            Some(b'|') => {
                self.mark_text(pos);
                match text[pos + 2..].find("|}") {
                    Some(i) => pos + 2 + i + 2,
                    None => bytes.len(),
                }
            }
            _ if self.starts_expression(pos + 1) => {
                self.flush_text(pos);
                self.expression(pos)
            }
            _ => {
                self.mark_text(pos);
                pos + 1
            }
        }
    }

    fn starts_expression(&self, i: usize) -> bool {
        match self.text.get(i..).and_then(|rest| rest.chars().next()) {
            Some(c) => {
                unicode_ident::is_xid_start(c)
                    || c.is_ascii_digit()
                    || matches!(c, '_' | '$' | '\'' | '"')
            }
            None => false,
        }
    }

    fn mark_text(&mut self, pos: usize) {
        self.text_start.get_or_insert(pos);
    }

    fn flush_text(&mut self, end: usize) {
        if let Some(start) = self.text_start.take()
            && end > start
        {
            let parent = self.current();
            self.doc.alloc_closed(parent, NodeKind::Text, range(start, end));
        }
    }

    /// Scan for the `}` closing a tag, skipping quoted text. A `{` outside
    /// quotes means the tag was never closed.
    fn find_close(&self, from: usize) -> TagEnd {
        let bytes = self.text.as_bytes();
        let mut quote: Option<u8> = None;
        let mut i = from;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q || b == b'\n' => quote = None,
                Some(_) => {}
                None => match b {
                    b'}' => return TagEnd::Closed(i),
                    b'{' => return TagEnd::Open(i),
                    b'\'' | b'"' => quote = Some(b),
                    _ => {}
                },
            }
            i += 1;
        }
        TagEnd::Open(bytes.len())
    }

    fn comment(&mut self, pos: usize) -> usize {
        let parent = self.current();
        match self.text[pos + 2..].find("!}") {
            Some(i) => {
                let end = pos + 2 + i + 2;
                self.doc
                    .alloc_closed(parent, NodeKind::Comment, range(pos, end));
                end
            }
            None => {
                let end = self.text.len();
                self.doc.alloc(parent, NodeKind::Comment, range(pos, end));
                end
            }
        }
    }

    fn expression(&mut self, pos: usize) -> usize {
        let end = self.find_close(pos + 1);
        let content = range(pos + 1, end.content_end());
        let node_range = range(pos, end.next());
        let parent = self.current();
        parse_expression(self.doc, parent, node_range, content, end.is_closed());
        end.next()
    }

    fn section_start(&mut self, pos: usize) -> usize {
        let text = self.text;
        let bytes = text.as_bytes();
        let name_start = pos + 2;
        let mut name_end = name_start;
        while name_end < bytes.len()
            && !bytes[name_end].is_ascii_whitespace()
            && !matches!(bytes[name_end], b'}' | b'/' | b'{')
        {
            name_end += 1;
        }
        if name_end == name_start {
            // `{#` alone is text until a name is typed
            self.mark_text(pos);
            return pos + 2;
        }
        self.flush_text(pos);

        let name = SmolStr::new(&text[name_start..name_end]);
        let kind = SectionKind::from_name(&name);
        let end = self.find_close(name_end);
        let tag_end = end.next();

        let mut params_end = end.content_end();
        while params_end > name_end && bytes[params_end - 1].is_ascii_whitespace() {
            params_end -= 1;
        }
        let self_closing =
            end.is_closed() && params_end > name_start && bytes[params_end - 1] == b'/';
        if self_closing {
            params_end -= 1;
        }

        if kind.is_block_separator() {
            self.close_open_separator(pos);
        }
        let parent = self.current();
        let section = self.doc.alloc(
            parent,
            NodeKind::Section(SectionData {
                name,
                kind,
                start_tag: range(pos, tag_end),
                end_tag: None,
                self_closing,
            }),
            range(pos, tag_end),
        );
        params::add_parameters(
            self.doc,
            section,
            kind,
            range(name_end, params_end.max(name_end)),
        );

        if self_closing {
            self.doc.close(section, offset(tag_end));
        } else {
            self.open.push(section);
        }
        tag_end
    }

    /// A new `{#else}`/`{#is}` ends the previous branch of the same owner.
    fn close_open_separator(&mut self, pos: usize) {
        let Some(&top) = self.open.last() else {
            return;
        };
        if let NodeKind::Section(data) = self.doc.kind_of(top)
            && data.kind.is_block_separator()
        {
            self.doc.close(top, offset(pos));
            self.open.pop();
        }
    }

    fn section_end(&mut self, pos: usize) -> usize {
        let text = self.text;
        let end = self.find_close(pos + 2);
        let tag_end = end.next();
        let name = text[pos + 2..end.content_end()].trim();

        let matched = self.open.iter().rposition(|&id| match self.doc.kind_of(id) {
            // `{/}` ends the owner, never one of its branches
            NodeKind::Section(data) if name.is_empty() => !data.kind.is_block_separator(),
            NodeKind::Section(data) => data.name == name,
            _ => false,
        });
        let Some(index) = matched else {
            trace!(name, "end tag without a matching section");
            self.mark_text(pos);
            return tag_end;
        };
        self.flush_text(pos);

        for &inner in self.open[index + 1..].iter().rev() {
            match self.doc.kind_of(inner) {
                NodeKind::Section(data) if data.kind.is_block_separator() => {
                    self.doc.close(inner, offset(pos));
                }
                _ => self.doc.extend_to(inner, offset(pos)),
            }
        }
        let section = self.open[index];
        if let NodeKind::Section(data) = self.doc.kind_mut(section) {
            data.end_tag = Some(range(pos, tag_end));
        }
        if end.is_closed() {
            self.doc.close(section, offset(tag_end));
        } else {
            self.doc.extend_to(section, offset(tag_end));
        }
        self.open.truncate(index);
        tag_end
    }

    fn declaration(&mut self, pos: usize) -> usize {
        let end = self.find_close(pos + 2);
        let content_start = pos + 2;
        let text = self.text;
        let raw = &text[content_start..end.content_end()];
        let lead = raw.len() - raw.trim_start().len();
        let body = raw.trim();
        let body_start = content_start + lead;

        // the alias follows the last top-level whitespace; generics may hold spaces
        let mut depth = 0i32;
        let mut split = None;
        for (i, c) in body.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => depth -= 1,
                c if c.is_whitespace() && depth <= 0 => split = Some(i),
                _ => {}
            }
        }
        let (type_text, type_start, alias_text, alias_start) = match split {
            Some(i) => {
                let type_text = body[..i].trim_end();
                let alias_text = body[i..].trim_start();
                let alias_start = body_start + body.len() - alias_text.len();
                (type_text, body_start, alias_text, alias_start)
            }
            None => (body, body_start, "", body_start + body.len()),
        };

        let data = DeclarationData {
            type_name: SmolStr::new(type_text),
            type_range: range(type_start, type_start + type_text.len()),
            alias: SmolStr::new(alias_text),
            alias_range: range(alias_start, alias_start + alias_text.len()),
        };
        let parent = self.current();
        let node_range = range(pos, end.next());
        if end.is_closed() {
            self.doc
                .alloc_closed(parent, NodeKind::ParameterDeclaration(data), node_range);
        } else {
            self.doc
                .alloc(parent, NodeKind::ParameterDeclaration(data), node_range);
        }
        end.next()
    }
}
