//! `.properties` front end.
//!
//! Builds `Document -> {Property(key, value), Comment}`. Each logical line is
//! one property; `\` at the end of a line continues it. A key with no `=` or
//! `:` still becomes a property, with `separator == None`.

mod lexer;

pub use lexer::{Token, TokenKind, tokenize};

use std::sync::Arc;

use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use crate::base::{Cancelled, cancel};
use crate::syntax::{Document, DocumentKind, NodeId, NodeKind, PropertyData, ScalarKind};

/// Parse a properties document.
pub fn parse(
    text: impl Into<Arc<str>>,
    uri: impl Into<Arc<str>>,
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    let mut doc = Document::new(uri, DocumentKind::Properties, text);
    build(&mut doc, cancel)?;
    Ok(doc)
}

/// Populate an empty properties document.
pub(crate) fn build(doc: &mut Document, cancel: &CancellationToken) -> Result<(), Cancelled> {
    let text = doc.source();
    let tokens = tokenize(&text);
    let mut i = 0;

    while i < tokens.len() {
        cancel::check(cancel)?;
        match tokens[i].kind {
            TokenKind::Newline | TokenKind::Whitespace | TokenKind::Continuation => i += 1,
            TokenKind::CommentMarker => i = comment(doc, &tokens, i),
            _ => i = property(doc, &tokens, i),
        }
    }

    let end = TextSize::of(&*text);
    doc.close(NodeId::ROOT, end);
    Ok(())
}

/// A comment runs to the end of its physical line.
fn comment(doc: &mut Document, tokens: &[Token<'_>], start: usize) -> usize {
    let mut i = start;
    let mut end = tokens[start].range.end();
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Newline => break,
            TokenKind::Continuation => {
                // the backslash belongs to the comment, the line break does not
                end = tokens[i].range.start() + TextSize::new(1);
                i += 1;
                break;
            }
            _ => end = tokens[i].range.end(),
        }
        i += 1;
    }
    doc.alloc_closed(
        NodeId::ROOT,
        NodeKind::Comment,
        TextRange::new(tokens[start].range.start(), end),
    );
    i
}

/// `key [ws] [=|:] [ws] value`, value continued across `\` line breaks.
fn property(doc: &mut Document, tokens: &[Token<'_>], start: usize) -> usize {
    let mut i = start;

    // key: everything up to whitespace, a separator or the line end
    let mut key_end = tokens[start].range.start();
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Whitespace | TokenKind::Separator | TokenKind::Newline => break,
            TokenKind::Continuation => {
                i += 1;
                i = skip_whitespace(tokens, i);
                continue;
            }
            _ => key_end = tokens[i].range.end(),
        }
        i += 1;
    }
    let key_range = TextRange::new(tokens[start].range.start(), key_end);

    i = skip_whitespace(tokens, i);
    let mut separator = None;
    if let Some(tok) = tokens.get(i)
        && tok.kind == TokenKind::Separator
    {
        separator = Some(tok.range.start());
        i = skip_whitespace(tokens, i + 1);
    }
    while tokens.get(i).is_some_and(|t| t.kind == TokenKind::Continuation) {
        i = skip_whitespace(tokens, i + 1);
    }

    // value: the rest of the logical line
    let mut value: Option<TextRange> = None;
    while i < tokens.len() {
        let tok = &tokens[i];
        match tok.kind {
            TokenKind::Newline => break,
            TokenKind::Continuation => {}
            TokenKind::Whitespace => {}
            _ => {
                value = Some(match value {
                    Some(range) => range.cover(tok.range),
                    None => tok.range,
                });
            }
        }
        i += 1;
    }

    let property = doc.alloc(
        NodeId::ROOT,
        NodeKind::Property(PropertyData::default()),
        key_range,
    );
    let key = doc.alloc_closed(property, NodeKind::Scalar(ScalarKind::Plain), key_range);
    let value_node =
        value.map(|range| doc.alloc_closed(property, NodeKind::Scalar(ScalarKind::Plain), range));
    if let NodeKind::Property(data) = doc.kind_mut(property) {
        data.key = Some(key);
        data.value = value_node;
        data.separator = separator;
    }
    let end = value
        .map(|r| r.end())
        .or(separator.map(|s| s + TextSize::new(1)))
        .unwrap_or(key_end);
    doc.close(property, end);
    i
}

fn skip_whitespace(tokens: &[Token<'_>], mut i: usize) -> usize {
    while tokens.get(i).is_some_and(|t| t.kind == TokenKind::Whitespace) {
        i += 1;
    }
    i
}

/// Unescaped value of a properties scalar: `\` escapes resolved and
/// continuation breaks (with the next line's indentation) removed.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\r') | Some('\n') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                while chars.peek().is_some_and(|c| matches!(c, ' ' | '\t' | '\x0C')) {
                    chars.next();
                }
            }
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0C'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_text(text: &str) -> Document {
        parse(text, "file:///app/application.properties", &CancellationToken::new()).unwrap()
    }

    fn properties(doc: &Document) -> Vec<(String, Option<String>, bool)> {
        doc.children(NodeId::ROOT)
            .iter()
            .filter_map(|&c| match doc.kind_of(c) {
                NodeKind::Property(data) => Some((
                    doc.property_key(c).unwrap_or_default().to_owned(),
                    data.value.map(|v| doc.text_of(v).to_owned()),
                    data.separator.is_some(),
                )),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_basic_properties() {
        let doc = parse_text("# header\nserver.port=8080\nname : demo app\n\n%dev.server.port = 9090\n");
        assert_eq!(
            properties(&doc),
            vec![
                ("server.port".to_owned(), Some("8080".to_owned()), true),
                ("name".to_owned(), Some("demo app".to_owned()), true),
                ("%dev.server.port".to_owned(), Some("9090".to_owned()), true),
            ]
        );
        let comment = doc.children(NodeId::ROOT)[0];
        assert_eq!(doc.kind_of(comment), &NodeKind::Comment);
        assert_eq!(doc.text_of(comment), "# header");
    }

    #[test]
    fn test_missing_separator() {
        let doc = parse_text("just.a.key\nother=1");
        let props = properties(&doc);
        assert_eq!(props[0], ("just.a.key".to_owned(), None, false));
        assert!(props[1].2);
    }

    #[test]
    fn test_empty_value() {
        let doc = parse_text("a=\n");
        assert_eq!(properties(&doc), vec![("a".to_owned(), None, true)]);
    }

    #[test]
    fn test_continuation_extends_value() {
        let text = "list=a,\\\n    b,\\\n    c\nnext=1";
        let doc = parse_text(text);
        let props = properties(&doc);
        assert_eq!(props.len(), 2);
        let value = props[0].1.clone().unwrap();
        assert_eq!(unescape(&value), "a,b,c");
    }

    #[test]
    fn test_hash_inside_value_is_text() {
        let doc = parse_text("color=#fff");
        assert_eq!(properties(&doc)[0].1.as_deref(), Some("#fff"));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\=b\:c\\d\te"), "a=b:c\\d\te");
    }

    #[test]
    fn test_duplicate_keys_are_kept() {
        let doc = parse_text("a=1\nb=2\na=3");
        let keys: Vec<_> = properties(&doc).into_iter().map(|p| p.0).collect();
        assert_eq!(keys, vec!["a", "b", "a"]);
    }
}
