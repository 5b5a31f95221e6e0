//! Expression / part-chain parser.
//!
//! ```text
//! expression := operand (WS name WS operand)* ['??']     infix: a b c == a.b(c)
//! operand    := literal ('.' link)* | [ns ':'] link ('.' link)*
//! link       := ident ['(' expression (',' expression)* ')']
//! ```
//!
//! Parts are appended as children of the expression node in chain order; a
//! method part owns its argument expressions. Malformed input ends the chain
//! early instead of failing.

mod lexer;

pub use lexer::{Token, TokenKind, tokenize};

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::syntax::{Document, ExpressionData, LiteralKind, NodeId, NodeKind, PartData};

/// Parse `content` into a new expression node under `parent`.
///
/// `node_range` is the range of the whole construct (for templates, the
/// braces included); `content` is the text between the delimiters. The node
/// is closed only when `terminated` is set.
pub fn parse_expression(
    doc: &mut Document,
    parent: NodeId,
    node_range: TextRange,
    content: TextRange,
    terminated: bool,
) -> NodeId {
    let text = doc.slice(content).to_owned();
    let mut tokens: Vec<Tok> = tokenize(&text, content.start())
        .into_iter()
        .map(|t| Tok {
            kind: t.kind,
            text: SmolStr::new(t.text),
            range: t.range,
        })
        .collect();

    while tokens.last().is_some_and(|t| t.kind == TokenKind::Whitespace) {
        tokens.pop();
    }
    let optional = tokens
        .last()
        .is_some_and(|t| t.kind == TokenKind::QuestionQuestion);
    if optional {
        tokens.pop();
    }

    let expression = doc.alloc(
        parent,
        NodeKind::Expression(ExpressionData { content, optional }),
        node_range,
    );
    let mut parser = ExpressionParser { doc, tokens: &tokens };
    parser.sequence(expression, 0, tokens.len());
    if terminated {
        parser.doc.close(expression, node_range.end());
    }
    expression
}

/// Whether `word` is spelled like a literal operand.
pub fn literal_kind(word: &str) -> Option<LiteralKind> {
    match word {
        "true" | "false" => return Some(LiteralKind::Boolean),
        "null" => return Some(LiteralKind::Null),
        _ => {}
    }
    let first = word.chars().next()?;
    if first == '\'' || first == '"' {
        return Some(LiteralKind::String);
    }
    if !first.is_ascii_digit() {
        return None;
    }
    let (digits, suffix) = match word.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&word[..i], Some(c.to_ascii_lowercase())),
        _ => (word, None),
    };
    let numeric = digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if !numeric {
        return None;
    }
    Some(match suffix {
        Some('l') => LiteralKind::Long,
        Some('d') | Some('f') => LiteralKind::Double,
        Some(_) => return None,
        None if digits.contains('.') => LiteralKind::Double,
        None => LiteralKind::Integer,
    })
}

/// Whether `word` can name a part.
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if unicode_ident::is_xid_start(c) || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| unicode_ident::is_xid_continue(c) || c == '$' || c == '-')
}

#[derive(Debug, Clone)]
struct Tok {
    kind: TokenKind,
    text: SmolStr,
    range: TextRange,
}

struct ExpressionParser<'d, 't> {
    doc: &'d mut Document,
    tokens: &'t [Tok],
}

impl ExpressionParser<'_, '_> {
    fn kind(&self, i: usize, end: usize) -> Option<TokenKind> {
        (i < end).then(|| self.tokens[i].kind)
    }

    fn skip_ws(&self, mut i: usize, end: usize) -> usize {
        while self.kind(i, end) == Some(TokenKind::Whitespace) {
            i += 1;
        }
        i
    }

    /// operand (WS name WS operand)*
    fn sequence(&mut self, expression: NodeId, start: usize, end: usize) {
        let mut i = self.skip_ws(start, end);
        let Some(next) = self.operand(expression, i, end) else {
            return;
        };
        i = next;

        loop {
            let after_ws = self.skip_ws(i, end);
            if after_ws == i || after_ws >= end {
                return;
            }
            let name_tok = &self.tokens[after_ws];
            let is_method_name = match name_tok.kind {
                TokenKind::Elvis => true,
                TokenKind::Word => {
                    literal_kind(&name_tok.text).is_none() && is_identifier(&name_tok.text)
                }
                _ => false,
            };
            if !is_method_name {
                return;
            }
            let method = self.doc.alloc(
                expression,
                NodeKind::MethodPart(PartData {
                    name: name_tok.text.clone(),
                }),
                name_tok.range,
            );

            let operand_start = self.skip_ws(after_ws + 1, end);
            if operand_start == after_ws + 1 || operand_start >= end {
                // `a b` with no operand
                self.doc.close_here(method);
                return;
            }
            let operand_end = self.operand_extent(operand_start, end);
            let argument = self.argument(method, operand_start, operand_end);
            self.doc.close_here(method);
            if argument.is_none() {
                return;
            }
            i = operand_end;
        }
    }

    /// Token index just past the operand starting at `start`: everything up to
    /// the next whitespace outside parentheses.
    fn operand_extent(&self, start: usize, end: usize) -> usize {
        let mut depth = 0usize;
        let mut i = start;
        while i < end {
            match self.tokens[i].kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::Whitespace if depth == 0 => break,
                _ => {}
            }
            i += 1;
        }
        i
    }

    /// Allocate an argument expression covering tokens `start..end`.
    fn argument(&mut self, method: NodeId, start: usize, end: usize) -> Option<NodeId> {
        let start = self.skip_ws(start, end);
        let mut last = end;
        while last > start && self.tokens[last - 1].kind == TokenKind::Whitespace {
            last -= 1;
        }
        if start >= last {
            return None;
        }
        let range = TextRange::new(
            self.tokens[start].range.start(),
            self.tokens[last - 1].range.end(),
        );
        let argument = self.doc.alloc(
            method,
            NodeKind::Expression(ExpressionData {
                content: range,
                optional: false,
            }),
            range,
        );
        self.sequence(argument, start, last);
        self.doc.close(argument, range.end());
        Some(argument)
    }

    /// Parse one operand; returns the index after it.
    fn operand(&mut self, expression: NodeId, start: usize, end: usize) -> Option<usize> {
        let tok = self.tokens.get(start).filter(|_| start < end)?.clone();
        let mut i = match tok.kind {
            TokenKind::String | TokenKind::Number => {
                let kind = literal_kind(&tok.text)?;
                self.doc
                    .alloc_closed(expression, NodeKind::Literal(kind), tok.range);
                start + 1
            }
            TokenKind::Word => {
                if let Some(kind) = literal_kind(&tok.text) {
                    self.doc
                        .alloc_closed(expression, NodeKind::Literal(kind), tok.range);
                    start + 1
                } else {
                    let mut i = start;
                    if self.kind(i + 1, end) == Some(TokenKind::Colon)
                        && self.kind(i + 2, end) == Some(TokenKind::Word)
                    {
                        self.doc.alloc_closed(
                            expression,
                            NodeKind::NamespacePart(PartData {
                                name: tok.text.clone(),
                            }),
                            tok.range,
                        );
                        i += 2;
                    }
                    self.link(expression, i, end, true)?
                }
            }
            _ => return None,
        };

        while self.kind(i, end) == Some(TokenKind::Dot) {
            if self.kind(i + 1, end) != Some(TokenKind::Word) {
                // trailing `.`: keep the resolved prefix
                return Some(i + 1);
            }
            i = self.link(expression, i + 1, end, false)?;
        }
        Some(i)
    }

    /// ident ['(' args ')']
    fn link(&mut self, expression: NodeId, i: usize, end: usize, first: bool) -> Option<usize> {
        let tok = self.tokens.get(i).filter(|_| i < end)?.clone();
        if tok.kind != TokenKind::Word {
            return None;
        }
        let data = PartData {
            name: tok.text.clone(),
        };

        if self.kind(i + 1, end) != Some(TokenKind::LParen) {
            let kind = if first {
                NodeKind::ObjectPart(data)
            } else {
                NodeKind::PropertyPart(data)
            };
            self.doc.alloc_closed(expression, kind, tok.range);
            return Some(i + 1);
        }

        let method = self
            .doc
            .alloc(expression, NodeKind::MethodPart(data), tok.range);
        let mut depth = 0usize;
        let mut arg_start = i + 2;
        let mut j = i + 2;
        while j < end {
            match self.tokens[j].kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => {
                    self.argument(method, arg_start, j);
                    self.doc.close(method, self.tokens[j].range.end());
                    return Some(j + 1);
                }
                TokenKind::RParen => depth -= 1,
                TokenKind::Comma if depth == 0 => {
                    self.argument(method, arg_start, j);
                    arg_start = j + 1;
                }
                _ => {}
            }
            j += 1;
        }
        // unterminated argument list
        self.argument(method, arg_start, end);
        let last_end = self.tokens[end - 1].range.end();
        self.doc.extend_to(method, last_end);
        self.doc.close_here(method);
        Some(end)
    }
}

/// Number of arguments of a method part.
pub fn argument_count(doc: &Document, method: NodeId) -> usize {
    doc.children(method)
        .iter()
        .filter(|&&c| matches!(doc.kind_of(c), NodeKind::Expression(_)))
        .count()
}

/// Expression text covered by `part` and everything before it, e.g.
/// `inject:bean.items` for the `items` part.
pub fn chain_text(doc: &Document, part: NodeId) -> String {
    let Some(expression) = doc.owning_expression(part) else {
        return doc.text_of(part).to_owned();
    };
    let start = doc
        .parts(expression)
        .next()
        .map(|first| doc.range(first).start())
        .unwrap_or_else(|| doc.range(part).start());
    let end = doc.part_name_range(part).end();
    if start > end {
        return String::new();
    }
    doc.slice(TextRange::new(start, end)).to_owned()
}

/// Offset right after the last part, where a `??` marker would go.
pub fn expression_end(doc: &Document, expression: NodeId) -> TextSize {
    doc.parts(expression)
        .last()
        .map(|p| doc.range(p).end())
        .unwrap_or_else(|| doc.range(expression).end())
}
