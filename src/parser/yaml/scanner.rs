//! Stateful YAML scanner.
//!
//! Produces one token per [`YamlScanner::scan`] call. Indentation is only
//! significant for the first token on a line (`first_on_line`); inside flow
//! collections (`{...}`, `[...]`) the context stack changes which characters
//! end a plain scalar and when `:` separates a key.
//!
//! The scanner never fails. Every call consumes at least one byte until the
//! end of the text, after which it keeps returning `EndOfStream`.

use std::collections::VecDeque;

use text_size::{TextRange, TextSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A scalar followed by `:` (the colon is the next token).
    Key,
    Colon,
    /// `-` sequence item marker
    Dash,
    Comment,
    ObjectOpen,
    ObjectClose,
    ArrayOpen,
    ArrayClose,
    Comma,
    String,
    Number,
    Boolean,
    Null,
    QuoteStart,
    QuoteContent,
    QuoteEnd,
    /// `---`
    DocumentStart,
    /// Unrecognized input: byte order mark, anchors, tags, directives.
    Default,
    EndOfStream,
}

impl TokenKind {
    /// Tokens that become a scalar node on their own.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TokenKind::String | TokenKind::Number | TokenKind::Boolean | TokenKind::Null
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
    /// Byte column of the token start.
    pub column: u32,
    /// No other token precedes this one on its line.
    pub first_on_line: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    FlowMapping,
    FlowSequence,
}

pub struct YamlScanner<'a> {
    text: &'a str,
    pos: usize,
    line_start: usize,
    after_newline: bool,
    contexts: Vec<Context>,
    pending: VecDeque<Token>,
}

impl<'a> YamlScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line_start: 0,
            after_newline: true,
            contexts: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Take the next pending token if it continues a quoted scalar.
    pub fn next_quote_part(&mut self) -> Option<Token> {
        match self.pending.front() {
            Some(t) if matches!(t.kind, TokenKind::QuoteContent | TokenKind::QuoteEnd) => {
                self.pending.pop_front()
            }
            _ => None,
        }
    }

    fn in_flow(&self) -> bool {
        !self.contexts.is_empty()
    }

    fn byte(&self, i: usize) -> Option<u8> {
        self.text.as_bytes().get(i).copied()
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize, first_on_line: bool) -> Token {
        Token {
            kind,
            range: TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32)),
            column: (start - self.line_start) as u32,
            first_on_line,
        }
    }

    pub fn scan(&mut self) -> Token {
        if let Some(token) = self.pending.pop_front() {
            return token;
        }
        self.skip_trivia();

        let start = self.pos;
        if start >= self.text.len() {
            return self.token(TokenKind::EndOfStream, start, start, self.after_newline);
        }
        let first = std::mem::replace(&mut self.after_newline, false);
        let (kind, end) = self.classify(start, first);
        debug_assert!(end > start);
        // a split quoted scalar resumes after its queued tokens
        self.pos = self
            .pending
            .back()
            .map_or(end, |queued| usize::from(queued.range.end()));
        self.token(kind, start, end, first)
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.byte(self.pos) {
            match b {
                b' ' | b'\t' => self.pos += 1,
                b'\r' | b'\n' => {
                    self.pos += 1;
                    if b == b'\r' && self.byte(self.pos) == Some(b'\n') {
                        self.pos += 1;
                    }
                    self.line_start = self.pos;
                    self.after_newline = true;
                }
                _ => break,
            }
        }
    }

    /// Kind and end offset of the token starting at `start`.
    fn classify(&mut self, start: usize, first_on_line: bool) -> (TokenKind, usize) {
        let text = self.text;
        let rest = &text[start..];
        let next = self.byte(start + 1);
        let separated = |b: Option<u8>| matches!(b, None | Some(b' ' | b'\t' | b'\r' | b'\n'));

        match rest.as_bytes()[0] {
            b'#' => (TokenKind::Comment, start + line_len(rest)),
            b'-' if first_on_line
                && start == self.line_start
                && rest.starts_with("---")
                && separated(self.byte(start + 3)) =>
            {
                (TokenKind::DocumentStart, start + 3)
            }
            b'-' if separated(next) => (TokenKind::Dash, start + 1),
            b'{' => {
                self.contexts.push(Context::FlowMapping);
                (TokenKind::ObjectOpen, start + 1)
            }
            b'[' => {
                self.contexts.push(Context::FlowSequence);
                (TokenKind::ArrayOpen, start + 1)
            }
            b'}' => {
                if self.contexts.last() == Some(&Context::FlowMapping) {
                    self.contexts.pop();
                }
                (TokenKind::ObjectClose, start + 1)
            }
            b']' => {
                if self.contexts.last() == Some(&Context::FlowSequence) {
                    self.contexts.pop();
                }
                (TokenKind::ArrayClose, start + 1)
            }
            b',' if self.in_flow() => (TokenKind::Comma, start + 1),
            b':' if separated(next) || self.in_flow() => (TokenKind::Colon, start + 1),
            b'"' | b'\'' => self.quoted(start),
            b'|' | b'>' if is_block_scalar_header(&rest[1..]) => {
                (TokenKind::String, self.block_scalar_end(start))
            }
            b'&' | b'!' => (TokenKind::Default, start + word_len(rest)),
            b'*' => (TokenKind::String, start + word_len(rest)),
            b'%' if first_on_line => (TokenKind::Default, start + line_len(rest)),
            b'@' | b'`' => (TokenKind::Default, start + 1),
            b'?' if separated(next) => (TokenKind::Default, start + 1),
            _ if rest.starts_with('\u{feff}') => (TokenKind::Default, start + '\u{feff}'.len_utf8()),
            _ => self.plain(start),
        }
    }

    /// A quoted scalar is either a key (`"a": 1`) or a value split into
    /// start/content/end tokens. Escapes are skipped over, not decoded.
    fn quoted(&mut self, start: usize) -> (TokenKind, usize) {
        let bytes = self.text.as_bytes();
        let quote = bytes[start];
        let mut i = start + 1;
        let mut terminated = false;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b'\n' || b == b'\r' {
                break;
            }
            if quote == b'"' && b == b'\\' {
                i = (i + 2).min(bytes.len());
                continue;
            }
            if b == quote {
                if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                terminated = true;
                break;
            }
            i += 1;
        }
        let content_end = i;
        let end = if terminated { i + 1 } else { i };

        if terminated {
            let mut j = end;
            while matches!(bytes.get(j), Some(b' ' | b'\t')) {
                j += 1;
            }
            let after = bytes.get(j + 1).copied();
            if bytes.get(j) == Some(&b':')
                && (self.in_flow() || matches!(after, None | Some(b' ' | b'\t' | b'\r' | b'\n')))
            {
                return (TokenKind::Key, end);
            }
        }

        if content_end > start + 1 {
            let content = self.token(TokenKind::QuoteContent, start + 1, content_end, false);
            self.pending.push_back(content);
        }
        if terminated {
            let close = self.token(TokenKind::QuoteEnd, content_end, end, false);
            self.pending.push_back(close);
        }
        (TokenKind::QuoteStart, start + 1)
    }

    /// Plain scalar: runs to the end of the line, ` #`, `: `, or (in flow
    /// context) a flow indicator.
    fn plain(&self, start: usize) -> (TokenKind, usize) {
        let flow = self.in_flow();
        let bytes = self.text.as_bytes();
        let mut i = start;
        let mut is_key = false;

        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'\r' | b'\n' => break,
                b':' => {
                    let after = bytes.get(i + 1).copied();
                    let ends = matches!(after, None | Some(b' ' | b'\t' | b'\r' | b'\n'))
                        || (flow && matches!(after, Some(b',' | b']' | b'}')));
                    if ends && i > start {
                        is_key = true;
                        break;
                    }
                }
                b'#' if i > start && matches!(bytes[i - 1], b' ' | b'\t') => break,
                b',' | b']' | b'}' | b'[' | b'{' if flow && i > start => break,
                _ => {}
            }
            i += utf8_len(b);
        }
        let i = i.min(bytes.len());

        let mut end = i;
        while end > start && matches!(bytes[end - 1], b' ' | b'\t') {
            end -= 1;
        }
        if end == start {
            // a lone indicator; always make progress
            end = start + utf8_len(bytes[start]);
        }
        if is_key {
            return (TokenKind::Key, end);
        }
        (scalar_kind(&self.text[start..end]), end)
    }

    /// `|`/`>` block scalars own every following line indented deeper than
    /// the line holding the indicator.
    fn block_scalar_end(&self, start: usize) -> usize {
        let text = self.text;
        let bytes = text.as_bytes();
        let indent = bytes[self.line_start..]
            .iter()
            .take_while(|&&b| b == b' ')
            .count();

        let mut end = start + line_len(&text[start..]);
        let mut line = end;
        while line < bytes.len() {
            // step over the line break
            if bytes[line] == b'\r' {
                line += 1;
            }
            if bytes.get(line) == Some(&b'\n') {
                line += 1;
            }
            let content = &text[line..];
            let len = line_len(content);
            let spaces = content.bytes().take_while(|&b| b == b' ').count();
            let blank = content[..len].trim().is_empty();
            if !blank && spaces <= indent {
                break;
            }
            if !blank {
                end = line + len;
            }
            if len == 0 && line >= bytes.len() {
                break;
            }
            line += len;
        }
        end
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    }
}

fn line_len(s: &str) -> usize {
    s.find(['\r', '\n']).unwrap_or(s.len())
}

fn word_len(s: &str) -> usize {
    s.find([' ', '\t', '\r', '\n', ',', ']', '}'])
        .unwrap_or(s.len())
        .max(1)
}

fn is_block_scalar_header(rest: &str) -> bool {
    let header = &rest[..line_len(rest)];
    let indicators = header
        .bytes()
        .take_while(|b| matches!(b, b'+' | b'-' | b'0'..=b'9'))
        .count();
    let tail = header[indicators..].trim_start();
    tail.is_empty() || tail.starts_with('#')
}

/// Lexical classification of a plain scalar.
pub fn scalar_kind(text: &str) -> TokenKind {
    match text {
        "null" | "Null" | "NULL" | "~" => TokenKind::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => TokenKind::Boolean,
        _ if is_number(text) => TokenKind::Number,
        _ => TokenKind::String,
    }
}

fn is_number(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if matches!(
        unsigned,
        ".inf" | ".Inf" | ".INF" | ".nan" | ".NaN" | ".NAN"
    ) {
        return true;
    }
    if let Some(hex) = unsigned.strip_prefix("0x") {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    if let Some(oct) = unsigned.strip_prefix("0o") {
        return !oct.is_empty() && oct.bytes().all(|b| (b'0'..=b'7').contains(&b));
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };
    let mut parts = mantissa.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = digits(whole)
        && fraction.is_none_or(digits)
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));
    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    mantissa_ok && exponent_ok
}

/// Scan the whole text, end-of-stream token included.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut scanner = YamlScanner::new(text);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.scan();
        let done = token.kind == TokenKind::EndOfStream;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
