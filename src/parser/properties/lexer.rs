//! Logos-based lexer for `.properties` files.
//!
//! Tokens are context-free; whether `#` opens a comment or `:` separates a
//! key is decided by the parser from the token's position on the line.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Newline,
    Whitespace,
    /// `#` or `!`
    CommentMarker,
    /// `=` or `:`
    Separator,
    /// `\` at the end of a line, newline included
    Continuation,
    /// `\` followed by any other character
    Escape,
    Text,
    Error,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let span = self.inner.span();
        let range = TextRange::new(
            TextSize::new(span.start as u32),
            TextSize::new(span.end as u32),
        );
        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => TokenKind::Error,
        };
        Some(Token {
            kind,
            text: self.inner.slice(),
            range,
        })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum LogosToken {
    #[regex(r"\r\n|\r|\n")]
    Newline,

    #[regex(r"[ \t\x0C]+")]
    Whitespace,

    #[token("#")]
    #[token("!")]
    CommentMarker,

    #[token("=")]
    #[token(":")]
    Separator,

    #[regex(r"\\(\r\n|\r|\n)")]
    Continuation,

    #[regex(r"\\[^\r\n]?")]
    Escape,

    #[regex(r"[^ \t\x0C\r\n=:#!\\]+")]
    Text,
}

impl From<LogosToken> for TokenKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Newline => TokenKind::Newline,
            LogosToken::Whitespace => TokenKind::Whitespace,
            LogosToken::CommentMarker => TokenKind::CommentMarker,
            LogosToken::Separator => TokenKind::Separator,
            LogosToken::Continuation => TokenKind::Continuation,
            LogosToken::Escape => TokenKind::Escape,
            LogosToken::Text => TokenKind::Text,
        }
    }
}
