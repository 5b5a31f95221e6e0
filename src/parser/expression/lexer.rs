//! Logos-based lexer for template expressions.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and absolute position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Word,
    Number,
    String,
    Dot,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    /// `??` optional marker
    QuestionQuestion,
    /// `?:` elvis operator
    Elvis,
    Operator,
    Error,
}

/// Lexer wrapping the logos-generated tokenizer. Offsets are shifted by
/// `base` so tokens point into the enclosing document.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    base: TextSize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, base: TextSize) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            base,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let span = self.inner.span();
        let range = TextRange::new(
            self.base + TextSize::new(span.start as u32),
            self.base + TextSize::new(span.end as u32),
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
pub fn tokenize(input: &str, base: TextSize) -> Vec<Token<'_>> {
    Lexer::new(input, base).collect()
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum LogosToken {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r#"[^ \t\r\n.:(),'"?!{}\[\]=<>&|+*/%\-]+"#)]
    Word,

    #[regex(r"[0-9]+(\.[0-9]+)?[lLdDfF]?", priority = 10)]
    Number,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    String,

    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("??")]
    QuestionQuestion,
    #[token("?:")]
    Elvis,

    #[regex(r"[!=<>&|+*/%\-]+")]
    Operator,
}

impl From<LogosToken> for TokenKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Whitespace => TokenKind::Whitespace,
            LogosToken::Word => TokenKind::Word,
            LogosToken::Number => TokenKind::Number,
            LogosToken::String => TokenKind::String,
            LogosToken::Dot => TokenKind::Dot,
            LogosToken::Colon => TokenKind::Colon,
            LogosToken::LParen => TokenKind::LParen,
            LogosToken::RParen => TokenKind::RParen,
            LogosToken::LBracket => TokenKind::LBracket,
            LogosToken::RBracket => TokenKind::RBracket,
            LogosToken::Comma => TokenKind::Comma,
            LogosToken::QuestionQuestion => TokenKind::QuestionQuestion,
            LogosToken::Elvis => TokenKind::Elvis,
            LogosToken::Operator => TokenKind::Operator,
        }
    }
}
