//! Position tracking for syntax nodes
//!
//! Converts between byte offsets (what the parsers record) and the 0-indexed
//! line/character positions an editor speaks. Line breaks may be `\n`, `\r\n`
//! or a lone `\r`.

use text_size::{TextRange, TextSize};

/// How the `character` field of a [`Position`] is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PositionEncoding {
    /// Byte offset within the line.
    Utf8,
    /// UTF-16 code units within the line (the LSP default).
    #[default]
    Utf16,
}

/// A position in source code (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A span representing a range in source code (0-indexed for LSP compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a span from line/character coordinates
    pub fn from_coords(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self {
            start: Position::new(start_line, start_char),
            end: Position::new(end_line, end_char),
        }
    }

    /// Check if a position falls within this span (end inclusive, for cursors)
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Byte-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Line start table for one document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
    encoding: PositionEncoding,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self::with_encoding(text, PositionEncoding::default())
    }

    pub fn with_encoding(text: &str, encoding: PositionEncoding) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(TextSize::new(i as u32 + 1)),
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    line_starts.push(TextSize::new(i as u32 + 1));
                }
                _ => {}
            }
            i += 1;
        }
        Self {
            line_starts,
            len: TextSize::of(text),
            encoding,
        }
    }

    pub fn encoding(&self) -> PositionEncoding {
        self.encoding
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the first character of `line`.
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Byte line/column of an offset. Offsets past the end clamp to the end.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        LineCol {
            line: line as u32,
            col: u32::from(offset - self.line_starts[line]),
        }
    }

    /// Editor position of an offset, using this index's encoding.
    pub fn position(&self, text: &str, offset: TextSize) -> Position {
        let LineCol { line, col } = self.line_col(offset);
        let character = match self.encoding {
            PositionEncoding::Utf8 => col,
            PositionEncoding::Utf16 => {
                let start = usize::from(self.line_starts[line as usize]);
                let end = start + col as usize;
                text.get(start..end)
                    .map(|s| s.encode_utf16().count() as u32)
                    .unwrap_or(col)
            }
        };
        Position::new(line, character)
    }

    /// Byte offset of an editor position. Characters past the end of the line
    /// clamp to the line end; lines past the end of the text return `None`.
    pub fn offset(&self, text: &str, position: Position) -> Option<TextSize> {
        let start = self.line_start(position.line)?;
        let end = self
            .line_start(position.line + 1)
            .unwrap_or(self.len);
        let line_text = &text[usize::from(start)..usize::from(end)];
        let line_text = line_text.trim_end_matches(['\n', '\r']);

        let mut consumed = 0u32;
        let mut bytes = 0usize;
        for ch in line_text.chars() {
            if consumed >= position.character {
                break;
            }
            consumed += match self.encoding {
                PositionEncoding::Utf8 => ch.len_utf8() as u32,
                PositionEncoding::Utf16 => ch.len_utf16() as u32,
            };
            bytes += ch.len_utf8();
        }
        Some(start + TextSize::new(bytes as u32))
    }

    /// Convert a byte range to an editor span.
    pub fn span(&self, text: &str, range: TextRange) -> Span {
        Span::new(
            self.position(text, range.start()),
            self.position(text, range.end()),
        )
    }
}
