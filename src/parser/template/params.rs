//! Section start-tag parameters.
//!
//! The parameter text after the section name is split on top-level
//! whitespace and interpreted per section kind. Values that are expressions
//! get an `Expression` child under their `Parameter` node.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::parser::expression::parse_expression;
use crate::syntax::{Document, NodeId, NodeKind, ParameterData, SectionKind};

/// Operators accepted between `{#if}` operands.
const CONDITION_OPERATORS: &[&str] = &[
    "&&", "||", "and", "or", "==", "!=", "eq", "ne", "is", ">", "gt", ">=", "ge", "<", "lt",
    "<=", "le", "!",
];

/// Operators of `{#is}`/`{#case}` branches.
const CASE_OPERATORS: &[&str] = &[
    "in", "ni", "!in", "not", "!=", "ne", ">", "gt", ">=", "ge", "<", "lt", "<=", "le",
];

pub(super) fn add_parameters(
    doc: &mut Document,
    section: NodeId,
    kind: SectionKind,
    region: TextRange,
) {
    let text = doc.source();
    let mut tokens = split(&text, region);

    match kind {
        SectionKind::If | SectionKind::Else => {
            if kind == SectionKind::Else
                && tokens.first().is_some_and(|&t| slice(&text, t) == "if")
            {
                tokens.remove(0);
            }
            for token in tokens {
                add_operands(doc, section, &text, token);
            }
        }
        SectionKind::When | SectionKind::With | SectionKind::Eval => {
            for token in tokens {
                add_parameter(doc, section, None, None, token, false, true);
            }
        }
        SectionKind::Is => {
            for token in tokens {
                if !CASE_OPERATORS.contains(&slice(&text, token)) {
                    add_parameter(doc, section, None, None, token, false, false);
                }
            }
        }
        SectionKind::For => {
            let is_in = |t: &TextRange| slice(&text, *t) == "in";
            match tokens.as_slice() {
                [alias, keyword, iterable, ..] if is_in(keyword) => {
                    let name = SmolStr::new(slice(&text, *alias));
                    let whole = TextRange::new(alias.start(), iterable.end());
                    add_loop(doc, section, Some((name, *alias)), *iterable, whole);
                }
                [iterable, ..] => add_loop(doc, section, None, *iterable, *iterable),
                [] => {}
            }
        }
        SectionKind::Each => {
            if let Some(&iterable) = tokens.first() {
                add_loop(doc, section, None, iterable, iterable);
            }
        }
        SectionKind::Let
        | SectionKind::Set
        | SectionKind::Cached
        | SectionKind::Include
        | SectionKind::Insert
        | SectionKind::Fragment
        | SectionKind::UserTag => {
            for token in tokens {
                match assignment(&text, token) {
                    Some((name, name_range, value, default)) => {
                        add_parameter(doc, section, Some(name), Some(name_range), value, default, true);
                    }
                    None => {
                        // positional: an expression for tags, a template id otherwise
                        let is_expression = kind == SectionKind::UserTag;
                        add_parameter(doc, section, None, None, token, false, is_expression);
                    }
                }
            }
        }
    }
}

fn slice(text: &str, range: TextRange) -> &str {
    &text[usize::from(range.start())..usize::from(range.end())]
}

/// Split on whitespace outside quotes and parentheses.
fn split(text: &str, region: TextRange) -> Vec<TextRange> {
    let base = usize::from(region.start());
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for (i, c) in slice(text, region).char_indices() {
        let at = base + i;
        let boundary = quote.is_none() && depth == 0 && c.is_whitespace();
        if boundary {
            if let Some(s) = start.take() {
                tokens.push(TextRange::new(TextSize::new(s as u32), TextSize::new(at as u32)));
            }
            continue;
        }
        start.get_or_insert(at);
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(TextRange::new(TextSize::new(s as u32), region.end()));
    }
    tokens
}

/// Condition operands: operators are skipped, `!` prefixes and grouping
/// parentheses are peeled off.
fn add_operands(doc: &mut Document, section: NodeId, text: &str, token: TextRange) {
    let word = slice(text, token);
    if CONDITION_OPERATORS.contains(&word) {
        return;
    }
    if let Some(stripped) = word.strip_prefix('!') {
        let start = token.end() - TextSize::of(stripped);
        if start < token.end() {
            add_operands(doc, section, text, TextRange::new(start, token.end()));
        }
        return;
    }
    if word.starts_with('(') && word.ends_with(')') && word.len() >= 2 {
        let inner = TextRange::new(token.start() + TextSize::new(1), token.end() - TextSize::new(1));
        for nested in split(text, inner) {
            add_operands(doc, section, text, nested);
        }
        return;
    }
    add_parameter(doc, section, None, None, token, false, true);
}

/// `name=value` or `name?=value`.
fn assignment(text: &str, token: TextRange) -> Option<(SmolStr, TextRange, TextRange, bool)> {
    let word = slice(text, token);
    let bytes = word.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'(' => return None,
                b'=' => {
                    if bytes.get(i + 1) == Some(&b'=') || i == 0 {
                        return None;
                    }
                    let default = bytes[i - 1] == b'?';
                    let name_end = if default { i - 1 } else { i };
                    if name_end == 0 || matches!(bytes[i - 1], b'!' | b'<' | b'>') {
                        return None;
                    }
                    let name_range =
                        TextRange::at(token.start(), TextSize::new(name_end as u32));
                    let value_range =
                        TextRange::new(token.start() + TextSize::new(i as u32 + 1), token.end());
                    return Some((SmolStr::new(&word[..name_end]), name_range, value_range, default));
                }
                _ => {}
            },
        }
    }
    None
}

fn add_loop(
    doc: &mut Document,
    section: NodeId,
    alias: Option<(SmolStr, TextRange)>,
    iterable: TextRange,
    whole: TextRange,
) {
    let (name, name_range) = match alias {
        Some((name, range)) => (name, Some(range)),
        None => (SmolStr::new_static("it"), None),
    };
    let parameter = doc.alloc(
        section,
        NodeKind::Parameter(ParameterData {
            name: Some(name),
            name_range,
            value: iterable,
            default_assignment: false,
        }),
        whole,
    );
    parse_expression(doc, parameter, iterable, iterable, true);
    doc.close(parameter, whole.end());
}

fn add_parameter(
    doc: &mut Document,
    section: NodeId,
    name: Option<SmolStr>,
    name_range: Option<TextRange>,
    value: TextRange,
    default_assignment: bool,
    is_expression: bool,
) {
    let whole = match name_range {
        Some(n) => n.cover(value),
        None => value,
    };
    let parameter = doc.alloc(
        section,
        NodeKind::Parameter(ParameterData {
            name,
            name_range,
            value,
            default_assignment,
        }),
        whole,
    );
    if is_expression && !value.is_empty() {
        parse_expression(doc, parameter, value, value, true);
    }
    doc.close(parameter, whole.end());
}
