//! Glob patterns that silence diagnostics by key or path.
//!
//! `*` matches any run of characters except `/`, `**` matches any run, and
//! a pattern that is exactly `*` matches everything.

use smol_str::SmolStr;

#[derive(Clone, Debug, PartialEq, Eq)]
enum GlobToken {
    Literal(SmolStr),
    Star,
    DoubleStar,
}

/// A compiled exclusion pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glob {
    source: SmolStr,
    tokens: Vec<GlobToken>,
    match_all: bool,
}

impl Glob {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '*' {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                tokens.push(GlobToken::Literal(SmolStr::new(&literal)));
                literal.clear();
            }
            if chars.peek() == Some(&'*') {
                chars.next();
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                tokens.push(GlobToken::DoubleStar);
            } else {
                tokens.push(GlobToken::Star);
            }
        }
        if !literal.is_empty() {
            tokens.push(GlobToken::Literal(SmolStr::new(&literal)));
        }
        Self {
            source: SmolStr::new(pattern),
            match_all: pattern == "*",
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.match_all {
            return true;
        }
        let chars: Vec<char> = text.chars().collect();
        match_from(&self.tokens, &chars)
    }
}

/// Backtracking-free match: `reachable[i]` is set when the tokens consumed
/// so far can end right before `text[i]`.
fn match_from(tokens: &[GlobToken], text: &[char]) -> bool {
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            GlobToken::Literal(lit) => {
                let lit: Vec<char> = lit.chars().collect();
                for i in 0..=text.len() {
                    if reachable[i] && text[i..].starts_with(&lit) {
                        next[i + lit.len()] = true;
                    }
                }
            }
            GlobToken::Star | GlobToken::DoubleStar => {
                let crosses = matches!(token, GlobToken::DoubleStar);
                let mut carrying = false;
                for i in 0..=text.len() {
                    if reachable[i] {
                        carrying = true;
                    }
                    if carrying {
                        next[i] = true;
                    }
                    if i < text.len() && text[i] == '/' && !crosses {
                        carrying = false;
                    }
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

/// A set of exclusion globs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    globs: Vec<Glob>,
}

impl ExclusionFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            globs: patterns
                .into_iter()
                .filter(|p| !p.as_ref().trim().is_empty())
                .map(|p| Glob::new(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    /// Whether `key` is excluded. Profile-prefixed config keys (`%dev.a.b`)
    /// also match the patterns written for the plain key.
    pub fn is_excluded(&self, key: &str) -> bool {
        let plain = super::config::strip_profile(key).1;
        self.globs
            .iter()
            .any(|g| g.matches(key) || (plain != key && g.matches(plain)))
    }
}
