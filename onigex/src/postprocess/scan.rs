//! Tokenizer for generated patterns
//!
//! Generated patterns use host syntax plus three extensions understood only by the
//! rewrite passes: atomic groups `(?>...)`, possessive quantifiers (`*+`, `++`, `?+`,
//! `{n,m}+`) and bounded recursion markers `(?R=N)` and `\g<ref&R=N>`. The tokenizer
//! splits a pattern into pieces that keep their exact source text, so a pass can
//! rewrite what it cares about and copy everything else through unchanged.

use crate::error::{OnigexError, Result};

/// Reference to a group inside a `\g<ref&R=N>` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Number(usize),
    Name(String),
}

/// Kinds of tokens in a generated pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `(` or `(?<name>`
    CaptureOpen { name: Option<String> },
    /// `(?:` or a modifier group such as `(?i:`
    GroupOpen,
    /// `(?>`
    AtomicOpen,
    /// `(?=`, `(?!`, `(?<=`, `(?<!`
    LookAroundOpen,
    /// `)`
    Close,
    /// `|`
    Alternation,
    /// A quantifier with its lazy or possessive suffix
    Quantifier { possessive: bool },
    /// Numbered backreference `\N`
    Backref(usize),
    /// `(?R=N)`
    Recursion { depth: u32 },
    /// `\g<ref&R=N>`
    GroupRecursion { target: GroupRef, depth: u32 },
    /// `^`, `$`, `\b`, `\B`
    Assertion,
    /// Anything matching a single character: literal, escape, class
    Atom,
}

/// A token and its exact source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    /// Whether the token opens a group of any kind
    pub fn is_open(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::CaptureOpen { .. }
                | TokenKind::GroupOpen
                | TokenKind::AtomicOpen
                | TokenKind::LookAroundOpen
        )
    }
}

struct Scanner {
    chars: Vec<char>,
    position: usize,
}

/// Split a generated pattern into tokens
///
/// # Errors
/// `Syntax` for an unterminated escape, class or group opener.
pub fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner {
        chars: pattern.chars().collect(),
        position: 0,
    };
    let mut tokens = Vec::new();
    while scanner.position < scanner.chars.len() {
        tokens.push(scanner.token()?);
    }
    Ok(tokens)
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn rest_starts_with(&self, s: &str) -> bool {
        let mut i = self.position;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn text_from(&self, start: usize) -> String {
        self.chars[start..self.position].iter().collect()
    }

    fn error(&self, message: &str) -> OnigexError {
        OnigexError::syntax(message, self.position)
    }

    /// Consume characters up to and including `end`
    fn consume_until(&mut self, end: char) -> Result<String> {
        let start = self.position;
        while let Some(c) = self.peek() {
            self.position += 1;
            if c == end {
                return Ok(self.chars[start..self.position - 1].iter().collect());
            }
        }
        Err(self.error("unterminated sequence"))
    }

    fn digits(&mut self) -> String {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
        }
        self.text_from(start)
    }

    fn token(&mut self) -> Result<Token> {
        let start = self.position;
        let c = self.chars[self.position];
        self.position += 1;
        let kind = match c {
            '\\' => self.escape()?,
            '[' => {
                self.class()?;
                TokenKind::Atom
            }
            '(' => self.group_open()?,
            ')' => TokenKind::Close,
            '|' => TokenKind::Alternation,
            '^' | '$' => TokenKind::Assertion,
            '*' | '+' | '?' => self.quantifier_suffix(),
            '{' if self.interval() => self.quantifier_suffix(),
            _ => TokenKind::Atom,
        };
        Ok(Token {
            kind,
            text: self.text_from(start),
        })
    }

    fn quantifier_suffix(&mut self) -> TokenKind {
        match self.peek() {
            Some('+') => {
                self.position += 1;
                TokenKind::Quantifier { possessive: true }
            }
            Some('?') => {
                self.position += 1;
                TokenKind::Quantifier { possessive: false }
            }
            _ => TokenKind::Quantifier { possessive: false },
        }
    }

    /// `{n}`, `{n,}` or `{n,m}` after the `{`; consumes it only on a match
    fn interval(&mut self) -> bool {
        let start = self.position;
        let min = self.digits();
        let mut ok = !min.is_empty();
        if ok && self.peek() == Some(',') {
            self.position += 1;
            self.digits();
        }
        ok = ok && self.peek() == Some('}');
        if ok {
            self.position += 1;
        } else {
            self.position = start;
        }
        ok
    }

    fn escape(&mut self) -> Result<TokenKind> {
        let Some(c) = self.peek() else {
            return Err(self.error("trailing backslash"));
        };
        self.position += 1;
        let kind = match c {
            '1'..='9' => {
                self.position -= 1;
                let digits = self.digits();
                let number = digits
                    .parse()
                    .map_err(|_| self.error("invalid backreference"))?;
                TokenKind::Backref(number)
            }
            'b' | 'B' => TokenKind::Assertion,
            'k' => {
                if self.peek() == Some('<') {
                    self.consume_until('>')?;
                }
                TokenKind::Atom
            }
            'g' if self.peek() == Some('<') => {
                self.position += 1;
                let body = self.consume_until('>')?;
                self.group_recursion(&body)?
            }
            'p' | 'P' | 'u' | 'x' if self.peek() == Some('{') => {
                self.consume_until('}')?;
                TokenKind::Atom
            }
            'u' => {
                self.position = (self.position + 4).min(self.chars.len());
                TokenKind::Atom
            }
            'x' => {
                self.position = (self.position + 2).min(self.chars.len());
                TokenKind::Atom
            }
            'c' => {
                self.position = (self.position + 1).min(self.chars.len());
                TokenKind::Atom
            }
            _ => TokenKind::Atom,
        };
        Ok(kind)
    }

    /// Body of `\g<ref&R=N>`
    fn group_recursion(&self, body: &str) -> Result<TokenKind> {
        let Some((target, depth)) = body.split_once("&R=") else {
            return Err(self.error("subroutine without recursion depth"));
        };
        let depth = depth
            .parse()
            .map_err(|_| self.error("invalid recursion depth"))?;
        let target = match target.parse() {
            Ok(number) => GroupRef::Number(number),
            Err(_) => GroupRef::Name(target.to_string()),
        };
        Ok(TokenKind::GroupRecursion { target, depth })
    }

    /// Consume a class after its `[`, including nested classes
    fn class(&mut self) -> Result<()> {
        let mut depth = 1;
        while let Some(c) = self.peek() {
            self.position += 1;
            match c {
                '\\' => self.position += 1,
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unterminated character class"))
    }

    fn group_open(&mut self) -> Result<TokenKind> {
        if self.peek() != Some('?') {
            return Ok(TokenKind::CaptureOpen { name: None });
        }
        self.position += 1;
        let kind = if self.rest_starts_with(":") {
            self.position += 1;
            TokenKind::GroupOpen
        } else if self.rest_starts_with(">") {
            self.position += 1;
            TokenKind::AtomicOpen
        } else if self.rest_starts_with("=") || self.rest_starts_with("!") {
            self.position += 1;
            TokenKind::LookAroundOpen
        } else if self.rest_starts_with("<=") || self.rest_starts_with("<!") {
            self.position += 2;
            TokenKind::LookAroundOpen
        } else if self.rest_starts_with("<") {
            self.position += 1;
            let name = self.consume_until('>')?;
            TokenKind::CaptureOpen { name: Some(name) }
        } else if self.rest_starts_with("R=") {
            self.position += 2;
            let depth = self.digits();
            if self.peek() != Some(')') {
                return Err(self.error("unterminated recursion marker"));
            }
            self.position += 1;
            let depth = depth
                .parse()
                .map_err(|_| self.error("invalid recursion depth"))?;
            TokenKind::Recursion { depth }
        } else {
            // Modifier group such as `(?i:` or `(?i-s:`
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '-')
            {
                self.position += 1;
            }
            if self.peek() != Some(':') {
                return Err(self.error("invalid group"));
            }
            self.position += 1;
            TokenKind::GroupOpen
        };
        Ok(kind)
    }
}

/// Index of the `)` closing the group opened at `open`
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_open() {
            depth += 1;
        } else if token.kind == TokenKind::Close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the opener matching the `)` at `close`
pub fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        let token = &tokens[i];
        if token.kind == TokenKind::Close {
            depth += 1;
        } else if token.is_open() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Whether a quantifier can follow `pattern` directly
///
/// True for a single character, escape, class, backreference, recursion marker, or a
/// single non-lookaround group spanning the whole pattern.
pub fn is_single_atom(pattern: &str) -> bool {
    let Ok(tokens) = tokenize(pattern) else {
        return false;
    };
    match tokens.as_slice() {
        [token] => matches!(
            token.kind,
            TokenKind::Atom
                | TokenKind::Backref(_)
                | TokenKind::Recursion { .. }
                | TokenKind::GroupRecursion { .. }
        ),
        [first, ..] => {
            first.is_open()
                && first.kind != TokenKind::LookAroundOpen
                && matching_close(&tokens, 0) == Some(tokens.len() - 1)
        }
        [] => false,
    }
}

/// Names of the capture groups in a pattern, in capture order
pub fn capture_names(pattern: &str) -> Result<Vec<Option<String>>> {
    Ok(tokenize(pattern)?
        .into_iter()
        .filter_map(|token| match token.kind {
            TokenKind::CaptureOpen { name } => Some(name),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(pattern: &str) -> Vec<TokenKind> {
        tokenize(pattern)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_groups() {
        assert_eq!(
            kinds("(?<n>a)(?:b)(?>c)(?<=d)"),
            vec![
                TokenKind::CaptureOpen {
                    name: Some("n".to_string())
                },
                TokenKind::Atom,
                TokenKind::Close,
                TokenKind::GroupOpen,
                TokenKind::Atom,
                TokenKind::Close,
                TokenKind::AtomicOpen,
                TokenKind::Atom,
                TokenKind::Close,
                TokenKind::LookAroundOpen,
                TokenKind::Atom,
                TokenKind::Close,
            ]
        );
    }

    #[test]
    fn test_tokenize_quantifiers() {
        assert_eq!(
            kinds("a*+b{2,3}c??"),
            vec![
                TokenKind::Atom,
                TokenKind::Quantifier { possessive: true },
                TokenKind::Atom,
                TokenKind::Quantifier { possessive: false },
                TokenKind::Atom,
                TokenKind::Quantifier { possessive: false },
            ]
        );
    }

    #[test]
    fn test_tokenize_classes_keep_text() {
        let tokens = tokenize(r"[a\]b[c]]x").unwrap();
        assert_eq!(tokens[0].text, r"[a\]b[c]]");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_tokenize_markers() {
        assert_eq!(
            kinds(r"(?R=20)\g<1&R=5>\12"),
            vec![
                TokenKind::Recursion { depth: 20 },
                TokenKind::GroupRecursion {
                    target: GroupRef::Number(1),
                    depth: 5
                },
                TokenKind::Backref(12),
            ]
        );
    }

    #[test]
    fn test_tokenize_escapes() {
        let tokens = tokenize(r"\p{L}\u{1F600}\x41\n").unwrap();
        assert_eq!(tokens.len(), 4);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Atom));
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize("[abc").is_err());
        assert!(tokenize("\\").is_err());
        assert!(tokenize("(?R=2").is_err());
    }

    #[test]
    fn test_matching_parens() {
        let tokens = tokenize("(a(b))c").unwrap();
        assert_eq!(matching_close(&tokens, 0), Some(5));
        assert_eq!(matching_close(&tokens, 2), Some(4));
        assert_eq!(matching_open(&tokens, 5), Some(0));
    }

    #[test]
    fn test_is_single_atom() {
        assert!(is_single_atom("a"));
        assert!(is_single_atom(r"\p{L}"));
        assert!(is_single_atom("[a-z]"));
        assert!(is_single_atom("(?:ab|c)"));
        assert!(is_single_atom(r"\3"));
        assert!(!is_single_atom("ab"));
        assert!(!is_single_atom("(a)(b)"));
        assert!(!is_single_atom("(?!)"));
        assert!(!is_single_atom("a*"));
        assert!(!is_single_atom(""));
    }

    #[test]
    fn test_capture_names() {
        assert_eq!(
            capture_names("(?<a>x)(y)(?:z)").unwrap(),
            vec![Some("a".to_string()), None]
        );
    }
}
