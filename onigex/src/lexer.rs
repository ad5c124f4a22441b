//! Lexer for tokenizing Oniguruma patterns
//!
//! Oniguruma syntax is context-sensitive: the meaning of a character depends on
//! whether it is inside a character class and on the free-spacing flag in effect.
//! The lexer therefore exposes two entry points, [`Lexer::next_token`] and
//! [`Lexer::next_class_token`], and the parser picks one based on its own state.

use std::fmt;

use crate::ast::{Assertion, CharSet, FlagChange, QuantifierKind, Reference};
use crate::error::{OnigexError, Result};

/// A token outside character classes
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `|`
    Pipe,
    /// `)`
    RightParen,
    /// `[` or `[^`
    ClassStart { negated: bool },
    /// `.`
    Dot,
    /// Start of any group construct
    GroupOpen(GroupOpen),
    /// `(?imx-imx)`, applying to the rest of the enclosing group
    FlagDirective(FlagChange),
    /// `*`, `+`, `?`, `{n,m}` with an optional lazy/possessive suffix
    Quantifier {
        min: u32,
        max: Option<u32>,
        kind: QuantifierKind,
    },
    /// A literal character (including escaped ones)
    Literal(char),
    /// A character set escape
    Set(CharSet),
    /// An assertion (`^`, `\b`, ...)
    Assertion(Assertion),
    /// A backreference
    Backref(Reference),
    /// A subroutine call
    Subroutine(Reference),
    /// `\K`
    Keep,
    /// `\R`
    LineBreak,
    /// `\X`
    Grapheme,
    /// End of input
    Eof,
}

/// Group openers
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOpen {
    /// `(`
    Capture,
    /// `(?<name>` or `(?'name'`
    Named(String),
    /// `(?:`
    NonCapturing,
    /// `(?>`
    Atomic,
    /// `(?=`, `(?!`, `(?<=`, `(?<!`
    LookAround { behind: bool, negated: bool },
    /// `(?imx-imx:`
    Flags(FlagChange),
    /// `(?~`
    Absent,
}

/// A token inside a character class
#[derive(Debug, Clone, PartialEq)]
pub enum ClassToken {
    /// `]`
    End,
    /// Nested `[` or `[^`
    Nested { negated: bool },
    /// `&&`
    Intersection,
    /// `-`
    Hyphen,
    /// A literal character
    Literal(char),
    /// A set escape or POSIX bracket
    Set(CharSet),
    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pipe => write!(f, "`|`"),
            Token::RightParen => write!(f, "`)`"),
            Token::ClassStart { .. } => write!(f, "`[`"),
            Token::Dot => write!(f, "`.`"),
            Token::GroupOpen(_) => write!(f, "group"),
            Token::FlagDirective(change) => write!(f, "flag directive `(?{})`", change),
            Token::Quantifier { .. } => write!(f, "quantifier"),
            Token::Literal(c) => write!(f, "literal `{}`", c),
            Token::Set(_) => write!(f, "character set"),
            Token::Assertion(_) => write!(f, "assertion"),
            Token::Backref(_) => write!(f, "backreference"),
            Token::Subroutine(_) => write!(f, "subroutine"),
            Token::Keep => write!(f, "`\\K`"),
            Token::LineBreak => write!(f, "`\\R`"),
            Token::Grapheme => write!(f, "`\\X`"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer for tokenizing Oniguruma patterns
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input string
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    /// Current character offset
    pub fn position(&self) -> usize {
        self.position
    }

    /// Peek at the current character without consuming it
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Skip whitespace and `#` comments (free-spacing mode)
    fn skip_extended(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.position += 1;
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Get the next token outside a character class
    pub fn next_token(&mut self, extended: bool) -> Result<Token> {
        loop {
            if extended {
                self.skip_extended();
            }
            if self.starts_with("(?#") {
                self.skip_comment()?;
                continue;
            }
            break;
        }

        let Some(c) = self.bump() else {
            return Ok(Token::Eof);
        };
        match c {
            '|' => Ok(Token::Pipe),
            ')' => Ok(Token::RightParen),
            '.' => Ok(Token::Dot),
            '^' => Ok(Token::Assertion(Assertion::LineStart)),
            '$' => Ok(Token::Assertion(Assertion::LineEnd)),
            '[' => Ok(Token::ClassStart {
                negated: self.eat('^'),
            }),
            '(' => self.read_group_open(),
            '*' => Ok(self.read_quantifier_suffix(0, None)),
            '+' => Ok(self.read_quantifier_suffix(1, None)),
            '?' => Ok(self.read_quantifier_suffix(0, Some(1))),
            '{' => Ok(self.read_interval().unwrap_or(Token::Literal('{'))),
            '\\' => self.read_escape(),
            _ => Ok(Token::Literal(c)),
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start = self.position;
        self.position += 3;
        while let Some(c) = self.bump() {
            if c == '\\' {
                self.bump();
            } else if c == ')' {
                return Ok(());
            }
        }
        Err(OnigexError::syntax("unclosed comment group", start))
    }

    /// Lazy `?` or possessive `+` after `*`, `+`, `?`
    fn read_quantifier_suffix(&mut self, min: u32, max: Option<u32>) -> Token {
        let kind = if self.eat('?') {
            QuantifierKind::Lazy
        } else if self.eat('+') {
            QuantifierKind::Possessive
        } else {
            QuantifierKind::Greedy
        };
        Token::Quantifier { min, max, kind }
    }

    /// `{n}`, `{n,}`, `{,m}`, `{n,m}`; `None` (without consuming) if not an interval
    fn read_interval(&mut self) -> Option<Token> {
        let start = self.position;
        let min = self.read_digits();
        let (min, max) = if self.eat(',') {
            let max = self.read_digits();
            if min.is_none() && max.is_none() {
                self.position = start;
                return None;
            }
            (min.unwrap_or(0), max)
        } else {
            match min {
                Some(n) => (n, Some(n)),
                None => {
                    self.position = start;
                    return None;
                }
            }
        };
        if !self.eat('}') || max.is_some_and(|max| max < min) {
            self.position = start;
            return None;
        }
        // `{n}?` and `{n,m}+` chain into a separate quantifier in Oniguruma
        let exact = max == Some(min);
        let kind = if !exact && self.eat('?') {
            QuantifierKind::Lazy
        } else {
            QuantifierKind::Greedy
        };
        Some(Token::Quantifier { min, max, kind })
    }

    fn read_digits(&mut self) -> Option<u32> {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
        }
        if start == self.position {
            return None;
        }
        let text: String = self.chars[start..self.position].iter().collect();
        text.parse().ok()
    }

    fn read_group_open(&mut self) -> Result<Token> {
        let start = self.position - 1;
        if !self.eat('?') {
            return Ok(Token::GroupOpen(GroupOpen::Capture));
        }
        match self.bump() {
            Some(':') => Ok(Token::GroupOpen(GroupOpen::NonCapturing)),
            Some('>') => Ok(Token::GroupOpen(GroupOpen::Atomic)),
            Some('=') => Ok(Token::GroupOpen(GroupOpen::LookAround {
                behind: false,
                negated: false,
            })),
            Some('!') => Ok(Token::GroupOpen(GroupOpen::LookAround {
                behind: false,
                negated: true,
            })),
            Some('~') => Ok(Token::GroupOpen(GroupOpen::Absent)),
            Some('<') => match self.peek() {
                Some('=') => {
                    self.position += 1;
                    Ok(Token::GroupOpen(GroupOpen::LookAround {
                        behind: true,
                        negated: false,
                    }))
                }
                Some('!') => {
                    self.position += 1;
                    Ok(Token::GroupOpen(GroupOpen::LookAround {
                        behind: true,
                        negated: true,
                    }))
                }
                _ => Ok(Token::GroupOpen(GroupOpen::Named(self.read_group_name('>')?))),
            },
            Some('\'') => Ok(Token::GroupOpen(GroupOpen::Named(self.read_group_name('\'')?))),
            Some('(') => Err(OnigexError::unsupported("conditional groups")),
            Some(c) if matches!(c, 'i' | 'm' | 'x' | '-') => {
                self.position -= 1;
                self.read_flag_group(start)
            }
            _ => Err(OnigexError::syntax("invalid group syntax", start)),
        }
    }

    /// Read a group name up to `close`
    fn read_group_name(&mut self, close: char) -> Result<String> {
        let start = self.position;
        let mut name = String::new();
        loop {
            match self.bump() {
                Some(c) if c == close => break,
                Some(c) if c.is_alphanumeric() || c == '_' => name.push(c),
                _ => return Err(OnigexError::syntax("invalid group name", start)),
            }
        }
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(OnigexError::syntax(
                format!("invalid group name '{}'", name),
                start,
            ));
        }
        Ok(name)
    }

    fn read_flag_group(&mut self, start: usize) -> Result<Token> {
        let mut change = FlagChange::default();
        let mut disabling = false;
        loop {
            let Some(c) = self.bump() else {
                return Err(OnigexError::syntax("unclosed flag group", start));
            };
            let set = if disabling {
                &mut change.disable
            } else {
                &mut change.enable
            };
            match c {
                'i' => set.ignore_case = true,
                'm' => set.dot_all = true,
                'x' => set.extended = true,
                '-' if !disabling => disabling = true,
                ')' => return Ok(Token::FlagDirective(change)),
                ':' => return Ok(Token::GroupOpen(GroupOpen::Flags(change))),
                _ => {
                    return Err(OnigexError::syntax(
                        format!("invalid flag '{}'", c),
                        self.position - 1,
                    ));
                }
            }
        }
    }

    /// Read an escape outside a class (backslash not yet consumed by caller)
    fn read_escape(&mut self) -> Result<Token> {
        let start = self.position - 1;
        let Some(c) = self.bump() else {
            return Err(OnigexError::syntax("trailing backslash", start));
        };
        let token = match c {
            'b' => Token::Assertion(Assertion::WordBoundary),
            'B' => Token::Assertion(Assertion::NonWordBoundary),
            'A' => Token::Assertion(Assertion::StringStart),
            'z' => Token::Assertion(Assertion::StringEnd),
            'Z' => Token::Assertion(Assertion::StringEndNewline),
            'G' => Token::Assertion(Assertion::SearchStart),
            'K' => Token::Keep,
            'R' => Token::LineBreak,
            'X' => Token::Grapheme,
            'k' => Token::Backref(self.read_reference(start, "backreference")?),
            'g' => Token::Subroutine(self.read_reference(start, "subroutine")?),
            '1'..='9' => {
                self.position -= 1;
                let n = self.read_digits().unwrap_or(0);
                Token::Backref(Reference::Number(n))
            }
            _ => {
                self.position -= 1;
                match self.read_common_escape(start)? {
                    Escaped::Char(c) => Token::Literal(c),
                    Escaped::Set(set) => Token::Set(set),
                }
            }
        };
        Ok(token)
    }

    /// `<name>`, `'name'`, `<1>`, `<-1>` after `\k` or `\g`
    fn read_reference(&mut self, start: usize, what: &str) -> Result<Reference> {
        let close = match self.bump() {
            Some('<') => '>',
            Some('\'') => '\'',
            _ => return Err(OnigexError::syntax(format!("invalid {}", what), start)),
        };
        let mut content = String::new();
        loop {
            match self.bump() {
                Some(c) if c == close => break,
                Some(c) => content.push(c),
                None => {
                    return Err(OnigexError::syntax(format!("unclosed {}", what), start));
                }
            }
        }
        if content.contains(['+', '-']) && !content.starts_with(['+', '-']) {
            return Err(OnigexError::unsupported(format!(
                "{} with recursion level",
                what
            )));
        }
        if let Ok(n) = content.parse::<i32>() {
            if content.starts_with('-') {
                return Ok(Reference::Relative(n));
            }
            if content.starts_with('+') {
                return Err(OnigexError::unsupported(format!("forward relative {}", what)));
            }
            return u32::try_from(n)
                .map(Reference::Number)
                .map_err(|_| OnigexError::syntax(format!("invalid {}", what), start));
        }
        if content.is_empty() || !content.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(OnigexError::syntax(
                format!("invalid {} name '{}'", what, content),
                start,
            ));
        }
        Ok(Reference::Name(content))
    }

    /// Escapes shared by both contexts: control chars, code points, set escapes
    fn read_common_escape(&mut self, start: usize) -> Result<Escaped> {
        let Some(c) = self.bump() else {
            return Err(OnigexError::syntax("trailing backslash", start));
        };
        let escaped = match c {
            't' => Escaped::Char('\t'),
            'n' => Escaped::Char('\n'),
            'r' => Escaped::Char('\r'),
            'f' => Escaped::Char('\x0C'),
            'v' => Escaped::Char('\x0B'),
            'a' => Escaped::Char('\x07'),
            'e' => Escaped::Char('\x1B'),
            'd' => Escaped::Set(CharSet::Digit { negated: false }),
            'D' => Escaped::Set(CharSet::Digit { negated: true }),
            'w' => Escaped::Set(CharSet::Word { negated: false }),
            'W' => Escaped::Set(CharSet::Word { negated: true }),
            's' => Escaped::Set(CharSet::Space { negated: false }),
            'S' => Escaped::Set(CharSet::Space { negated: true }),
            'h' => Escaped::Set(CharSet::Hex { negated: false }),
            'H' => Escaped::Set(CharSet::Hex { negated: true }),
            'N' => Escaped::Set(CharSet::NotNewline),
            'O' => Escaped::Set(CharSet::Any),
            'p' | 'P' => Escaped::Set(self.read_property(start, c == 'P')?),
            'x' => Escaped::Char(self.read_hex_escape(start)?),
            'u' => Escaped::Char(self.read_fixed_hex(start, 4)?),
            'o' if self.peek() == Some('{') => Escaped::Char(self.read_braced(start, 8)?),
            '0' => {
                let mut value = 0;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.position += 1;
                        }
                        None => break,
                    }
                }
                Escaped::Char(char::from_u32(value).unwrap_or('\0'))
            }
            'c' => {
                let Some(letter) = self.bump() else {
                    return Err(OnigexError::syntax("incomplete control escape", start));
                };
                Escaped::Char(
                    char::from_u32(u32::from(letter) % 32)
                        .ok_or_else(|| OnigexError::syntax("invalid control escape", start))?,
                )
            }
            _ => Escaped::Char(c),
        };
        Ok(escaped)
    }

    fn read_property(&mut self, start: usize, upper: bool) -> Result<CharSet> {
        if !self.eat('{') {
            return Err(OnigexError::syntax("invalid property escape", start));
        }
        let negated = upper ^ self.eat('^');
        let mut name = String::new();
        loop {
            match self.bump() {
                Some('}') => break,
                Some(c) => name.push(c),
                None => return Err(OnigexError::syntax("unclosed property escape", start)),
            }
        }
        if name.is_empty() {
            return Err(OnigexError::syntax("empty property name", start));
        }
        Ok(CharSet::Property { name, negated })
    }

    fn read_hex_escape(&mut self, start: usize) -> Result<char> {
        if self.peek() == Some('{') {
            return self.read_braced(start, 16);
        }
        let mut value = 0;
        let mut digits = 0;
        while digits < 2 {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    value = value * 16 + d;
                    self.position += 1;
                    digits += 1;
                }
                None => break,
            }
        }
        char::from_u32(value).ok_or_else(|| OnigexError::syntax("invalid hex escape", start))
    }

    fn read_fixed_hex(&mut self, start: usize, count: usize) -> Result<char> {
        let mut value = 0;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| OnigexError::syntax("invalid unicode escape", start))?;
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or_else(|| OnigexError::syntax("invalid code point", start))
    }

    fn read_braced(&mut self, start: usize, radix: u32) -> Result<char> {
        self.position += 1;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('}') => break,
                Some(c) if c.is_digit(radix) => text.push(c),
                _ => return Err(OnigexError::syntax("invalid code point escape", start)),
            }
        }
        u32::from_str_radix(&text, radix)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| OnigexError::syntax("invalid code point", start))
    }

    /// Get the next token inside a character class
    pub fn next_class_token(&mut self) -> Result<ClassToken> {
        let Some(c) = self.bump() else {
            return Ok(ClassToken::Eof);
        };
        match c {
            ']' => Ok(ClassToken::End),
            '&' if self.eat('&') => Ok(ClassToken::Intersection),
            '-' => Ok(ClassToken::Hyphen),
            '[' => {
                if self.peek() == Some(':') {
                    if let Some(set) = self.read_posix() {
                        return Ok(ClassToken::Set(set));
                    }
                }
                Ok(ClassToken::Nested {
                    negated: self.eat('^'),
                })
            }
            '\\' => {
                let start = self.position - 1;
                match self.peek() {
                    Some('b') => {
                        self.position += 1;
                        Ok(ClassToken::Literal('\x08'))
                    }
                    Some(d @ '1'..='7') => {
                        self.position += 1;
                        let mut value = d.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match self.peek().and_then(|c| c.to_digit(8)) {
                                Some(d) => {
                                    value = value * 8 + d;
                                    self.position += 1;
                                }
                                None => break,
                            }
                        }
                        Ok(ClassToken::Literal(char::from_u32(value).unwrap_or('\0')))
                    }
                    _ => match self.read_common_escape(start)? {
                        Escaped::Char(c) => Ok(ClassToken::Literal(c)),
                        Escaped::Set(set) => Ok(ClassToken::Set(set)),
                    },
                }
            }
            _ => Ok(ClassToken::Literal(c)),
        }
    }

    /// `[:name:]` or `[:^name:]` with the leading `[` consumed; restores on mismatch
    fn read_posix(&mut self) -> Option<CharSet> {
        let start = self.position;
        self.position += 1;
        let negated = self.eat('^');
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                name.push(c);
                self.position += 1;
            } else {
                break;
            }
        }
        if !name.is_empty() && self.eat(':') && self.eat(']') {
            return Some(CharSet::Posix { name, negated });
        }
        self.position = start;
        None
    }

    /// Collect all tokens outside classes
    #[cfg(test)]
    fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(false)?;
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

enum Escaped {
    Char(char),
    Set(CharSet),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!(
            tokens("a*+"),
            vec![
                Token::Literal('a'),
                Token::Quantifier {
                    min: 0,
                    max: None,
                    kind: QuantifierKind::Possessive
                }
            ]
        );
        assert_eq!(
            tokens("a{2,3}?")[1],
            Token::Quantifier {
                min: 2,
                max: Some(3),
                kind: QuantifierKind::Lazy
            }
        );
    }

    #[test]
    fn test_interval_plus_is_not_possessive() {
        let t = tokens("a{2,3}+");
        assert_eq!(t.len(), 3);
        assert_eq!(
            t[2],
            Token::Quantifier {
                min: 1,
                max: None,
                kind: QuantifierKind::Greedy
            }
        );
    }

    #[test]
    fn test_invalid_interval_is_literal() {
        assert_eq!(tokens("{a}")[0], Token::Literal('{'));
        assert_eq!(tokens("a{,}")[1], Token::Literal('{'));
    }

    #[test]
    fn test_group_openers() {
        assert_eq!(
            tokens("(?<year>")[0],
            Token::GroupOpen(GroupOpen::Named("year".to_string()))
        );
        assert_eq!(tokens("(?>")[0], Token::GroupOpen(GroupOpen::Atomic));
        assert!(matches!(tokens("(?i)")[0], Token::FlagDirective(_)));
        assert!(matches!(
            tokens("(?i-x:")[0],
            Token::GroupOpen(GroupOpen::Flags(_))
        ));
    }

    #[test]
    fn test_comment_group_skipped() {
        assert_eq!(tokens("a(?#note)b"), vec![Token::Literal('a'), Token::Literal('b')]);
    }

    #[test]
    fn test_extended_mode_skips_whitespace() {
        let mut lexer = Lexer::new("  a # comment\n b");
        assert_eq!(lexer.next_token(true).unwrap(), Token::Literal('a'));
        assert_eq!(lexer.next_token(true).unwrap(), Token::Literal('b'));
        assert_eq!(lexer.next_token(true).unwrap(), Token::Eof);
    }

    #[test]
    fn test_references() {
        assert_eq!(tokens(r"\k<n>")[0], Token::Backref(Reference::Name("n".to_string())));
        assert_eq!(tokens(r"\g<-1>")[0], Token::Subroutine(Reference::Relative(-1)));
        assert_eq!(tokens(r"\g'0'")[0], Token::Subroutine(Reference::Number(0)));
        assert_eq!(tokens(r"\12")[0], Token::Backref(Reference::Number(12)));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(tokens(r"\x41")[0], Token::Literal('A'));
        assert_eq!(tokens(r"\x{1F600}")[0], Token::Literal('\u{1F600}'));
        assert_eq!(tokens(r"é")[0], Token::Literal('é'));
        assert_eq!(tokens(r"\012")[0], Token::Literal('\n'));
        assert_eq!(
            tokens(r"\P{^Greek}")[0],
            Token::Set(CharSet::Property {
                name: "Greek".to_string(),
                negated: false
            })
        );
    }

    #[test]
    fn test_trailing_backslash_is_error() {
        assert!(Lexer::new("a\\").tokenize().is_err());
    }

    #[test]
    fn test_class_tokens() {
        let mut lexer = Lexer::new("[:alpha:]&&\\b]");
        assert_eq!(
            lexer.next_class_token().unwrap(),
            ClassToken::Set(CharSet::Posix {
                name: "alpha".to_string(),
                negated: false
            })
        );
        assert_eq!(lexer.next_class_token().unwrap(), ClassToken::Intersection);
        assert_eq!(lexer.next_class_token().unwrap(), ClassToken::Literal('\x08'));
        assert_eq!(lexer.next_class_token().unwrap(), ClassToken::End);
    }
}
