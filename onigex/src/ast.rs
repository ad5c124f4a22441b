//! Abstract Syntax Tree (AST) for Oniguruma patterns
//!
//! This module defines the source AST produced by the parser. It mirrors Oniguruma
//! syntax closely; Oniguruma-specific behavior is normalized later by the transformer.
//! Supports:
//! - Literals, dot, character sets and classes (nested, intersections)
//! - Quantifiers (greedy, lazy, possessive)
//! - Groups (capturing, named, non-capturing, atomic, lookaround, flag scopes)
//! - Alternation, assertions, backreferences, subroutine calls

use std::fmt;

/// A node in the source AST
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Empty expression (matches empty string)
    Empty,

    /// A literal character
    Literal(char),

    /// Any character except newline, unless dot-all (`.`)
    Dot,

    /// Concatenation
    Sequence(Vec<Node>),

    /// Alternation (e.g., a|b|c)
    Alternation(Vec<Node>),

    /// A character set escape (`\d`, `\p{L}`, ...)
    Set(CharSet),

    /// A bracketed character class
    Class(CharClass),

    /// Any group construct
    Group {
        /// What kind of group
        kind: GroupKind,
        /// The pattern inside the group
        body: Box<Node>,
    },

    /// Quantified expression
    Quantified {
        /// The expression being quantified
        body: Box<Node>,
        /// Minimum repetitions
        min: u32,
        /// Maximum repetitions; `None` is unbounded
        max: Option<u32>,
        /// Greedy, lazy or possessive
        kind: QuantifierKind,
    },

    /// Zero-width assertion
    Assertion(Assertion),

    /// Backreference; `targets` is filled in once all groups are known
    Backreference {
        /// The reference as written
        reference: Reference,
        /// Resolved group numbers (empty for an orphan)
        targets: Vec<u32>,
    },

    /// Subroutine call; `target` 0 is the whole pattern
    Subroutine {
        /// The reference as written
        reference: Reference,
        /// Resolved group number
        target: u32,
    },

    /// `\K`: keep the text matched so far out of the match
    Keep,

    /// `\R`: any linebreak sequence
    LineBreak,

    /// `\X`: extended grapheme cluster
    Grapheme,

    /// `(?~...)` absent function
    Absent(Box<Node>),
}

/// A group reference as written in the pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// `\1`, `\k<1>`, `\g<1>`
    Number(u32),
    /// `\k<-1>`, `\g<-1>`, already resolved against groups opened so far
    Relative(i32),
    /// `\k<name>`, `\g<name>`
    Name(String),
}

/// Character set escapes
#[derive(Debug, Clone, PartialEq)]
pub enum CharSet {
    /// `\d` / `\D`
    Digit { negated: bool },
    /// `\w` / `\W`
    Word { negated: bool },
    /// `\s` / `\S`
    Space { negated: bool },
    /// `\h` / `\H` (hex digit)
    Hex { negated: bool },
    /// `\p{..}` / `\P{..}` / `\p{^..}`
    Property { name: String, negated: bool },
    /// `[:alpha:]` inside a class
    Posix { name: String, negated: bool },
    /// `\N`: any character except newline
    NotNewline,
    /// `\O`: any character
    Any,
}

/// A bracketed character class `[...]`
#[derive(Debug, Clone, PartialEq)]
pub struct CharClass {
    /// Whether the class is negated [^...]
    pub negated: bool,
    /// Union of items; a class with intersections holds one `Intersection` item
    pub items: Vec<ClassItem>,
}

/// An item in a character class
#[derive(Debug, Clone, PartialEq)]
pub enum ClassItem {
    /// A single character
    Char(char),
    /// A character range (e.g., a-z)
    Range(char, char),
    /// A set escape or POSIX class
    Set(CharSet),
    /// A nested class `[a[bc]]`
    Nested(CharClass),
    /// `a&&b&&c`, each operand a class body
    Intersection(Vec<CharClass>),
}

/// Kinds of groups
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    /// Capturing group; `number` is assigned after the whole pattern is read
    Capture {
        /// 1-based capture number (0 until numbered)
        number: u32,
        /// Group name, if named
        name: Option<String>,
    },
    /// `(?:...)`
    NonCapturing,
    /// `(?>...)`
    Atomic,
    /// `(?=...)`, `(?!...)`, `(?<=...)`, `(?<!...)`
    LookAround {
        /// Lookbehind instead of lookahead
        behind: bool,
        /// Negative assertion
        negated: bool,
    },
    /// `(?imx-imx:...)` or a directive applied to the rest of the enclosing group
    Flags(FlagChange),
}

/// Flags switched on and off by a flag group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagChange {
    /// Flags turned on
    pub enable: FlagSet,
    /// Flags turned off
    pub disable: FlagSet,
}

/// The inline-modifiable Oniguruma flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagSet {
    /// `i`
    pub ignore_case: bool,
    /// `m` (dot-all in Oniguruma)
    pub dot_all: bool,
    /// `x`
    pub extended: bool,
}

/// Quantifier flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Greedy,
    Lazy,
    Possessive,
}

/// Zero-width assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    /// `^`
    LineStart,
    /// `$`
    LineEnd,
    /// `\A`
    StringStart,
    /// `\z`
    StringEnd,
    /// `\Z`
    StringEndNewline,
    /// `\G`
    SearchStart,
    /// `\b`
    WordBoundary,
    /// `\B`
    NonWordBoundary,
}

impl Node {
    /// Create a sequence, collapsing trivial cases
    pub fn sequence(mut nodes: Vec<Node>) -> Self {
        match nodes.len() {
            0 => Node::Empty,
            1 => nodes.remove(0),
            _ => Node::Sequence(nodes),
        }
    }

    /// Create an alternation, collapsing trivial cases
    pub fn alternation(mut nodes: Vec<Node>) -> Self {
        match nodes.len() {
            0 => Node::Empty,
            1 => nodes.remove(0),
            _ => Node::Alternation(nodes),
        }
    }

    /// Create a group
    pub fn group(kind: GroupKind, body: Node) -> Self {
        Node::Group {
            kind,
            body: Box::new(body),
        }
    }

    /// Create a quantified expression
    pub fn quantified(body: Node, min: u32, max: Option<u32>, kind: QuantifierKind) -> Self {
        Node::Quantified {
            body: Box::new(body),
            min,
            max,
            kind,
        }
    }

    /// Direct children, in pattern order
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Sequence(nodes) | Node::Alternation(nodes) => nodes.iter().collect(),
            Node::Group { body, .. } | Node::Quantified { body, .. } | Node::Absent(body) => {
                vec![body.as_ref()]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for FlagChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = |set: &FlagSet| {
            let mut s = String::new();
            if set.ignore_case {
                s.push('i');
            }
            if set.dot_all {
                s.push('m');
            }
            if set.extended {
                s.push('x');
            }
            s
        };
        let on = letters(&self.enable);
        let off = letters(&self.disable);
        if off.is_empty() {
            write!(f, "{}", on)
        } else {
            write!(f, "{}-{}", on, off)
        }
    }
}
