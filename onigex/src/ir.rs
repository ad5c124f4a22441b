//! Intermediate AST
//!
//! A tree in the host grammar extended with atomic groups, possessive quantifiers and
//! bounded recursion. Oniguruma semantics are already resolved: every case-relevant
//! leaf carries its own `ignore_case` state, dots carry their `dot_all` state, and
//! captures cloned from a subroutine call are marked `hidden` with their `origin`.

use std::fmt;

pub use crate::ast::QuantifierKind;

/// Whole-pattern match procedure applied by the emulation wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    /// Every match must start where the search started (leading `\G`)
    SearchStart,
    /// No match may start where the search started (leading `(?!\G)`)
    NotSearchStart,
    /// Matches start at a line start or where the search started (leading `(?:^|\G)`)
    LineOrSearchStart,
    /// Matches start at the string start or where the search started (leading
    /// `(?:^|\G)` when `^` only matches at the string start)
    StringOrSearchStart,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::SearchStart => "search_start",
            Strategy::NotSearchStart => "not_search_start",
            Strategy::LineOrSearchStart => "line_or_search_start",
            Strategy::StringOrSearchStart => "string_or_search_start",
        };
        write!(f, "{}", name)
    }
}

/// A transformed pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Root node
    pub root: Node,
    /// Set when the whole pattern needs an alternate match procedure
    pub strategy: Option<Strategy>,
}

/// A node in the intermediate AST
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Matches the empty string
    Empty,

    /// A literal character
    Literal { value: char, ignore_case: bool },

    /// `.`; without `dot_all` it excludes only `\n`
    Dot { dot_all: bool },

    /// A single-character class
    Class(Class),

    /// Concatenation
    Sequence(Vec<Node>),

    /// Alternation
    Alternation(Vec<Node>),

    /// Capturing group
    Capture {
        /// Source group number
        number: u32,
        /// Group name
        name: Option<String>,
        /// Excluded from user-visible results
        hidden: bool,
        /// Source group this capture was cloned from
        origin: Option<u32>,
        body: Box<Node>,
    },

    /// Non-capturing group
    Group(Box<Node>),

    /// Atomic group, emulated during postprocessing
    Atomic(Box<Node>),

    /// Lookahead or lookbehind
    LookAround {
        behind: bool,
        negated: bool,
        body: Box<Node>,
    },

    /// Quantified expression; `Possessive` is emulated during postprocessing
    Quantified {
        body: Box<Node>,
        min: u32,
        max: Option<u32>,
        kind: QuantifierKind,
    },

    /// Zero-width assertion with a native equivalent
    Assertion(Assertion),

    /// Backreference to source groups; never matches when `targets` is empty
    Backreference { targets: Vec<u32>, ignore_case: bool },

    /// Bounded recursion into the whole pattern (`target` 0) or an enclosing group
    Recursion { target: u32 },
}

/// Assertions emitted as native syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    /// `^` without flag `m`
    StringStart,
    /// `$` without flag `m`
    StringEnd,
    /// ASCII `\b` / `\B`
    WordBoundary { negated: bool },
}

/// A character class matching exactly one character
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub negated: bool,
    pub items: Vec<ClassItem>,
    pub ignore_case: bool,
}

/// Members of a class
#[derive(Debug, Clone, PartialEq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
    /// `\p{..}` body, already normalized
    Property { name: String, negated: bool },
    /// Native `\d`, `\w`, `\s`
    Builtin { kind: Builtin, negated: bool },
    Nested(Class),
    Intersection(Vec<Class>),
}

/// Native ASCII-ish shorthand classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Digit,
    Word,
    Space,
}

impl Node {
    /// Create a sequence, collapsing trivial cases
    pub fn sequence(mut nodes: Vec<Node>) -> Self {
        nodes.retain(|n| *n != Node::Empty);
        match nodes.len() {
            0 => Node::Empty,
            1 => nodes.remove(0),
            _ => Node::Sequence(nodes),
        }
    }

    /// Create an alternation, collapsing a single branch
    pub fn alternation(mut nodes: Vec<Node>) -> Self {
        match nodes.len() {
            0 => Node::Empty,
            1 => nodes.remove(0),
            _ => Node::Alternation(nodes),
        }
    }

    pub fn literal(value: char) -> Self {
        Node::Literal {
            value,
            ignore_case: false,
        }
    }

    pub fn lookahead(negated: bool, body: Node) -> Self {
        Node::LookAround {
            behind: false,
            negated,
            body: Box::new(body),
        }
    }

    pub fn lookbehind(negated: bool, body: Node) -> Self {
        Node::LookAround {
            behind: true,
            negated,
            body: Box::new(body),
        }
    }

    /// Direct children, in pattern order
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Sequence(nodes) | Node::Alternation(nodes) => nodes.iter().collect(),
            Node::Capture { body, .. }
            | Node::Group(body)
            | Node::Atomic(body)
            | Node::LookAround { body, .. }
            | Node::Quantified { body, .. } => vec![body.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Pre-order walk over this node and every descendant
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Whether any node in the tree satisfies `predicate`
    pub fn any(&self, predicate: &impl Fn(&Node) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|c| c.any(predicate))
    }
}

impl Class {
    /// A case-sensitive, non-negated class
    pub fn of(items: Vec<ClassItem>) -> Self {
        Class {
            negated: false,
            items,
            ignore_case: false,
        }
    }

    /// Same class with the opposite polarity
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}
