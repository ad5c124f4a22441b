//! Parser for Oniguruma patterns
//!
//! This module provides a recursive descent parser that converts tokens into the
//! source AST, then numbers capture groups and resolves references following
//! Oniguruma's rules.
//!
//! Grammar (in order of precedence, lowest to highest):
//!   regex       := alternation
//!   alternation := sequence ( '|' sequence )*
//!   sequence    := ( quantified | flag_directive alternation )*
//!   quantified  := atom quantifier*
//!   atom        := literal | set | class | group | assertion | reference | '.'
//!   group       := '(' opener alternation ')'
//!   class       := '[' '^'? class_item+ ( '&&' class_item+ )* ']'

use crate::ast::{CharClass, ClassItem, GroupKind, Node, Reference};
use crate::error::{OnigexError, Result};
use crate::groups::GroupRegistry;
use crate::lexer::{ClassToken, GroupOpen, Lexer, Token};
use crate::options::PatternFlags;

static EOF: Token = Token::Eof;

/// Options consumed by the parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Top-level flags
    pub flags: PatternFlags,
    /// Unnamed groups capture even when named groups exist
    pub capture_group: bool,
    /// Backreferences to missing groups are allowed (and never match)
    pub allow_orphan_backrefs: bool,
}

/// A parsed pattern: the tree plus its capture layout
#[derive(Debug, Clone)]
pub struct SourceAst {
    /// Root node
    pub root: Node,
    /// Capture groups in declaration order
    pub groups: GroupRegistry,
    /// Top-level flags the pattern was parsed with
    pub flags: PatternFlags,
}

/// Parser for Oniguruma patterns
pub struct Parser {
    lexer: Lexer,
    current: Option<Token>,
    token_start: usize,
    extended: bool,
    options: ParseOptions,
    /// Source positions of references, in pattern order
    reference_positions: Vec<usize>,
}

impl Parser {
    /// Create a new parser for the given input string
    pub fn new(input: &str, options: ParseOptions) -> Self {
        Parser {
            lexer: Lexer::new(input),
            current: None,
            token_start: 0,
            extended: options.flags.extended,
            options,
            reference_positions: Vec::new(),
        }
    }

    /// The current token, lexed on demand with the free-spacing mode in effect
    fn current(&mut self) -> Result<&Token> {
        if self.current.is_none() {
            self.token_start = self.lexer.position();
            self.current = Some(self.lexer.next_token(self.extended)?);
        }
        Ok(self.current.as_ref().unwrap_or(&EOF))
    }

    /// Take the current token, advancing past it
    fn advance(&mut self) -> Result<Token> {
        self.current()?;
        Ok(self.current.take().unwrap_or(Token::Eof))
    }

    /// Parse the entire input and return the source AST
    pub fn parse(mut self) -> Result<SourceAst> {
        let mut root = self.parse_alternation()?;

        // Ensure we've consumed all tokens
        if let Token::RightParen = self.current()? {
            return Err(OnigexError::syntax("unmatched ')'", self.token_start));
        }

        let mut groups = GroupRegistry::new();
        let has_named = contains_named_group(&root);
        number_groups(&mut root, &mut groups, has_named && !self.options.capture_group);

        let mut resolver = Resolver {
            groups: &groups,
            options: self.options,
            numbered_forbidden: has_named && !self.options.capture_group,
            positions: &self.reference_positions,
            next_reference: 0,
            opened: 0,
        };
        resolver.resolve(&mut root)?;

        Ok(SourceAst {
            root,
            groups,
            flags: self.options.flags,
        })
    }

    /// alternation := sequence ( '|' sequence )*
    fn parse_alternation(&mut self) -> Result<Node> {
        let mut alternatives = vec![self.parse_sequence()?];
        while let Token::Pipe = self.current()? {
            self.advance()?;
            alternatives.push(self.parse_sequence()?);
        }
        Ok(Node::alternation(alternatives))
    }

    /// sequence := ( quantified | flag_directive alternation )*
    fn parse_sequence(&mut self) -> Result<Node> {
        let mut nodes = Vec::new();
        loop {
            match self.current()? {
                Token::Eof | Token::Pipe | Token::RightParen => break,
                Token::FlagDirective(change) => {
                    let change = *change;
                    self.advance()?;
                    self.apply_extended(&change);
                    // The directive covers the rest of the enclosing group, alternatives included
                    let rest = self.parse_alternation()?;
                    nodes.push(Node::group(GroupKind::Flags(change), rest));
                    break;
                }
                Token::Quantifier { .. } => {
                    return Err(OnigexError::syntax(
                        "target of repeat operator is not specified",
                        self.token_start,
                    ));
                }
                _ => nodes.push(self.parse_quantified()?),
            }
        }
        Ok(Node::sequence(nodes))
    }

    fn apply_extended(&mut self, change: &crate::ast::FlagChange) {
        if change.enable.extended {
            self.extended = true;
        }
        if change.disable.extended {
            self.extended = false;
        }
    }

    /// quantified := atom quantifier*
    fn parse_quantified(&mut self) -> Result<Node> {
        let mut node = self.parse_atom()?;
        while let Token::Quantifier { min, max, kind } = self.current()? {
            let (min, max, kind) = (*min, *max, *kind);
            if matches!(node, Node::Assertion(_) | Node::Keep) {
                return Err(OnigexError::syntax(
                    "target of repeat operator is invalid",
                    self.token_start,
                ));
            }
            self.advance()?;
            node = Node::quantified(node, min, max, kind);
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<Node> {
        let start = self.token_start;
        let node = match self.advance()? {
            Token::Literal(c) => Node::Literal(c),
            Token::Dot => Node::Dot,
            Token::Set(set) => Node::Set(set),
            Token::Assertion(assertion) => Node::Assertion(assertion),
            Token::Keep => Node::Keep,
            Token::LineBreak => Node::LineBreak,
            Token::Grapheme => Node::Grapheme,
            Token::Backref(reference) => {
                self.reference_positions.push(start);
                Node::Backreference {
                    reference,
                    targets: Vec::new(),
                }
            }
            Token::Subroutine(reference) => {
                self.reference_positions.push(start);
                Node::Subroutine {
                    reference,
                    target: 0,
                }
            }
            Token::ClassStart { negated } => Node::Class(self.parse_class(negated, start)?),
            Token::GroupOpen(open) => self.parse_group(open, start)?,
            other => {
                return Err(OnigexError::syntax(
                    format!("unexpected {}", other),
                    start,
                ));
            }
        };
        Ok(node)
    }

    /// group := opener alternation ')'
    fn parse_group(&mut self, open: GroupOpen, start: usize) -> Result<Node> {
        let saved_extended = self.extended;
        let absent = open == GroupOpen::Absent;
        let kind = match open {
            GroupOpen::Capture => GroupKind::Capture {
                number: 0,
                name: None,
            },
            GroupOpen::Named(name) => GroupKind::Capture {
                number: 0,
                name: Some(name),
            },
            GroupOpen::NonCapturing | GroupOpen::Absent => GroupKind::NonCapturing,
            GroupOpen::Atomic => GroupKind::Atomic,
            GroupOpen::LookAround { behind, negated } => GroupKind::LookAround { behind, negated },
            GroupOpen::Flags(change) => {
                self.apply_extended(&change);
                GroupKind::Flags(change)
            }
        };
        let body = self.parse_alternation()?;
        match self.advance()? {
            Token::RightParen => {}
            _ => return Err(OnigexError::syntax("unclosed group", start)),
        }
        self.extended = saved_extended;

        if absent {
            return Ok(Node::Absent(Box::new(body)));
        }
        Ok(Node::group(kind, body))
    }

    /// class := '[' '^'? class_item+ ( '&&' class_item+ )* ']'
    fn parse_class(&mut self, negated: bool, start: usize) -> Result<CharClass> {
        let mut operands: Vec<CharClass> = Vec::new();
        let mut items = Vec::new();
        let mut first = true;

        loop {
            let token = self.lexer.next_class_token()?;
            match token {
                ClassToken::End if first => items.push(ClassItem::Char(']')),
                ClassToken::End => break,
                ClassToken::Eof => {
                    return Err(OnigexError::syntax("unclosed character class", start));
                }
                ClassToken::Intersection => {
                    operands.push(CharClass {
                        negated: false,
                        items: std::mem::take(&mut items),
                    });
                }
                ClassToken::Nested { negated } => {
                    let nested_start = self.lexer.position() - 1;
                    items.push(ClassItem::Nested(self.parse_class(negated, nested_start)?));
                }
                ClassToken::Set(set) => items.push(ClassItem::Set(set)),
                ClassToken::Hyphen => items.push(ClassItem::Char('-')),
                ClassToken::Literal(c) => items.push(self.parse_class_literal(c)?),
            }
            first = false;
        }

        if !operands.is_empty() {
            operands.push(CharClass {
                negated: false,
                items,
            });
            items = vec![ClassItem::Intersection(operands)];
        }
        Ok(CharClass { negated, items })
    }

    /// A literal, or a range when followed by `-x`
    fn parse_class_literal(&mut self, c: char) -> Result<ClassItem> {
        let is_range = self.lexer.peek() == Some('-')
            && !matches!(self.lexer.peek_at(1), Some(']') | None);
        if !is_range {
            return Ok(ClassItem::Char(c));
        }
        let start = self.lexer.position();
        self.lexer.next_class_token()?;
        match self.lexer.next_class_token()? {
            ClassToken::Literal(end) if end >= c => Ok(ClassItem::Range(c, end)),
            ClassToken::Literal(_) => Err(OnigexError::syntax(
                "empty range in character class",
                start,
            )),
            _ => Err(OnigexError::syntax(
                "invalid end of range in character class",
                start,
            )),
        }
    }
}

fn contains_named_group(node: &Node) -> bool {
    match node {
        Node::Group {
            kind: GroupKind::Capture { name: Some(_), .. },
            ..
        } => true,
        _ => node.children().into_iter().any(contains_named_group),
    }
}

/// Assign capture numbers in pattern order
fn number_groups(node: &mut Node, groups: &mut GroupRegistry, unnamed_are_plain: bool) {
    match node {
        Node::Group { kind, body } => {
            if let GroupKind::Capture { number, name } = kind {
                if name.is_none() && unnamed_are_plain {
                    *kind = GroupKind::NonCapturing;
                } else {
                    *number = groups.register_group(name.clone());
                }
            }
            number_groups(body, groups, unnamed_are_plain);
        }
        Node::Sequence(nodes) | Node::Alternation(nodes) => {
            for child in nodes {
                number_groups(child, groups, unnamed_are_plain);
            }
        }
        Node::Quantified { body, .. } | Node::Absent(body) => {
            number_groups(body, groups, unnamed_are_plain);
        }
        _ => {}
    }
}

/// Resolves references once every group is numbered
struct Resolver<'a> {
    groups: &'a GroupRegistry,
    options: ParseOptions,
    numbered_forbidden: bool,
    positions: &'a [usize],
    next_reference: usize,
    opened: u32,
}

impl Resolver<'_> {
    fn resolve(&mut self, node: &mut Node) -> Result<()> {
        match node {
            Node::Group { kind, body } => {
                if let GroupKind::Capture { .. } = kind {
                    self.opened += 1;
                }
                self.resolve(body)
            }
            Node::Sequence(nodes) | Node::Alternation(nodes) => {
                for child in nodes {
                    self.resolve(child)?;
                }
                Ok(())
            }
            Node::Quantified { body, .. } | Node::Absent(body) => self.resolve(body),
            Node::Backreference { reference, targets } => {
                let position = self.take_position();
                *targets = self.resolve_backref(reference, position)?;
                Ok(())
            }
            Node::Subroutine { reference, target } => {
                let position = self.take_position();
                *target = self.resolve_subroutine(reference, position)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn take_position(&mut self) -> usize {
        let position = self.positions.get(self.next_reference).copied().unwrap_or(0);
        self.next_reference += 1;
        position
    }

    fn check_numbered(&self, position: usize) -> Result<()> {
        if self.numbered_forbidden {
            return Err(OnigexError::syntax(
                "numbered reference not allowed when named groups are used",
                position,
            ));
        }
        Ok(())
    }

    fn resolve_backref(&self, reference: &Reference, position: usize) -> Result<Vec<u32>> {
        match reference {
            Reference::Number(0) => Err(OnigexError::syntax("invalid backreference", position)),
            Reference::Number(n) => {
                self.check_numbered(position)?;
                if (*n as usize) <= self.groups.group_count() {
                    Ok(vec![*n])
                } else if self.options.allow_orphan_backrefs {
                    Ok(Vec::new())
                } else {
                    Err(OnigexError::syntax(
                        format!("backreference to undefined group {}", n),
                        position,
                    ))
                }
            }
            Reference::Relative(r) => {
                self.check_numbered(position)?;
                self.groups
                    .resolve_relative(*r, self.opened)
                    .map(|n| vec![n])
                    .ok_or_else(|| {
                        OnigexError::syntax("invalid relative backreference", position)
                    })
            }
            Reference::Name(name) => self
                .groups
                .numbers_for_name(name)
                .map(<[u32]>::to_vec)
                .ok_or_else(|| {
                    OnigexError::syntax(format!("undefined group name '{}'", name), position)
                }),
        }
    }

    fn resolve_subroutine(&self, reference: &Reference, position: usize) -> Result<u32> {
        match reference {
            Reference::Number(0) => Ok(0),
            Reference::Number(n) => {
                self.check_numbered(position)?;
                if (*n as usize) <= self.groups.group_count() {
                    Ok(*n)
                } else {
                    Err(OnigexError::syntax(
                        format!("subroutine call to undefined group {}", n),
                        position,
                    ))
                }
            }
            Reference::Relative(r) => {
                self.check_numbered(position)?;
                self.groups
                    .resolve_relative(*r, self.opened)
                    .ok_or_else(|| OnigexError::syntax("invalid relative subroutine", position))
            }
            Reference::Name(name) => match self.groups.numbers_for_name(name) {
                Some([n]) => Ok(*n),
                Some(_) => Err(OnigexError::syntax(
                    format!("subroutine call to duplicated name '{}'", name),
                    position,
                )),
                None => Err(OnigexError::syntax(
                    format!("undefined group name '{}'", name),
                    position,
                )),
            },
        }
    }
}

/// Parse an Oniguruma pattern string into a source AST
pub fn parse(input: &str, options: ParseOptions) -> Result<SourceAst> {
    Parser::new(input, options).parse()
}
