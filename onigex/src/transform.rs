//! Transformer from the source AST to the intermediate AST
//!
//! Normalizes Oniguruma-only semantics into host semantics: anchors that see only
//! `\n` as a line break, Unicode-aware shorthands, scoped flags resolved onto leaves,
//! subroutine calls inlined as hidden clones. Atomic groups, possessive quantifiers
//! and recursion are passed through as marked variants for later stages.

use std::collections::HashMap;

use crate::ast::{self, Assertion, CharClass, CharSet, FlagChange, GroupKind};
use crate::error::{OnigexError, Result};
use crate::ir::{self, Builtin, Class, ClassItem, Node, Strategy};
use crate::options::{Accuracy, PatternFlags, ResolvedOptions, Target};
use crate::parser::SourceAst;
use crate::unicode::{self, Fidelity, PosixPart};

/// Settings consumed by [`transform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    pub accuracy: Accuracy,
    pub target: Target,
    /// `\b` and `\B` use ASCII word characters
    pub ascii_word_boundaries: bool,
    /// A whole-pattern strategy is an error
    pub avoid_emulation: bool,
    /// `^` and `$` only match at the string boundaries
    pub singleline: bool,
}

impl TransformConfig {
    pub fn from_options(options: &ResolvedOptions) -> Self {
        TransformConfig {
            accuracy: options.accuracy,
            target: options.target,
            ascii_word_boundaries: options.rules.ascii_word_boundaries,
            avoid_emulation: options.avoid_emulation,
            singleline: options.rules.singleline,
        }
    }
}

/// Flag and position state at a point of the source tree
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    ignore_case: bool,
    dot_all: bool,
    /// Directly at the root (possibly inside flag groups)
    top_level: bool,
    /// Inside a clone produced by a subroutine call
    in_clone: bool,
}

impl Scope {
    fn apply(mut self, change: &FlagChange) -> Self {
        if change.enable.ignore_case {
            self.ignore_case = true;
        }
        if change.disable.ignore_case {
            self.ignore_case = false;
        }
        if change.enable.dot_all {
            self.dot_all = true;
        }
        if change.disable.dot_all {
            self.dot_all = false;
        }
        self
    }

    fn nested(self) -> Self {
        Scope {
            top_level: false,
            ..self
        }
    }
}

/// A capture group definition, as needed to inline a subroutine call
struct Definition<'a> {
    name: Option<String>,
    body: &'a ast::Node,
    scope: Scope,
}

struct Transformer<'a> {
    config: &'a TransformConfig,
    flags: PatternFlags,
    definitions: HashMap<u32, Definition<'a>>,
    /// Source capture numbers enclosing the current node
    ancestors: Vec<u32>,
    /// Subroutine targets being inlined
    inlining: Vec<u32>,
    recursions: usize,
}

/// Transform a parsed pattern into the intermediate AST
///
/// # Errors
/// `UnsupportedFeature` for constructs with no emulation, for approximations under
/// strict accuracy, and for strategies when emulation is avoided.
pub fn transform(source: &SourceAst, config: &TransformConfig) -> Result<ir::Ast> {
    let mut root = source.root.clone();
    let strategy = extract_strategy(&mut root, config.singleline);
    if strategy.is_some() && config.avoid_emulation {
        return Err(OnigexError::unsupported(
            "leading \\G requires the emulation wrapper",
        ));
    }

    let scope = Scope {
        ignore_case: source.flags.ignore_case,
        dot_all: source.flags.dot_all,
        top_level: true,
        in_clone: false,
    };
    let mut definitions = HashMap::new();
    collect_definitions(&source.root, scope, &mut definitions);

    let mut transformer = Transformer {
        config,
        flags: source.flags,
        definitions,
        ancestors: Vec::new(),
        inlining: Vec::new(),
        recursions: 0,
    };
    let root = transformer.node(&root, scope)?;
    Ok(ir::Ast { root, strategy })
}

fn collect_definitions<'a>(
    node: &'a ast::Node,
    scope: Scope,
    definitions: &mut HashMap<u32, Definition<'a>>,
) {
    match node {
        ast::Node::Group {
            kind: GroupKind::Capture { number, name },
            body,
        } => {
            definitions.insert(
                *number,
                Definition {
                    name: name.clone(),
                    body,
                    scope,
                },
            );
            collect_definitions(body, scope, definitions);
        }
        ast::Node::Group {
            kind: GroupKind::Flags(change),
            body,
        } => collect_definitions(body, scope.apply(change), definitions),
        _ => {
            for child in node.children() {
                collect_definitions(child, scope, definitions);
            }
        }
    }
}

impl Transformer<'_> {
    fn strict(&self) -> bool {
        self.config.accuracy == Accuracy::Strict
    }

    /// Fail under strict accuracy
    fn approximate(&self, what: &str) -> Result<()> {
        if self.strict() {
            return Err(OnigexError::unsupported(format!(
                "{} cannot be emulated exactly",
                what
            )));
        }
        Ok(())
    }

    fn node(&mut self, node: &ast::Node, scope: Scope) -> Result<Node> {
        let result = match node {
            ast::Node::Empty => Node::Empty,
            ast::Node::Literal(value) => Node::Literal {
                value: *value,
                ignore_case: scope.ignore_case,
            },
            ast::Node::Dot => Node::Dot {
                dot_all: scope.dot_all,
            },
            ast::Node::Sequence(nodes) => self.sequence(nodes, scope)?,
            ast::Node::Alternation(nodes) => {
                let mut alternatives = Vec::with_capacity(nodes.len());
                for child in nodes {
                    alternatives.push(self.node(child, scope.nested())?);
                }
                Node::Alternation(alternatives)
            }
            ast::Node::Set(set) => Node::Class(self.set(set, scope)?),
            ast::Node::Class(class) => Node::Class(self.class(class, scope)?),
            ast::Node::Group { kind, body } => self.group(kind, body, scope)?,
            ast::Node::Quantified {
                body,
                min,
                max,
                kind,
            } => Node::Quantified {
                body: Box::new(self.node(body, scope.nested())?),
                min: *min,
                max: *max,
                kind: *kind,
            },
            ast::Node::Assertion(assertion) => self.assertion(*assertion)?,
            ast::Node::Backreference { targets, .. } => {
                if targets.len() > 1 {
                    self.approximate("backreference to a duplicated group name")?;
                }
                Node::Backreference {
                    targets: targets.clone(),
                    ignore_case: scope.ignore_case,
                }
            }
            ast::Node::Subroutine { target, .. } => self.subroutine(*target, scope)?,
            ast::Node::Keep if scope.top_level => Node::Empty,
            ast::Node::Keep => {
                return Err(OnigexError::unsupported(
                    "\\K is only supported at the top level",
                ));
            }
            ast::Node::LineBreak => line_break(),
            ast::Node::Grapheme => {
                self.approximate("\\X")?;
                grapheme()
            }
            ast::Node::Absent(_) => {
                return Err(OnigexError::unsupported("absent functions"));
            }
        };
        Ok(result)
    }

    fn sequence(&mut self, nodes: &[ast::Node], scope: Scope) -> Result<Node> {
        let inner = scope.nested();
        let keep = if scope.top_level {
            nodes.iter().rposition(|n| matches!(n, ast::Node::Keep))
        } else {
            None
        };

        let mut out = Vec::with_capacity(nodes.len() + 1);
        let rest = match keep {
            Some(index) => {
                // Everything before the last `\K` must precede the match
                let mut prefix = Vec::with_capacity(index);
                for child in nodes[..index].iter().filter(|n| !matches!(n, ast::Node::Keep)) {
                    prefix.push(self.node(child, inner)?);
                }
                let prefix = Node::sequence(prefix);
                if prefix != Node::Empty {
                    // A lookbehind may see text consumed by an earlier match
                    self.approximate("\\K")?;
                    out.push(Node::lookbehind(false, prefix));
                }
                &nodes[index + 1..]
            }
            None => nodes,
        };
        for child in rest {
            out.push(self.node(child, inner)?);
        }
        Ok(Node::sequence(out))
    }

    fn group(&mut self, kind: &GroupKind, body: &ast::Node, scope: Scope) -> Result<Node> {
        let node = match kind {
            GroupKind::Capture { number, name } => {
                self.ancestors.push(*number);
                let body = self.node(body, scope.nested());
                self.ancestors.pop();
                Node::Capture {
                    number: *number,
                    name: name.clone(),
                    hidden: scope.in_clone,
                    origin: scope.in_clone.then_some(*number),
                    body: Box::new(body?),
                }
            }
            GroupKind::NonCapturing => Node::Group(Box::new(self.node(body, scope.nested())?)),
            GroupKind::Atomic => Node::Atomic(Box::new(self.node(body, scope.nested())?)),
            GroupKind::LookAround { behind, negated } => Node::LookAround {
                behind: *behind,
                negated: *negated,
                body: Box::new(self.node(body, scope.nested())?),
            },
            GroupKind::Flags(change) => {
                let inner = self.node(body, scope.apply(change))?;
                match inner {
                    Node::Alternation(_) => Node::Group(Box::new(inner)),
                    other => other,
                }
            }
        };
        Ok(node)
    }

    fn subroutine(&mut self, target: u32, scope: Scope) -> Result<Node> {
        let recursive = target == 0 || self.ancestors.contains(&target);
        if recursive {
            if scope.in_clone || !self.inlining.is_empty() {
                return Err(OnigexError::unsupported(
                    "recursion through a subroutine call",
                ));
            }
            self.recursions += 1;
            if self.recursions > 1 {
                return Err(OnigexError::unsupported(
                    "more than one recursive reference",
                ));
            }
            self.approximate("recursion")?;
            return Ok(Node::Recursion { target });
        }

        if self.inlining.contains(&target) {
            return Err(OnigexError::unsupported("mutually recursive subroutines"));
        }
        let (name, body, definition_scope) = match self.definitions.get(&target) {
            Some(definition) => (definition.name.clone(), definition.body, definition.scope),
            None => {
                return Err(OnigexError::unsupported(format!(
                    "subroutine call to unknown group {}",
                    target
                )));
            }
        };

        // A call runs with the flags at the group's definition, not at the call site
        let clone_scope = Scope {
            top_level: false,
            in_clone: true,
            ..definition_scope
        };
        self.inlining.push(target);
        self.ancestors.push(target);
        let body = self.node(body, clone_scope);
        self.ancestors.pop();
        self.inlining.pop();

        Ok(Node::Capture {
            number: target,
            name,
            hidden: true,
            origin: Some(target),
            body: Box::new(body?),
        })
    }

    fn assertion(&self, assertion: Assertion) -> Result<Node> {
        let node = match assertion {
            Assertion::LineStart if self.config.singleline => {
                Node::Assertion(ir::Assertion::StringStart)
            }
            Assertion::LineEnd if self.config.singleline => string_end_newline(),
            // Only `\n` separates lines
            Assertion::LineStart => Node::lookbehind(true, Node::Class(not_newline())),
            Assertion::LineEnd => Node::lookahead(true, Node::Class(not_newline())),
            Assertion::StringStart => Node::Assertion(ir::Assertion::StringStart),
            Assertion::StringEnd => Node::Assertion(ir::Assertion::StringEnd),
            Assertion::StringEndNewline => string_end_newline(),
            Assertion::SearchStart => {
                return Err(OnigexError::unsupported(
                    "\\G is only supported at the start of the pattern",
                ));
            }
            Assertion::WordBoundary | Assertion::NonWordBoundary => {
                let negated = assertion == Assertion::NonWordBoundary;
                if self.config.ascii_word_boundaries || self.flags.word_is_ascii {
                    Node::Assertion(ir::Assertion::WordBoundary { negated })
                } else {
                    unicode_word_boundary(negated)
                }
            }
        };
        Ok(node)
    }

    /// Class for a set escape
    fn set(&self, set: &CharSet, scope: Scope) -> Result<Class> {
        let (negated, items) = match set {
            CharSet::Digit { negated } if self.flags.digit_is_ascii => (
                false,
                vec![ClassItem::Builtin {
                    kind: Builtin::Digit,
                    negated: *negated,
                }],
            ),
            CharSet::Digit { negated } => (false, vec![property("Nd", *negated)]),
            CharSet::Word { negated } if self.flags.word_is_ascii => (
                false,
                vec![ClassItem::Builtin {
                    kind: Builtin::Word,
                    negated: *negated,
                }],
            ),
            CharSet::Word { negated } => (*negated, unicode_word_items()),
            CharSet::Space { negated } if self.flags.space_is_ascii => (
                *negated,
                vec![ClassItem::Range('\t', '\r'), ClassItem::Char(' ')],
            ),
            CharSet::Space { negated } => (false, vec![property("White_Space", *negated)]),
            CharSet::Hex { negated } => (*negated, hex_items()),
            CharSet::Property { name, negated } => (
                false,
                vec![ClassItem::Property {
                    name: unicode::property_expression(name),
                    negated: *negated,
                }],
            ),
            CharSet::Posix { name, negated } => self.posix(name, *negated)?,
            CharSet::NotNewline => (true, vec![ClassItem::Char('\n')]),
            CharSet::Any => (false, any_items()),
        };
        Ok(Class {
            negated,
            items,
            ignore_case: scope.ignore_case,
        })
    }

    fn posix(&self, name: &str, negated: bool) -> Result<(bool, Vec<ClassItem>)> {
        let ascii = match name {
            "digit" => self.flags.digit_is_ascii,
            "space" => self.flags.space_is_ascii,
            "word" | "alnum" => self.flags.word_is_ascii,
            _ => false,
        };
        let Some(class) = unicode::posix_class(name, ascii) else {
            return Err(OnigexError::unsupported(format!(
                "POSIX class [:{}:]",
                name
            )));
        };
        if class.fidelity == Fidelity::Approximate {
            self.approximate(&format!("POSIX class [:{}:]", name))?;
        }
        let items = class
            .parts
            .iter()
            .map(|part| match part {
                PosixPart::Range(a, b) if a == b => ClassItem::Char(*a),
                PosixPart::Range(a, b) => ClassItem::Range(*a, *b),
                PosixPart::Property(name) => property(name, false),
            })
            .collect();
        Ok((class.negated != negated, items))
    }

    fn class(&self, class: &CharClass, scope: Scope) -> Result<Class> {
        let mut items = Vec::with_capacity(class.items.len());
        for item in &class.items {
            match item {
                ast::ClassItem::Char(c) => items.push(ClassItem::Char(*c)),
                ast::ClassItem::Range(a, b) => items.push(ClassItem::Range(*a, *b)),
                ast::ClassItem::Set(set) => {
                    let set = self.set(set, scope)?;
                    if set.negated {
                        items.push(ClassItem::Nested(set));
                    } else {
                        items.extend(set.items);
                    }
                }
                ast::ClassItem::Nested(nested) => {
                    let nested = self.class(nested, scope)?;
                    let simple = !nested.negated
                        && !nested
                            .items
                            .iter()
                            .any(|i| matches!(i, ClassItem::Intersection(_)));
                    if simple {
                        items.extend(nested.items);
                    } else {
                        items.push(ClassItem::Nested(nested));
                    }
                }
                ast::ClassItem::Intersection(operands) => {
                    let mut classes = Vec::with_capacity(operands.len());
                    for operand in operands {
                        classes.push(self.class(operand, scope)?);
                    }
                    items.push(ClassItem::Intersection(classes));
                }
            }
        }
        Ok(Class {
            negated: class.negated,
            items,
            ignore_case: scope.ignore_case,
        })
    }
}

/// Detect a leading search-start anchor, remove it and return its strategy
fn extract_strategy(root: &mut ast::Node, singleline: bool) -> Option<Strategy> {
    let strategy = match leading_strategy(root)? {
        Strategy::LineOrSearchStart if singleline => Strategy::StringOrSearchStart,
        strategy => strategy,
    };
    strip_leading(root);
    Some(strategy)
}

fn leading_strategy(node: &ast::Node) -> Option<Strategy> {
    match node {
        ast::Node::Assertion(Assertion::SearchStart) => Some(Strategy::SearchStart),
        ast::Node::Group {
            kind:
                GroupKind::LookAround {
                    behind: false,
                    negated: true,
                },
            body,
        } if **body == ast::Node::Assertion(Assertion::SearchStart) => {
            Some(Strategy::NotSearchStart)
        }
        ast::Node::Group {
            kind: GroupKind::NonCapturing,
            body,
        } if is_line_or_search_start(body) => Some(Strategy::LineOrSearchStart),
        ast::Node::Alternation(alternatives) => alternatives
            .iter()
            .all(|alt| leading_strategy(alt) == Some(Strategy::SearchStart))
            .then_some(Strategy::SearchStart),
        ast::Node::Sequence(nodes) => nodes.first().and_then(leading_strategy),
        ast::Node::Group {
            kind: GroupKind::Flags(_) | GroupKind::Capture { .. },
            body,
        } => leading_strategy(body),
        _ => None,
    }
}

fn is_line_or_search_start(node: &ast::Node) -> bool {
    use ast::Node::Assertion as A;
    matches!(
        node,
        ast::Node::Alternation(alts) if matches!(
            alts.as_slice(),
            [A(Assertion::LineStart), A(Assertion::SearchStart)]
                | [A(Assertion::SearchStart), A(Assertion::LineStart)]
        )
    )
}

/// Replace the anchor found by [`leading_strategy`] with an empty node
fn strip_leading(node: &mut ast::Node) {
    match node {
        ast::Node::Alternation(alternatives) => alternatives.iter_mut().for_each(strip_leading),
        ast::Node::Sequence(nodes) => {
            if let Some(first) = nodes.first_mut() {
                strip_leading(first);
            }
        }
        ast::Node::Group {
            kind: GroupKind::Flags(_) | GroupKind::Capture { .. },
            body,
        } => strip_leading(body),
        _ => *node = ast::Node::Empty,
    }
}

fn property(name: &str, negated: bool) -> ClassItem {
    ClassItem::Property {
        name: name.to_string(),
        negated,
    }
}

fn unicode_word_items() -> Vec<ClassItem> {
    ["L", "M", "N", "Pc"]
        .into_iter()
        .map(|name| property(name, false))
        .collect()
}

fn hex_items() -> Vec<ClassItem> {
    vec![
        ClassItem::Range('0', '9'),
        ClassItem::Range('A', 'F'),
        ClassItem::Range('a', 'f'),
    ]
}

/// `[\s\S]`
fn any_items() -> Vec<ClassItem> {
    vec![
        ClassItem::Builtin {
            kind: Builtin::Space,
            negated: false,
        },
        ClassItem::Builtin {
            kind: Builtin::Space,
            negated: true,
        },
    ]
}

fn not_newline() -> Class {
    Class::of(vec![ClassItem::Char('\n')]).negate()
}

/// `\Z`: end of string, or before a final newline
fn string_end_newline() -> Node {
    Node::lookahead(
        false,
        Node::sequence(vec![
            Node::Quantified {
                body: Box::new(Node::literal('\n')),
                min: 0,
                max: Some(1),
                kind: ir::QuantifierKind::Greedy,
            },
            Node::Assertion(ir::Assertion::StringEnd),
        ]),
    )
}

fn unicode_word_boundary(negated: bool) -> Node {
    let word = || Node::Class(Class::of(unicode_word_items()));
    let (first, second) = if negated {
        (
            vec![Node::lookbehind(false, word()), Node::lookahead(false, word())],
            vec![Node::lookbehind(true, word()), Node::lookahead(true, word())],
        )
    } else {
        (
            vec![Node::lookbehind(false, word()), Node::lookahead(true, word())],
            vec![Node::lookbehind(true, word()), Node::lookahead(false, word())],
        )
    };
    Node::Group(Box::new(Node::Alternation(vec![
        Node::Sequence(first),
        Node::Sequence(second),
    ])))
}

/// `\R`
fn line_break() -> Node {
    let singles = ['\n', '\u{B}', '\u{C}', '\r', '\u{85}', '\u{2028}', '\u{2029}']
        .into_iter()
        .map(ClassItem::Char)
        .collect();
    Node::Atomic(Box::new(Node::Alternation(vec![
        Node::Sequence(vec![Node::literal('\r'), Node::literal('\n')]),
        Node::Class(Class::of(singles)),
    ])))
}

/// `\X`, approximated as a base character followed by combining marks
fn grapheme() -> Node {
    Node::Atomic(Box::new(Node::Alternation(vec![
        Node::Sequence(vec![Node::literal('\r'), Node::literal('\n')]),
        Node::Sequence(vec![
            Node::Class(Class::of(any_items())),
            Node::Quantified {
                body: Box::new(Node::Class(Class::of(vec![property("M", false)]))),
                min: 0,
                max: None,
                kind: ir::QuantifierKind::Greedy,
            },
        ]),
    ])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};

    fn config() -> TransformConfig {
        TransformConfig {
            accuracy: Accuracy::Default,
            target: Target::Es2025,
            ascii_word_boundaries: false,
            avoid_emulation: false,
            singleline: false,
        }
    }

    fn run(pattern: &str) -> Result<ir::Ast> {
        run_with(pattern, &config())
    }

    fn run_with(pattern: &str, config: &TransformConfig) -> Result<ir::Ast> {
        let source = parse(pattern, ParseOptions::default())?;
        transform(&source, config)
    }

    #[test]
    fn test_literals_copied() {
        let ast = run("ab").unwrap();
        assert_eq!(
            ast.root,
            Node::Sequence(vec![Node::literal('a'), Node::literal('b')])
        );
        assert_eq!(ast.strategy, None);
    }

    #[test]
    fn test_line_anchors_become_lookarounds() {
        let ast = run("^a$").unwrap();
        let Node::Sequence(nodes) = ast.root else {
            panic!("expected sequence");
        };
        assert!(matches!(
            nodes[0],
            Node::LookAround {
                behind: true,
                negated: true,
                ..
            }
        ));
        assert!(matches!(
            nodes[2],
            Node::LookAround {
                behind: false,
                negated: true,
                ..
            }
        ));
    }

    #[test]
    fn test_singleline_anchors() {
        let config = TransformConfig {
            singleline: true,
            ..config()
        };
        let ast = run_with("^a", &config).unwrap();
        assert_eq!(
            ast.root,
            Node::Sequence(vec![
                Node::Assertion(ir::Assertion::StringStart),
                Node::literal('a'),
            ])
        );
    }

    #[test]
    fn test_flags_resolved_onto_leaves() {
        let ast = run("a(?i)b").unwrap();
        assert_eq!(
            ast.root,
            Node::Sequence(vec![
                Node::literal('a'),
                Node::Literal {
                    value: 'b',
                    ignore_case: true,
                },
            ])
        );
    }

    #[test]
    fn test_dot_all_from_m_flag() {
        let ast = run("(?m:.).").unwrap();
        assert_eq!(
            ast.root,
            Node::Sequence(vec![
                Node::Dot { dot_all: true },
                Node::Dot { dot_all: false },
            ])
        );
    }

    #[test]
    fn test_atomic_and_possessive_passed_through() {
        assert!(matches!(run("(?>a)").unwrap().root, Node::Atomic(_)));
        assert!(matches!(
            run("a++").unwrap().root,
            Node::Quantified {
                kind: ir::QuantifierKind::Possessive,
                ..
            }
        ));
    }

    #[test]
    fn test_subroutine_inlined_as_hidden_clone() {
        let ast = run(r"(?<n>a)\g<n>").unwrap();
        let Node::Sequence(nodes) = ast.root else {
            panic!("expected sequence");
        };
        assert!(matches!(
            &nodes[0],
            Node::Capture {
                hidden: false,
                origin: None,
                ..
            }
        ));
        assert!(matches!(
            &nodes[1],
            Node::Capture {
                hidden: true,
                origin: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn test_subroutine_uses_definition_flags() {
        let ast = run(r"(?i:(?<n>a))\g<n>").unwrap();
        let mut flags = Vec::new();
        ast.root.walk(&mut |n| {
            if let Node::Literal { ignore_case, .. } = n {
                flags.push(*ignore_case);
            }
        });
        assert_eq!(flags, vec![true, true]);
    }

    #[test]
    fn test_recursion_marked() {
        let ast = run(r"a\g<0>?b").unwrap();
        assert!(ast.root.any(&|n| *n == Node::Recursion { target: 0 }));

        let ast = run(r"(?<r>a\g<r>?b)").unwrap();
        assert!(ast.root.any(&|n| *n == Node::Recursion { target: 1 }));
    }

    #[test]
    fn test_recursion_strict_is_error() {
        let config = TransformConfig {
            accuracy: Accuracy::Strict,
            ..config()
        };
        assert!(matches!(
            run_with(r"a\g<0>?b", &config),
            Err(OnigexError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_multiple_recursions_unsupported() {
        assert!(run(r"a\g<0>?\g<0>?b").is_err());
    }

    #[test]
    fn test_mutual_recursion_unsupported() {
        assert!(run(r"(?<a>x\g<b>?)(?<b>y\g<a>?)").is_err());
    }

    #[test]
    fn test_strategies() {
        assert_eq!(run(r"\Ga").unwrap().strategy, Some(Strategy::SearchStart));
        assert_eq!(run(r"\Ga|\Gb").unwrap().strategy, Some(Strategy::SearchStart));
        assert_eq!(run(r"(?!\G)a").unwrap().strategy, Some(Strategy::NotSearchStart));
        assert_eq!(
            run(r"(?:^|\G)a").unwrap().strategy,
            Some(Strategy::LineOrSearchStart)
        );
        assert_eq!(run(r"\Ga").unwrap().root, Node::literal('a'));
    }

    #[test]
    fn test_singleline_line_or_search_start() {
        let config = TransformConfig {
            singleline: true,
            ..config()
        };
        assert_eq!(
            run_with(r"(?:^|\G)a", &config).unwrap().strategy,
            Some(Strategy::StringOrSearchStart)
        );
    }

    #[test]
    fn test_other_search_start_unsupported() {
        assert!(run(r"a\G").is_err());
        assert!(run(r"\Ga|b").is_err());
    }

    #[test]
    fn test_strategy_with_avoid_emulation() {
        let config = TransformConfig {
            avoid_emulation: true,
            ..config()
        };
        assert!(matches!(
            run_with(r"\Ga", &config),
            Err(OnigexError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_keep_becomes_lookbehind() {
        let ast = run(r"ab\Kc").unwrap();
        let Node::Sequence(nodes) = ast.root else {
            panic!("expected sequence");
        };
        assert!(matches!(nodes[0], Node::LookAround { behind: true, negated: false, .. }));
        assert_eq!(nodes[1], Node::literal('c'));
        assert!(run(r"(a\Kb)").is_err());
    }

    #[test]
    fn test_keep_strict() {
        let config = TransformConfig {
            accuracy: Accuracy::Strict,
            ..config()
        };
        let err = run_with(r"ab\Kc", &config).unwrap_err();
        assert!(matches!(err, OnigexError::UnsupportedFeature(_)));
        assert!(run_with(r"\Kc", &config).is_ok());
    }

    #[test]
    fn test_grapheme_strict() {
        assert!(run(r"\X").is_ok());
        let config = TransformConfig {
            accuracy: Accuracy::Strict,
            ..config()
        };
        assert!(run_with(r"\X", &config).is_err());
    }

    #[test]
    fn test_absent_unsupported() {
        assert!(matches!(
            run("(?~abc)"),
            Err(OnigexError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_ascii_word_boundaries() {
        let config = TransformConfig {
            ascii_word_boundaries: true,
            ..config()
        };
        assert_eq!(
            run_with(r"\b", &config).unwrap().root,
            Node::Assertion(ir::Assertion::WordBoundary { negated: false })
        );
        assert!(matches!(run(r"\b").unwrap().root, Node::Group(_)));
    }

    #[test]
    fn test_negated_set_in_class_nests() {
        let ast = run(r"[a\W]").unwrap();
        let Node::Class(class) = ast.root else {
            panic!("expected class");
        };
        assert!(matches!(&class.items[1], ClassItem::Nested(c) if c.negated));
    }
}
