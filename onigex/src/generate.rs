//! Generator from the intermediate AST to pattern text
//!
//! Emits host syntax extended with the markers understood by the postprocessor
//! (`(?>`, possessive suffixes, `(?R=N)`, `\g<N&R=N>`), chooses the flag string for
//! the target level, and records which emitted captures are hidden and which report
//! under another capture.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{OnigexError, Result};
use crate::ir::{self, Builtin, Class, ClassItem, Node, QuantifierKind};
use crate::options::{Accuracy, ResolvedOptions, Target};
use crate::postprocess::{CaptureMeta, scan};

/// Settings consumed by [`generate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub accuracy: Accuracy,
    pub target: Target,
    /// Depth of bounded recursion markers
    pub recursion_limit: u32,
    /// Keep non-capturing groups from the source
    pub verbose: bool,
}

impl GenerateOptions {
    pub fn from_options(options: &ResolvedOptions) -> Self {
        GenerateOptions {
            accuracy: options.accuracy,
            target: options.target,
            recursion_limit: options.rules.recursion_limit,
            verbose: options.verbose,
        }
    }
}

/// Output of [`generate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub pattern: String,
    /// `i`, `s` and `u` or `v`, in that order
    pub flags: String,
    pub meta: CaptureMeta,
}

/// How case-insensitive leaves are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
    /// No leaf ignores case
    Sensitive,
    /// Every case-relevant leaf ignores case: flag `i`
    Insensitive,
    /// Both: modifier groups or case-variant expansion
    Mixed,
}

struct Generator<'a> {
    options: &'a GenerateOptions,
    case_mode: CaseMode,
    dot_all_flag: bool,
    /// Emitted capture indices for each source group number
    emitted: HashMap<u32, Vec<usize>>,
    /// Emitted index of the visible capture for each source group number
    primary: HashMap<u32, usize>,
    out: String,
    opened: usize,
    open_captures: Vec<usize>,
    names: HashSet<String>,
    after_backref: bool,
}

/// Generate a pattern, its flags and capture metadata
///
/// # Errors
/// `UnsupportedTarget` when a construct needs a higher target level,
/// `UnsupportedFeature` for approximations under strict accuracy.
pub fn generate(ast: &ir::Ast, options: &GenerateOptions) -> Result<Generated> {
    let mut generator = Generator {
        options,
        case_mode: case_mode(&ast.root),
        dot_all_flag: dot_all_flag(&ast.root),
        emitted: HashMap::new(),
        primary: HashMap::new(),
        out: String::new(),
        opened: 0,
        open_captures: Vec::new(),
        names: HashSet::new(),
        after_backref: false,
    };
    let meta = generator.number_captures(&ast.root);
    generator.node(&ast.root)?;

    let mut flags = String::new();
    if generator.case_mode == CaseMode::Insensitive {
        flags.push('i');
    }
    if generator.dot_all_flag {
        flags.push('s');
    }
    flags.push(if options.target.has_unicode_sets() { 'v' } else { 'u' });

    Ok(Generated {
        pattern: generator.out,
        flags,
        meta,
    })
}

fn case_mode(root: &Node) -> CaseMode {
    let mut sensitive = false;
    let mut insensitive = false;
    root.walk(&mut |node| {
        let ignore_case = match node {
            Node::Literal { value, ignore_case } if has_case(*value) => *ignore_case,
            Node::Class(class) if class_has_case(class) => class.ignore_case,
            Node::Backreference {
                targets,
                ignore_case,
            } if !targets.is_empty() => *ignore_case,
            _ => return,
        };
        if ignore_case {
            insensitive = true;
        } else {
            sensitive = true;
        }
    });
    match (sensitive, insensitive) {
        (_, false) => CaseMode::Sensitive,
        (false, true) => CaseMode::Insensitive,
        (true, true) => CaseMode::Mixed,
    }
}

fn dot_all_flag(root: &Node) -> bool {
    let mut dots = 0;
    let mut all = true;
    root.walk(&mut |node| {
        if let Node::Dot { dot_all } = node {
            dots += 1;
            all &= *dot_all;
        }
    });
    dots > 0 && all
}

/// Other-case forms of a character
fn case_variants(c: char) -> Vec<char> {
    fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
        let first = chars.next()?;
        chars.next().is_none().then_some(first)
    }
    let lower = single(c.to_lowercase());
    let upper = single(c.to_uppercase());
    let folded = upper.and_then(|u| single(u.to_lowercase()));
    let mut variants: Vec<char> = [lower, upper, folded]
        .into_iter()
        .flatten()
        .filter(|&v| v != c)
        .collect();
    variants.sort_unstable();
    variants.dedup();
    variants
}

fn has_case(c: char) -> bool {
    !case_variants(c).is_empty()
}

/// Properties whose members change under case folding
fn is_cased_property(name: &str) -> bool {
    matches!(
        name,
        "Lu" | "Ll" | "Lt" | "LC" | "Uppercase_Letter" | "Lowercase_Letter"
            | "Titlecase_Letter" | "Cased_Letter" | "Uppercase" | "Lowercase" | "Cased"
    )
}

fn class_has_case(class: &Class) -> bool {
    class.items.iter().any(|item| match item {
        ClassItem::Char(c) => has_case(*c),
        ClassItem::Range(a, b) => {
            let (a, b) = (*a as u32, *b as u32);
            // Large ranges always contain cased letters
            b - a > 0x100 || (a..=b).filter_map(char::from_u32).any(has_case)
        }
        ClassItem::Property { name, .. } => is_cased_property(name),
        ClassItem::Builtin { .. } => false,
        ClassItem::Nested(nested) => class_has_case(nested),
        ClassItem::Intersection(operands) => operands.iter().any(class_has_case),
    })
}

/// Escape a character outside classes
fn escape(c: char, out: &mut String) {
    match c {
        '^' | '$' | '\\' | '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|'
        | '/' => {
            out.push('\\');
            out.push(c);
        }
        _ => escape_common(c, out),
    }
}

/// Escape a character inside a class; `v` selects the stricter `v`-flag syntax
fn escape_in_class(c: char, v: bool, out: &mut String) {
    let special = match c {
        '\\' | ']' | '[' | '^' | '-' => true,
        '(' | ')' | '{' | '}' | '/' | '|' | '$' | '.' | '*' | '+' | '?' => v,
        '&' | '!' | '#' | '%' | ',' | ':' | ';' | '<' | '=' | '>' | '@' | '`' | '~' => v,
        _ => false,
    };
    if special {
        out.push('\\');
        out.push(c);
    } else {
        escape_common(c, out);
    }
}

fn escape_common(c: char, out: &mut String) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{B}' => out.push_str("\\v"),
        '\u{C}' => out.push_str("\\f"),
        c if c.is_control() || (c.is_whitespace() && c != ' ') => {
            if (c as u32) <= 0xFF {
                out.push_str(&format!("\\x{:02X}", c as u32));
            } else {
                out.push_str(&format!("\\u{{{:X}}}", c as u32));
            }
        }
        c => out.push(c),
    }
}

fn quantifier(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (0, Some(1)) => "?".to_string(),
        (n, None) => format!("{{{},}}", n),
        (n, Some(m)) if n == m => format!("{{{}}}", n),
        (n, Some(m)) => format!("{{{},{}}}", n, m),
    }
}

fn builtin(kind: Builtin, negated: bool) -> &'static str {
    match (kind, negated) {
        (Builtin::Digit, false) => "\\d",
        (Builtin::Digit, true) => "\\D",
        (Builtin::Word, false) => "\\w",
        (Builtin::Word, true) => "\\W",
        (Builtin::Space, false) => "\\s",
        (Builtin::Space, true) => "\\S",
    }
}

fn property_escape(name: &str, negated: bool) -> String {
    format!("\\{}{{{}}}", if negated { 'P' } else { 'p' }, name)
}

impl Generator<'_> {
    fn strict(&self) -> bool {
        self.options.accuracy == Accuracy::Strict
    }

    fn approximate(&self, what: &str) -> Result<()> {
        if self.strict() {
            return Err(OnigexError::unsupported(format!(
                "{} cannot be emulated exactly",
                what
            )));
        }
        Ok(())
    }

    fn needs_target(&self, feature: &str) -> OnigexError {
        OnigexError::UnsupportedTarget {
            feature: feature.to_string(),
            target: self.options.target,
        }
    }

    /// Assign emitted indices in pattern order and record hidden captures and transfers
    fn number_captures(&mut self, root: &Node) -> CaptureMeta {
        let mut meta = CaptureMeta::default();
        let mut index = 0;
        let mut clones = Vec::new();
        root.walk(&mut |node| {
            if let Node::Capture {
                number,
                hidden,
                origin,
                ..
            } = node
            {
                index += 1;
                self.emitted.entry(*number).or_default().push(index);
                if *hidden {
                    meta.hidden.insert(index);
                    if let Some(origin) = origin {
                        clones.push((*origin, index));
                    }
                } else {
                    self.primary.entry(*number).or_insert(index);
                }
            }
        });
        for (origin, index) in clones {
            if let Some(&destination) = self.primary.get(&origin) {
                meta.add_transfer(destination, index);
            }
        }
        meta
    }

    fn modifier_groups(&self) -> bool {
        self.case_mode == CaseMode::Mixed && self.options.target.has_flag_groups()
    }

    /// Case-insensitive leaf to wrap in `(?i:...)` when modifier groups are in use
    fn is_insensitive_leaf(&self, node: &Node) -> bool {
        self.modifier_groups()
            && match node {
                Node::Literal { value, ignore_case } => *ignore_case && has_case(*value),
                Node::Class(class) => class.ignore_case && class_has_case(class),
                Node::Backreference {
                    targets,
                    ignore_case,
                } => *ignore_case && !targets.is_empty(),
                _ => false,
            }
    }

    fn node(&mut self, node: &Node) -> Result<()> {
        // Wrappers that emit nothing before their first child pass the state down
        let transparent = match node {
            Node::Empty | Node::Sequence(_) => true,
            Node::Group(body) => !self.options.verbose && !matches!(**body, Node::Alternation(_)),
            _ => false,
        };
        let after_backref = if transparent {
            self.after_backref
        } else {
            std::mem::take(&mut self.after_backref)
        };
        if self.is_insensitive_leaf(node) {
            self.out.push_str("(?i:");
            self.leaf(node, after_backref, false)?;
            self.out.push(')');
            return Ok(());
        }
        match node {
            Node::Literal { .. } | Node::Class(_) | Node::Backreference { .. } => {
                self.leaf(node, after_backref, self.case_mode == CaseMode::Mixed)?;
            }
            Node::Empty => {}
            Node::Dot { dot_all: true } if self.dot_all_flag => self.out.push('.'),
            Node::Dot { dot_all: true } => self.out.push_str("[\\s\\S]"),
            Node::Dot { dot_all: false } => self.out.push_str("[^\\n]"),
            Node::Sequence(nodes) => self.sequence(nodes)?,
            Node::Alternation(nodes) => {
                for (i, alternative) in nodes.iter().enumerate() {
                    if i > 0 {
                        self.out.push('|');
                    }
                    self.node(alternative)?;
                }
            }
            Node::Capture {
                name, hidden, body, ..
            } => {
                self.opened += 1;
                self.open_captures.push(self.opened);
                self.out.push('(');
                if let Some(name) = name.as_ref().filter(|_| !hidden) {
                    // Later duplicates of a name stay unnamed
                    if self.names.insert(name.clone()) {
                        self.out.push_str("?<");
                        self.out.push_str(name);
                        self.out.push('>');
                    }
                }
                self.node(body)?;
                self.out.push(')');
                self.open_captures.pop();
            }
            Node::Group(body) => {
                let wrap = self.options.verbose || matches!(**body, Node::Alternation(_));
                if wrap {
                    self.out.push_str("(?:");
                }
                self.node(body)?;
                if wrap {
                    self.out.push(')');
                }
            }
            Node::Atomic(body) => {
                self.out.push_str("(?>");
                self.node(body)?;
                self.out.push(')');
            }
            Node::LookAround {
                behind,
                negated,
                body,
            } => {
                self.out.push_str(match (behind, negated) {
                    (false, false) => "(?=",
                    (false, true) => "(?!",
                    (true, false) => "(?<=",
                    (true, true) => "(?<!",
                });
                self.node(body)?;
                self.out.push(')');
            }
            Node::Quantified {
                body,
                min,
                max,
                kind,
            } => self.quantified(body, *min, *max, *kind, after_backref)?,
            Node::Assertion(assertion) => self.out.push_str(match assertion {
                ir::Assertion::StringStart => "^",
                ir::Assertion::StringEnd => "$",
                ir::Assertion::WordBoundary { negated: false } => "\\b",
                ir::Assertion::WordBoundary { negated: true } => "\\B",
            }),
            Node::Recursion { target } => self.recursion(*target)?,
        }
        Ok(())
    }

    fn sequence(&mut self, nodes: &[Node]) -> Result<()> {
        let mut i = 0;
        while i < nodes.len() {
            // Share one modifier group across a run of case-insensitive leaves
            if self.is_insensitive_leaf(&nodes[i]) {
                let after_backref = std::mem::take(&mut self.after_backref);
                self.out.push_str("(?i:");
                self.leaf(&nodes[i], after_backref, false)?;
                i += 1;
                while i < nodes.len() && self.is_insensitive_leaf(&nodes[i]) {
                    let after_backref = std::mem::take(&mut self.after_backref);
                    self.leaf(&nodes[i], after_backref, false)?;
                    i += 1;
                }
                self.out.push(')');
                continue;
            }
            if let Node::Alternation(_) = nodes[i] {
                self.out.push_str("(?:");
                self.node(&nodes[i])?;
                self.out.push(')');
            } else {
                self.node(&nodes[i])?;
            }
            i += 1;
        }
        Ok(())
    }

    /// Emit a literal, class or backreference
    ///
    /// `expand_case` spells out case variants of case-insensitive content.
    fn leaf(&mut self, node: &Node, after_backref: bool, expand_case: bool) -> Result<()> {
        match node {
            Node::Literal { value, ignore_case } => {
                let variants = if expand_case && *ignore_case {
                    case_variants(*value)
                } else {
                    Vec::new()
                };
                if variants.is_empty() {
                    if after_backref && value.is_ascii_digit() {
                        self.out.push_str("(?:)");
                    }
                    escape(*value, &mut self.out);
                } else {
                    let v = self.options.target.has_unicode_sets();
                    self.out.push('[');
                    escape_in_class(*value, v, &mut self.out);
                    for variant in variants {
                        escape_in_class(variant, v, &mut self.out);
                    }
                    self.out.push(']');
                }
            }
            Node::Class(class) => self.class(class, expand_case)?,
            Node::Backreference {
                targets,
                ignore_case,
            } => {
                if expand_case && *ignore_case && self.strict() {
                    return Err(self.needs_target(
                        "case-insensitive backreference in a case-sensitive pattern",
                    ));
                }
                self.backreference(targets)?;
            }
            _ => self.node(node)?,
        }
        Ok(())
    }

    fn backreference(&mut self, targets: &[u32]) -> Result<()> {
        if targets.is_empty() {
            // Orphan: never matches
            self.out.push_str("(?!)");
            return Ok(());
        }
        let mut candidates: BTreeSet<usize> = BTreeSet::new();
        let mut forward = false;
        for target in targets {
            let all = self.emitted.get(target).map(Vec::as_slice).unwrap_or(&[]);
            let before: Vec<usize> = all.iter().copied().filter(|&i| i <= self.opened).collect();
            if before.is_empty() {
                forward = true;
                candidates.extend(all.iter().copied());
            } else {
                candidates.extend(before);
            }
        }
        if forward {
            self.approximate("forward backreference")?;
        }
        if candidates.iter().any(|i| self.open_captures.contains(i)) {
            self.approximate("backreference inside its own group")?;
        }
        if candidates.len() > 1 && targets.len() == 1 {
            self.approximate("backreference to a group called as a subroutine")?;
        }

        let refs: Vec<String> = candidates.iter().rev().map(|i| format!("\\{}", i)).collect();
        match refs.as_slice() {
            [] => self.out.push_str("(?!)"),
            [single] => {
                self.out.push_str(single);
                self.after_backref = true;
            }
            // Most recent group first
            _ => {
                self.out.push_str("(?:");
                self.out.push_str(&refs.join("|"));
                self.out.push(')');
            }
        }
        Ok(())
    }

    fn quantified(
        &mut self,
        body: &Node,
        min: u32,
        max: Option<u32>,
        kind: QuantifierKind,
        after_backref: bool,
    ) -> Result<()> {
        let start = self.out.len();
        self.node(body)?;
        let emitted = &self.out[start..];
        if !scan::is_single_atom(emitted) {
            self.out.insert_str(start, "(?:");
            self.out.push(')');
        } else if after_backref && emitted.starts_with(|c: char| c.is_ascii_digit()) {
            self.out.insert_str(start, "(?:)");
        }
        self.after_backref = false;

        self.out.push_str(&quantifier(min, max));
        match kind {
            QuantifierKind::Greedy => {}
            QuantifierKind::Lazy => self.out.push('?'),
            QuantifierKind::Possessive => self.out.push('+'),
        }
        Ok(())
    }

    fn recursion(&mut self, target: u32) -> Result<()> {
        let depth = self.options.recursion_limit;
        if target == 0 {
            self.out.push_str(&format!("(?R={})", depth));
            return Ok(());
        }
        let Some(&index) = self.primary.get(&target) else {
            return Err(OnigexError::unsupported(format!(
                "recursion into group {}",
                target
            )));
        };
        self.out.push_str(&format!("\\g<{}&R={}>", index, depth));
        Ok(())
    }

    fn class(&mut self, class: &Class, expand_case: bool) -> Result<()> {
        let expand = expand_case && class.ignore_case;
        if expand {
            if let Some(name) = cased_property(class) {
                self.approximate(&format!(
                    "case-insensitive property {} in a case-sensitive pattern",
                    name
                ))?;
            }
        }

        // Single shorthands need no brackets
        if let [item] = class.items.as_slice() {
            let shorthand = match item {
                ClassItem::Property { name, negated } => {
                    Some(property_escape(name, *negated != class.negated))
                }
                ClassItem::Builtin { kind, negated } => {
                    Some(builtin(*kind, *negated != class.negated).to_string())
                }
                _ => None,
            };
            if let Some(shorthand) = shorthand {
                self.out.push_str(&shorthand);
                return Ok(());
            }
        }

        let v = self.options.target.has_unicode_sets();
        let text = self.union_class(class, v, expand)?;
        self.out.push_str(&text);
        Ok(())
    }

    /// Flat bracket classes joined by alternation; nested classes and intersections
    /// become lookarounds so the host never sees a nested set
    fn union_class(&self, class: &Class, v: bool, expand: bool) -> Result<String> {
        let class = unwrap_nested(class);
        let simple: Vec<&ClassItem> = class
            .items
            .iter()
            .filter(|i| !matches!(i, ClassItem::Nested(_) | ClassItem::Intersection(_)))
            .collect();
        let complex: Vec<&ClassItem> = class
            .items
            .iter()
            .filter(|i| matches!(i, ClassItem::Nested(_) | ClassItem::Intersection(_)))
            .collect();

        let mut bracket = String::new();
        for item in &simple {
            self.simple_item(item, v, expand, &mut bracket)?;
        }
        if complex.is_empty() {
            let caret = if class.negated { "^" } else { "" };
            return Ok(format!("[{}{}]", caret, bracket));
        }

        let mut parts = Vec::new();
        if !simple.is_empty() {
            parts.push(format!("[{}]", bracket));
        }
        for item in complex {
            match item {
                ClassItem::Nested(nested) => parts.push(self.union_class(nested, v, expand)?),
                ClassItem::Intersection(operands) => {
                    let mut part = String::new();
                    let Some((last, rest)) = operands.split_last() else {
                        continue;
                    };
                    for operand in rest {
                        part.push_str("(?=");
                        part.push_str(&self.union_class(operand, v, expand)?);
                        part.push(')');
                    }
                    part.push_str(&self.union_class(last, v, expand)?);
                    parts.push(part);
                }
                _ => {}
            }
        }
        let union = if parts.len() == 1 {
            parts.remove(0)
        } else {
            format!("(?:{})", parts.join("|"))
        };
        if class.negated {
            Ok(format!("(?!{})[\\s\\S]", union))
        } else {
            Ok(union)
        }
    }

    /// A char, range, property or shorthand inside brackets
    fn simple_item(&self, item: &ClassItem, v: bool, expand: bool, out: &mut String) -> Result<()> {
        match item {
            ClassItem::Char(c) => {
                escape_in_class(*c, v, out);
                if expand {
                    for variant in case_variants(*c) {
                        escape_in_class(variant, v, out);
                    }
                }
            }
            ClassItem::Range(a, b) => {
                escape_in_class(*a, v, out);
                out.push('-');
                escape_in_class(*b, v, out);
                if expand {
                    for (start, end) in self.range_variants(*a, *b)? {
                        escape_in_class(start, v, out);
                        if end != start {
                            out.push('-');
                            escape_in_class(end, v, out);
                        }
                    }
                }
            }
            ClassItem::Property { name, negated } => out.push_str(&property_escape(name, *negated)),
            ClassItem::Builtin { kind, negated } => out.push_str(builtin(*kind, *negated)),
            ClassItem::Nested(_) | ClassItem::Intersection(_) => {}
        }
        Ok(())
    }

    /// Case variants of a range's members that fall outside it, as ranges
    fn range_variants(&self, a: char, b: char) -> Result<Vec<(char, char)>> {
        const LIMIT: u32 = 0x3000;
        if (b as u32) - (a as u32) > LIMIT {
            self.approximate("case-insensitive range in a case-sensitive pattern")?;
            return Ok(Vec::new());
        }
        let extra: BTreeSet<char> = (a as u32..=b as u32)
            .filter_map(char::from_u32)
            .flat_map(case_variants)
            .filter(|v| !(a..=b).contains(v))
            .collect();
        let mut ranges: Vec<(char, char)> = Vec::new();
        for c in extra {
            match ranges.last_mut() {
                Some((_, end)) if (*end as u32) + 1 == c as u32 => *end = c,
                _ => ranges.push((c, c)),
            }
        }
        Ok(ranges)
    }
}

/// `[[x]]` is `[x]`
fn unwrap_nested(mut class: &Class) -> &Class {
    while let (false, [ClassItem::Nested(inner)]) = (class.negated, class.items.as_slice()) {
        class = inner;
    }
    class
}

fn cased_property(class: &Class) -> Option<&str> {
    class.items.iter().find_map(|item| match item {
        ClassItem::Property { name, .. } if is_cased_property(name) => Some(name.as_str()),
        ClassItem::Nested(nested) => cased_property(nested),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use crate::transform::{TransformConfig, transform};

    fn options(target: Target) -> GenerateOptions {
        GenerateOptions {
            accuracy: Accuracy::Default,
            target,
            recursion_limit: 20,
            verbose: false,
        }
    }

    fn gen_with(pattern: &str, options: &GenerateOptions) -> Result<Generated> {
        let source = parse(pattern, ParseOptions::default())?;
        let config = TransformConfig {
            accuracy: options.accuracy,
            target: options.target,
            ascii_word_boundaries: true,
            avoid_emulation: false,
            singleline: false,
        };
        let ast = transform(&source, &config)?;
        generate(&ast, options)
    }

    fn gen_at(pattern: &str, target: Target) -> Generated {
        gen_with(pattern, &options(target)).unwrap()
    }

    #[test]
    fn test_plain_pattern() {
        let generated = gen_at("a+", Target::Es2018);
        assert_eq!(generated.pattern, "a+");
        assert_eq!(generated.flags, "u");
        assert!(generated.meta.is_empty());
        assert_eq!(gen_at("a+", Target::Es2024).flags, "v");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(gen_at(r"a\.b\/", Target::Es2018).pattern, r"a\.b\/");
        assert_eq!(gen_at(r"\t", Target::Es2018).pattern, r"\t");
    }

    #[test]
    fn test_whole_pattern_ignore_case_uses_flag() {
        let generated = gen_at("(?i)ab1", Target::Es2018);
        assert_eq!(generated.pattern, "ab1");
        assert_eq!(generated.flags, "iu");
    }

    #[test]
    fn test_mixed_case_expands_below_es2025() {
        let generated = gen_at("a(?i)b", Target::Es2024);
        assert_eq!(generated.pattern, "a[bB]");
        assert_eq!(generated.flags, "v");
    }

    #[test]
    fn test_mixed_case_uses_modifiers_at_es2025() {
        let generated = gen_at("a(?i)bc", Target::Es2025);
        assert_eq!(generated.pattern, "a(?i:bc)");
    }

    #[test]
    fn test_dot_all() {
        assert_eq!(gen_at(".", Target::Es2018).pattern, r"[^\n]");
        let generated = gen_at("(?m).", Target::Es2018);
        assert_eq!(generated.pattern, ".");
        assert_eq!(generated.flags, "su");
        assert_eq!(gen_at("(?m:.).", Target::Es2018).pattern, r"[\s\S][^\n]");
    }

    #[test]
    fn test_quantified_body_wrapped() {
        assert_eq!(gen_at("(?:ab)*", Target::Es2018).pattern, "(?:ab)*");
        assert_eq!(gen_at("a{2}?", Target::Es2018).pattern, "(?:a{2})?");
        assert_eq!(gen_at("a{2,}+", Target::Es2018).pattern, "(?:a{2,})+");
        assert_eq!(gen_at("a*?", Target::Es2018).pattern, "a*?");
    }

    #[test]
    fn test_markers_emitted() {
        assert_eq!(gen_at("a++", Target::Es2018).pattern, "a++");
        assert_eq!(gen_at("(?>a|b)", Target::Es2018).pattern, "(?>a|b)");
        assert_eq!(gen_at(r"a\g<0>?b", Target::Es2018).pattern, "a(?R=20)?b");
        assert_eq!(
            gen_at(r"(?<r>a\g<r>?b)", Target::Es2018).pattern,
            r"(?<r>a\g<1&R=20>?b)"
        );
    }

    #[test]
    fn test_subroutine_clone_hidden_and_transferred() {
        let generated = gen_at(r"(?<n>a)\g<n>", Target::Es2018);
        assert_eq!(generated.pattern, "(?<n>a)(a)");
        assert_eq!(generated.meta.hidden, BTreeSet::from([2]));
        assert_eq!(generated.meta.transfers[&1], vec![2]);
    }

    #[test]
    fn test_duplicate_names_emitted_once() {
        let generated = gen_at(r"(?<n>a)|(?<n>b)", Target::Es2018);
        assert_eq!(generated.pattern, "(?<n>a)|(b)");
    }

    #[test]
    fn test_backreferences() {
        assert_eq!(gen_at(r"(a)\1", Target::Es2018).pattern, r"(a)\1");
        assert_eq!(gen_at(r"(a)\1(?:)0", Target::Es2018).pattern, r"(a)\1(?:)0");
        assert_eq!(gen_at(r"(a)\1(?:0)+", Target::Es2018).pattern, r"(a)\1(?:)0+");
        assert_eq!(
            gen_at(r"(?<n>a)(?<n>b)\k<n>", Target::Es2018).pattern,
            r"(?<n>a)(b)(?:\2|\1)"
        );
    }

    #[test]
    fn test_duplicate_name_backref_strict() {
        let strict = GenerateOptions {
            accuracy: Accuracy::Strict,
            ..options(Target::Es2018)
        };
        assert!(gen_with(r"(?<n>a)(?<n>b)\k<n>", &strict).is_err());
    }

    #[test]
    fn test_orphan_backref_never_matches() {
        let source = parse(
            r"\2(a)",
            ParseOptions {
                allow_orphan_backrefs: true,
                ..ParseOptions::default()
            },
        )
        .unwrap();
        let config = TransformConfig {
            accuracy: Accuracy::Default,
            target: Target::Es2018,
            ascii_word_boundaries: true,
            avoid_emulation: false,
            singleline: false,
        };
        let ast = transform(&source, &config).unwrap();
        let generated = generate(&ast, &options(Target::Es2018)).unwrap();
        assert_eq!(generated.pattern, "(?!)(a)");
    }

    #[test]
    fn test_sets() {
        assert_eq!(gen_at(r"\d", Target::Es2018).pattern, r"\p{Nd}");
        assert_eq!(gen_at(r"\D", Target::Es2018).pattern, r"\P{Nd}");
        assert_eq!(gen_at(r"\h", Target::Es2018).pattern, "[0-9A-Fa-f]");
        assert_eq!(gen_at(r"\p{greek}", Target::Es2018).pattern, r"\p{sc=Greek}");
    }

    #[test]
    fn test_class_intersection_uses_lookahead() {
        for target in [Target::Es2018, Target::Es2024, Target::Es2025] {
            assert_eq!(
                gen_at("[a-z&&[^aeiou]]", target).pattern,
                "(?=[a-z])[^aeiou]"
            );
        }
    }

    #[test]
    fn test_nested_intersection_at_every_target() {
        for target in [Target::Es2018, Target::Es2024] {
            assert_eq!(
                gen_at("[a[b-z&&c]]", target).pattern,
                "(?:[a]|(?=[b-z])[c])"
            );
        }
    }

    #[test]
    fn test_negated_nested_class_never_nests() {
        assert_eq!(gen_at("[a[^b]]", Target::Es2018).pattern, "(?:[a]|[^b])");
        assert_eq!(gen_at("[a[^b]]", Target::Es2024).pattern, "(?:[a]|[^b])");
        assert_eq!(gen_at("[^a[^b]]", Target::Es2025).pattern, r"(?!(?:[a]|[^b]))[\s\S]");
    }

    #[test]
    fn test_class_escaping_by_mode() {
        assert_eq!(gen_at("[&-]", Target::Es2018).pattern, r"[&\-]");
        assert_eq!(gen_at("[&-]", Target::Es2024).pattern, r"[\&\-]");
    }

    #[test]
    fn test_case_variants() {
        assert_eq!(case_variants('a'), vec!['A']);
        assert_eq!(case_variants('1'), Vec::<char>::new());
        assert!(case_variants('k').contains(&'K'));
    }
}
