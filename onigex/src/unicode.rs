//! Unicode property and POSIX class tables
//!
//! Oniguruma matches property names loosely (case, spaces, hyphens and underscores
//! are ignored); the host engine requires canonical names. Unknown names are treated
//! as script names.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Canonical names of general categories and binary properties the host accepts
const PROPERTY_NAMES: &[&str] = &[
    // General categories (long and short forms)
    "C", "Other", "Cc", "Control", "Cf", "Format", "Cn", "Unassigned", "Co",
    "Private_Use", "Cs", "Surrogate", "L", "Letter", "LC", "Cased_Letter", "Ll",
    "Lowercase_Letter", "Lm", "Modifier_Letter", "Lo", "Other_Letter", "Lt",
    "Titlecase_Letter", "Lu", "Uppercase_Letter", "M", "Mark", "Mc", "Spacing_Mark",
    "Me", "Enclosing_Mark", "Mn", "Nonspacing_Mark", "N", "Number", "Nd",
    "Decimal_Number", "Nl", "Letter_Number", "No", "Other_Number", "P", "Punctuation",
    "Pc", "Connector_Punctuation", "Pd", "Dash_Punctuation", "Pe", "Close_Punctuation",
    "Pf", "Final_Punctuation", "Pi", "Initial_Punctuation", "Po", "Other_Punctuation",
    "Ps", "Open_Punctuation", "S", "Symbol", "Sc", "Currency_Symbol", "Sk",
    "Modifier_Symbol", "Sm", "Math_Symbol", "So", "Other_Symbol", "Z", "Separator",
    "Zl", "Line_Separator", "Zp", "Paragraph_Separator", "Zs", "Space_Separator",
    // Binary properties
    "ASCII", "ASCII_Hex_Digit", "Alphabetic", "Any", "Assigned", "Bidi_Control",
    "Case_Ignorable", "Cased", "Dash", "Default_Ignorable_Code_Point", "Deprecated",
    "Diacritic", "Emoji", "Emoji_Component", "Emoji_Modifier", "Emoji_Presentation",
    "Extended_Pictographic", "Extender", "Hex_Digit", "ID_Continue", "ID_Start",
    "Ideographic", "Join_Control", "Lowercase", "Math", "Noncharacter_Code_Point",
    "Pattern_Syntax", "Pattern_White_Space", "Quotation_Mark", "Radical",
    "Regional_Indicator", "Sentence_Terminal", "Soft_Dotted", "Terminal_Punctuation",
    "Unified_Ideograph", "Uppercase", "Variation_Selector", "White_Space", "XID_Continue",
    "XID_Start",
];

/// Oniguruma aliases that differ from the host names
const ALIASES: &[(&str, &str)] = &[
    ("alpha", "Alphabetic"),
    ("upper", "Uppercase"),
    ("lower", "Lowercase"),
    ("space", "White_Space"),
    ("xdigit", "Hex_Digit"),
    ("punct", "P"),
    ("cntrl", "Cc"),
];

static CANONICAL: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    let mut map: HashMap<String, &'static str> = PROPERTY_NAMES
        .iter()
        .map(|name| (loose_key(name), *name))
        .collect();
    for (alias, name) in ALIASES {
        map.insert(loose_key(alias), name);
    }
    map
});

/// Lowercase with spaces, hyphens and underscores removed
pub fn loose_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Host-engine property expression body for an Oniguruma property name
///
/// Returns e.g. `L`, `Alphabetic` or `sc=Greek`.
pub fn property_expression(name: &str) -> String {
    if let Some(canonical) = CANONICAL.get(&loose_key(name)) {
        return (*canonical).to_string();
    }
    if let Some((key, value)) = name.split_once('=') {
        return format!("{}={}", key.trim(), script_name(value.trim()));
    }
    format!("sc={}", script_name(name))
}

/// `old_italic` -> `Old_Italic`
fn script_name(name: &str) -> String {
    name.split(['_', ' ', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("_")
}

/// How faithfully a POSIX class maps to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    Exact,
    Approximate,
}

/// A member of a POSIX class definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosixPart {
    Range(char, char),
    /// Canonical property name
    Property(&'static str),
}

/// Definition of a POSIX bracket class in terms of host primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixClass {
    /// The class is the complement of `parts`
    pub negated: bool,
    pub parts: &'static [PosixPart],
    pub fidelity: Fidelity,
}

const fn posix(negated: bool, parts: &'static [PosixPart], fidelity: Fidelity) -> PosixClass {
    PosixClass {
        negated,
        parts,
        fidelity,
    }
}

/// Look up a POSIX bracket name (`alpha`, `digit`, ...)
///
/// `ascii` selects the ASCII definition. Returns `None` for an unknown name.
pub fn posix_class(name: &str, ascii: bool) -> Option<PosixClass> {
    use Fidelity::*;
    use PosixPart::*;
    const WORD: &[PosixPart] = &[Property("L"), Property("M"), Property("N"), Property("Pc")];
    const HEX: &[PosixPart] = &[Range('0', '9'), Range('A', 'F'), Range('a', 'f')];
    const ASCII: &[PosixPart] = &[Range('\0', '\x7F')];

    let class = if ascii {
        match name {
            "alnum" => posix(false, &[Range('0', '9'), Range('A', 'Z'), Range('a', 'z')], Exact),
            "alpha" => posix(false, &[Range('A', 'Z'), Range('a', 'z')], Exact),
            "ascii" => posix(false, ASCII, Exact),
            "blank" => posix(false, &[Range('\t', '\t'), Range(' ', ' ')], Exact),
            "cntrl" => posix(false, &[Range('\0', '\x1F'), Range('\x7F', '\x7F')], Exact),
            "digit" => posix(false, &[Range('0', '9')], Exact),
            "graph" => posix(false, &[Range('!', '~')], Exact),
            "lower" => posix(false, &[Range('a', 'z')], Exact),
            "print" => posix(false, &[Range(' ', '~')], Exact),
            "punct" => posix(
                false,
                &[Range('!', '/'), Range(':', '@'), Range('[', '`'), Range('{', '~')],
                Exact,
            ),
            "space" => posix(false, &[Range('\t', '\r'), Range(' ', ' ')], Exact),
            "upper" => posix(false, &[Range('A', 'Z')], Exact),
            "word" => posix(false, &[Range('0', '9'), Range('A', 'Z'), Range('_', '_'), Range('a', 'z')], Exact),
            "xdigit" => posix(false, HEX, Exact),
            _ => return None,
        }
    } else {
        match name {
            "alnum" => posix(false, &[Property("Alphabetic"), Property("Nd")], Exact),
            "alpha" => posix(false, &[Property("Alphabetic")], Exact),
            "ascii" => posix(false, ASCII, Exact),
            "blank" => posix(false, &[Property("Zs"), Range('\t', '\t')], Exact),
            "cntrl" => posix(false, &[Property("Cc")], Exact),
            "digit" => posix(false, &[Property("Nd")], Exact),
            "graph" => posix(
                true,
                &[Property("White_Space"), Property("Cc"), Property("Cn"), Property("Cs")],
                Approximate,
            ),
            "lower" => posix(false, &[Property("Lowercase")], Exact),
            "print" => posix(true, &[Property("Cc"), Property("Cn"), Property("Cs")], Approximate),
            "punct" => posix(false, &[Property("P")], Exact),
            "space" => posix(false, &[Property("White_Space")], Exact),
            "upper" => posix(false, &[Property("Uppercase")], Exact),
            "word" => posix(false, WORD, Exact),
            "xdigit" => posix(false, HEX, Exact),
            _ => return None,
        }
    };
    Some(class)
}
