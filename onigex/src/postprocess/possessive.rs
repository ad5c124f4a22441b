//! Possessive quantifier emulation: `X*+` becomes `(?>X*)`

use super::scan::{self, TokenKind};
use super::{CaptureMeta, Rewritten};
use crate::error::{OnigexError, Result};

/// Rewrite every possessive quantifier as an atomic group around a greedy one
///
/// Capture numbering is unchanged, so `meta` passes through.
pub fn possessive(pattern: &str, meta: CaptureMeta) -> Result<Rewritten> {
    let tokens = scan::tokenize(pattern)?;
    let mut opens = vec![0usize; tokens.len()];
    let mut closes = vec![0usize; tokens.len()];
    let mut found = false;

    for (i, token) in tokens.iter().enumerate() {
        if token.kind != (TokenKind::Quantifier { possessive: true }) {
            continue;
        }
        let start = i
            .checked_sub(1)
            .and_then(|prev| match tokens[prev].kind {
                TokenKind::Close => scan::matching_open(&tokens, prev),
                _ => Some(prev),
            })
            .ok_or_else(|| OnigexError::syntax("quantifier without a target", i))?;
        opens[start] += 1;
        closes[i] += 1;
        found = true;
    }
    if !found {
        return Ok(Rewritten {
            pattern: pattern.to_string(),
            meta,
        });
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    for (i, token) in tokens.iter().enumerate() {
        out.push_str(&"(?>".repeat(opens[i]));
        if closes[i] > 0 {
            // Drop the possessive `+`
            out.push_str(&token.text[..token.text.len() - 1]);
        } else {
            out.push_str(&token.text);
        }
        out.push_str(&")".repeat(closes[i]));
    }
    Ok(Rewritten { pattern: out, meta })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(pattern: &str) -> String {
        possessive(pattern, CaptureMeta::default()).unwrap().pattern
    }

    #[test]
    fn test_possessive_atom() {
        assert_eq!(rewrite("a*+b"), "(?>a*)b");
        assert_eq!(rewrite("a?+"), "(?>a?)");
        assert_eq!(rewrite(r"\d{2,3}+"), r"(?>\d{2,3})");
    }

    #[test]
    fn test_possessive_group() {
        assert_eq!(rewrite("(ab)++c"), "(?>(ab)+)c");
        assert_eq!(rewrite("(?:a++)++"), "(?>(?:(?>a+))+)");
    }

    #[test]
    fn test_greedy_and_lazy_untouched() {
        assert_eq!(rewrite("a*b+?c?"), "a*b+?c?");
    }

    #[test]
    fn test_meta_passes_through() {
        let mut meta = CaptureMeta::default();
        meta.hidden.insert(2);
        let result = possessive("(a)(b)++", meta.clone()).unwrap();
        assert_eq!(result.pattern, "(a)(?>(b)+)");
        assert_eq!(result.meta, meta);
    }

    #[test]
    fn test_dangling_possessive_is_error() {
        assert!(possessive("++", CaptureMeta::default()).is_err());
    }
}
