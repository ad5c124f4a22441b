//! Bounded recursion emulation
//!
//! `(?R=N)` recurses into the whole pattern and `\g<ref&R=N>` into the group `ref`
//! that contains it. The recursed region is unrolled `N` levels deep, each level
//! nesting the next in place of the marker, and the deepest marker becomes a class
//! that never matches. Captures in levels below the first are hidden and reported
//! under the capture they were copied from.

use super::scan::{self, GroupRef, Token, TokenKind};
use super::{CaptureKey, CaptureMeta, Piece, Rewritten, assemble};
use crate::error::{OnigexError, Result};

/// Never matches; quantifiable in every target
const NEVER: &str = r"[^\s\S]";

struct Unroller<'a> {
    tokens: &'a [Token],
    /// Capture index of each token that opens a capture
    capture_at: Vec<Option<usize>>,
    /// Token range of the recursed region
    region: (usize, usize),
    /// Capture indices inside the region
    region_captures: (usize, usize),
    marker: usize,
    depth: u32,
}

/// Unroll the pattern's recursion marker, if it has one
///
/// # Errors
/// `UnsupportedFeature` for more than one marker, `Syntax` for a marker referencing a
/// group that does not exist or does not contain it.
pub fn recursion(pattern: &str, meta: CaptureMeta) -> Result<Rewritten> {
    let tokens = scan::tokenize(pattern)?;
    let markers: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            matches!(
                t.kind,
                TokenKind::Recursion { .. } | TokenKind::GroupRecursion { .. }
            )
        })
        .map(|(i, _)| i)
        .collect();
    let marker = match markers.as_slice() {
        [] => {
            return Ok(Rewritten {
                pattern: pattern.to_string(),
                meta,
            });
        }
        [marker] => *marker,
        _ => {
            return Err(OnigexError::unsupported(
                "more than one recursive reference",
            ));
        }
    };

    let mut capture_at = Vec::with_capacity(tokens.len());
    let mut count = 0;
    for token in &tokens {
        if let TokenKind::CaptureOpen { .. } = token.kind {
            count += 1;
            capture_at.push(Some(count));
        } else {
            capture_at.push(None);
        }
    }

    let (region, depth) = match &tokens[marker].kind {
        TokenKind::Recursion { depth } => ((0, tokens.len()), *depth),
        TokenKind::GroupRecursion { target, depth } => {
            (group_region(&tokens, &capture_at, target, marker)?, *depth)
        }
        _ => return Err(OnigexError::syntax("invalid recursion marker", marker)),
    };
    if depth < 1 {
        return Err(OnigexError::syntax("recursion depth must be positive", marker));
    }

    let first = capture_at[region.0..region.1].iter().flatten().min().copied();
    let last = capture_at[region.0..region.1].iter().flatten().max().copied();
    let unroller = Unroller {
        tokens: &tokens,
        capture_at,
        region,
        region_captures: (first.unwrap_or(1), last.unwrap_or(0)),
        marker,
        depth,
    };

    let mut pieces = Vec::new();
    unroller.copy(0..region.0, 0, &mut pieces);
    unroller.level(1, &mut pieces);
    unroller.copy(region.1..tokens.len(), 0, &mut pieces);
    let (pattern, numbers) = assemble(&pieces);

    let mut updated = meta.renumbered(|i| numbers.get(&CaptureKey::original(i)).copied());
    for copy in 1..depth {
        for index in unroller.region_captures.0..=unroller.region_captures.1 {
            let Some(&new_index) = numbers.get(&CaptureKey::Existing { index, copy }) else {
                continue;
            };
            updated.hidden.insert(new_index);
            let destination = match meta.destination_of(index) {
                Some(destination) => Some(destination),
                None if meta.hidden.contains(&index) => None,
                None => Some(index),
            };
            if let Some(destination) = destination
                .and_then(|d| numbers.get(&CaptureKey::original(d)).copied())
            {
                updated.add_transfer(destination, new_index);
            }
        }
    }
    Ok(Rewritten {
        pattern,
        meta: updated,
    })
}

/// Tokens strictly inside the group targeted by `\g<ref&R=N>`
fn group_region(
    tokens: &[Token],
    capture_at: &[Option<usize>],
    target: &GroupRef,
    marker: usize,
) -> Result<(usize, usize)> {
    let open = tokens.iter().enumerate().position(|(i, token)| match target {
        GroupRef::Number(n) => capture_at[i] == Some(*n),
        GroupRef::Name(name) => {
            matches!(&token.kind, TokenKind::CaptureOpen { name: Some(found) } if found == name)
        }
    });
    let Some(open) = open else {
        return Err(OnigexError::syntax("recursion into an undefined group", marker));
    };
    let close = scan::matching_close(tokens, open)
        .ok_or_else(|| OnigexError::syntax("unclosed group", open))?;
    if !(open < marker && marker < close) {
        return Err(OnigexError::syntax(
            "recursion marker outside its group",
            marker,
        ));
    }
    Ok((open + 1, close))
}

impl Unroller<'_> {
    /// Emit recursion level `level` (1-based) of the region
    fn level(&self, level: u32, pieces: &mut Vec<Piece>) {
        let copy = level - 1;
        self.copy(self.region.0..self.marker, copy, pieces);
        if level < self.depth {
            pieces.push(Piece::Text("(?:".to_string()));
            self.level(level + 1, pieces);
            pieces.push(Piece::Text(")".to_string()));
        } else {
            pieces.push(Piece::Text(NEVER.to_string()));
        }
        self.copy(self.marker + 1..self.region.1, copy, pieces);
    }

    fn in_region(&self, index: usize) -> bool {
        (self.region_captures.0..=self.region_captures.1).contains(&index)
    }

    fn copy(&self, range: std::ops::Range<usize>, copy: u32, pieces: &mut Vec<Piece>) {
        for i in range {
            let token = &self.tokens[i];
            match &token.kind {
                TokenKind::CaptureOpen { name } => {
                    let index = self.capture_at[i].unwrap_or(0);
                    pieces.push(Piece::Open {
                        key: CaptureKey::Existing { index, copy },
                        // Names must stay unique
                        name: if copy == 0 { name.clone() } else { None },
                    });
                }
                TokenKind::Backref(index) => {
                    let copy = if self.in_region(*index) { copy } else { 0 };
                    pieces.push(Piece::Backref(CaptureKey::Existing {
                        index: *index,
                        copy,
                    }));
                }
                _ => pieces.push(Piece::Text(token.text.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_no_marker_is_identity() {
        let result = recursion("(a)b", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, "(a)b");
        assert!(result.meta.is_empty());
    }

    #[test]
    fn test_whole_pattern_recursion() {
        let result = recursion("a(?R=3)?b", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, r"a(?:a(?:a[^\s\S]?b)?b)?b");
        assert!(result.meta.is_empty());
    }

    #[test]
    fn test_depth_grows_pattern() {
        let short = recursion("a(?R=2)?b", CaptureMeta::default()).unwrap();
        let long = recursion("a(?R=6)?b", CaptureMeta::default()).unwrap();
        assert!(long.pattern.len() > short.pattern.len());
    }

    #[test]
    fn test_group_recursion() {
        let result = recursion(r"x(?<r>a\g<r&R=2>?b)y", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, r"x(?<r>a(?:a[^\s\S]?b)?b)y");
        assert!(result.meta.is_empty());
    }

    #[test]
    fn test_captures_in_copies_hidden_and_transferred() {
        let result = recursion("(a)(?R=2)?", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, r"(a)(?:(a)[^\s\S]?)?");
        assert_eq!(result.meta.hidden, BTreeSet::from([2]));
        assert_eq!(result.meta.transfers[&1], vec![2]);
    }

    #[test]
    fn test_backrefs_follow_their_copy() {
        let result = recursion(r"(a)\1(?R=2)?", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, r"(a)\1(?:(a)\2[^\s\S]?)?");
    }

    #[test]
    fn test_captures_after_region_renumbered() {
        let result = recursion(r"(?<r>(a)\g<r&R=2>?)(b)\3", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, r"(?<r>(a)(?:(a)[^\s\S]?)?)(b)\4");
        assert_eq!(result.meta.hidden, BTreeSet::from([3]));
        assert_eq!(result.meta.transfers[&2], vec![3]);
    }

    #[test]
    fn test_multiple_markers_unsupported() {
        assert!(recursion("(?R=2)(?R=2)", CaptureMeta::default()).is_err());
    }

    #[test]
    fn test_marker_outside_group_is_error() {
        assert!(recursion(r"(a)\g<1&R=2>", CaptureMeta::default()).is_err());
    }
}
