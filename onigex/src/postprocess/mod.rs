//! Postprocessing of generated patterns
//!
//! Three rewrite passes run in a fixed order, each a pure function from a pattern and
//! its capture metadata to a new pattern and metadata:
//! 1. [`recursion`] unrolls bounded recursion. It is the only pass that changes the
//!    repetition structure, so it runs first.
//! 2. [`possessive`] turns possessive quantifiers into atomic groups.
//! 3. [`atomic`] emulates atomic groups with a lookahead capture and a backreference.
//!
//! Passes share nothing but the pattern string and the [`CaptureMeta`] they return.

mod atomic;
mod possessive;
mod recursion;
pub mod scan;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::Result;

pub use atomic::atomic;
pub use possessive::possessive;
pub use recursion::recursion;

/// Capture bookkeeping for an emitted pattern
///
/// All indices are 1-based positions in the emitted pattern's capture order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureMeta {
    /// Captures excluded from user-visible results
    pub hidden: BTreeSet<usize>,
    /// Destination capture -> captures reported under it; the last participating wins
    pub transfers: BTreeMap<usize, Vec<usize>>,
}

impl CaptureMeta {
    /// True when no capture needs filtering or remapping
    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.transfers.is_empty()
    }

    /// Report `source` under `destination`
    pub fn add_transfer(&mut self, destination: usize, source: usize) {
        let sources = self.transfers.entry(destination).or_default();
        if !sources.contains(&source) {
            sources.push(source);
            sources.sort_unstable();
        }
    }

    /// The capture `source` is reported under, if any
    pub fn destination_of(&self, source: usize) -> Option<usize> {
        self.transfers
            .iter()
            .find(|(_, sources)| sources.contains(&source))
            .map(|(destination, _)| *destination)
    }

    /// Carry the metadata over to a renumbered pattern
    ///
    /// `renumber` maps an old index to its new one; indices it drops are dropped.
    fn renumbered(&self, renumber: impl Fn(usize) -> Option<usize>) -> CaptureMeta {
        let mut meta = CaptureMeta {
            hidden: self.hidden.iter().filter_map(|&i| renumber(i)).collect(),
            transfers: BTreeMap::new(),
        };
        for (&destination, sources) in &self.transfers {
            let Some(destination) = renumber(destination) else {
                continue;
            };
            for &source in sources {
                if let Some(source) = renumber(source) {
                    meta.add_transfer(destination, source);
                }
            }
        }
        meta
    }
}

/// A pattern and its metadata after a rewrite pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub pattern: String,
    pub meta: CaptureMeta,
}

/// Run every pass in order
pub fn postprocess(pattern: &str, meta: CaptureMeta) -> Result<Rewritten> {
    let unrolled = recursion(pattern, meta)?;
    let atomized = possessive(&unrolled.pattern, unrolled.meta)?;
    atomic(&atomized.pattern, atomized.meta)
}

/// Identity of a capture that survives renumbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CaptureKey {
    /// Capture `index` of the input pattern; `copy` 0 is the original
    Existing { index: usize, copy: u32 },
    /// The `n`th capture injected by the pass
    Injected(usize),
}

impl CaptureKey {
    fn original(index: usize) -> Self {
        CaptureKey::Existing { index, copy: 0 }
    }
}

/// Output of a pass before captures are numbered
#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Open {
        key: CaptureKey,
        name: Option<String>,
    },
    Backref(CaptureKey),
}

/// Render pieces, numbering captures in order of appearance
fn assemble(pieces: &[Piece]) -> (String, HashMap<CaptureKey, usize>) {
    let mut numbers = HashMap::new();
    for piece in pieces {
        if let Piece::Open { key, .. } = piece {
            let next = numbers.len() + 1;
            numbers.entry(*key).or_insert(next);
        }
    }

    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Open { name: Some(name), .. } => {
                out.push_str("(?<");
                out.push_str(name);
                out.push('>');
            }
            Piece::Open { name: None, .. } => out.push('('),
            Piece::Backref(key) => {
                let number = numbers
                    .get(key)
                    .or_else(|| match key {
                        CaptureKey::Existing { index, .. } => {
                            numbers.get(&CaptureKey::original(*index))
                        }
                        CaptureKey::Injected(_) => None,
                    })
                    .copied()
                    .unwrap_or(0);
                out.push('\\');
                out.push_str(&number.to_string());
                // Keep a following digit from extending the reference
                let next_is_digit = matches!(
                    pieces.get(i + 1),
                    Some(Piece::Text(text)) if text.starts_with(|c: char| c.is_ascii_digit())
                );
                if next_is_digit {
                    out.push_str("(?:)");
                }
            }
        }
    }
    (out, numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_is_empty() {
        assert!(CaptureMeta::default().is_empty());
        let mut meta = CaptureMeta::default();
        meta.hidden.insert(1);
        assert!(!meta.is_empty());
    }

    #[test]
    fn test_add_transfer_dedups_and_sorts() {
        let mut meta = CaptureMeta::default();
        meta.add_transfer(1, 4);
        meta.add_transfer(1, 2);
        meta.add_transfer(1, 4);
        assert_eq!(meta.transfers[&1], vec![2, 4]);
        assert_eq!(meta.destination_of(4), Some(1));
        assert_eq!(meta.destination_of(1), None);
    }

    #[test]
    fn test_assemble_numbers_in_order() {
        let pieces = vec![
            Piece::Open {
                key: CaptureKey::Injected(0),
                name: None,
            },
            Piece::Text("a)".to_string()),
            Piece::Open {
                key: CaptureKey::original(1),
                name: Some("n".to_string()),
            },
            Piece::Text("b)".to_string()),
            Piece::Backref(CaptureKey::original(1)),
            Piece::Text("0".to_string()),
        ];
        let (pattern, numbers) = assemble(&pieces);
        assert_eq!(pattern, r"(a)(?<n>b)\2(?:)0");
        assert_eq!(numbers[&CaptureKey::Injected(0)], 1);
    }

    #[test]
    fn test_postprocess_plain_pattern_unchanged() {
        let result = postprocess("a(b)c", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, "a(b)c");
        assert!(result.meta.is_empty());
    }

    #[test]
    fn test_postprocess_order() {
        let result = postprocess("a++", CaptureMeta::default()).unwrap();
        assert_eq!(result.pattern, r"(?:(?=(a+))\1)");
        assert_eq!(result.meta.hidden, BTreeSet::from([1]));
    }
}
