//! Atomic group emulation
//!
//! `(?>X)` becomes `(?:(?=(X))\N)`: the lookahead captures what `X` matches first,
//! and the backreference consumes exactly that text without any way to backtrack
//! into `X`. Each rewrite injects one hidden capture, so later captures and their
//! backreferences are renumbered.

use super::scan::{self, TokenKind};
use super::{CaptureKey, CaptureMeta, Piece, Rewritten, assemble};
use crate::error::{OnigexError, Result};

enum Open {
    Atomic(usize),
    Other,
}

/// Rewrite every atomic group, injecting and hiding one capture per group
pub fn atomic(pattern: &str, meta: CaptureMeta) -> Result<Rewritten> {
    let tokens = scan::tokenize(pattern)?;
    if !tokens.iter().any(|t| t.kind == TokenKind::AtomicOpen) {
        return Ok(Rewritten {
            pattern: pattern.to_string(),
            meta,
        });
    }

    let mut pieces = Vec::with_capacity(tokens.len() + 8);
    let mut stack = Vec::new();
    let mut captures = 0;
    let mut injected = 0;

    for (i, token) in tokens.into_iter().enumerate() {
        match token.kind {
            TokenKind::AtomicOpen => {
                pieces.push(Piece::Text("(?:(?=".to_string()));
                pieces.push(Piece::Open {
                    key: CaptureKey::Injected(injected),
                    name: None,
                });
                stack.push(Open::Atomic(injected));
                injected += 1;
            }
            TokenKind::CaptureOpen { name } => {
                captures += 1;
                pieces.push(Piece::Open {
                    key: CaptureKey::original(captures),
                    name,
                });
                stack.push(Open::Other);
            }
            TokenKind::GroupOpen | TokenKind::LookAroundOpen => {
                pieces.push(Piece::Text(token.text));
                stack.push(Open::Other);
            }
            TokenKind::Close => match stack.pop() {
                Some(Open::Atomic(n)) => {
                    pieces.push(Piece::Text("))".to_string()));
                    pieces.push(Piece::Backref(CaptureKey::Injected(n)));
                    pieces.push(Piece::Text(")".to_string()));
                }
                Some(Open::Other) => pieces.push(Piece::Text(token.text)),
                None => return Err(OnigexError::syntax("unmatched ')'", i)),
            },
            TokenKind::Backref(n) => pieces.push(Piece::Backref(CaptureKey::original(n))),
            _ => pieces.push(Piece::Text(token.text)),
        }
    }
    if !stack.is_empty() {
        return Err(OnigexError::syntax("unclosed group", pattern.chars().count()));
    }

    let (pattern, numbers) = assemble(&pieces);
    let mut meta = meta.renumbered(|i| numbers.get(&CaptureKey::original(i)).copied());
    for n in 0..injected {
        if let Some(&index) = numbers.get(&CaptureKey::Injected(n)) {
            meta.hidden.insert(index);
        }
    }
    Ok(Rewritten { pattern, meta })
}
