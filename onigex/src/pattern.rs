//! Match-time pattern objects
//!
//! [`Pattern`] is the interface callers program against. [`NativePattern`] passes
//! straight through to `regress`; [`EmulatedPattern`] adds the bookkeeping that the
//! emitted pattern alone cannot express: hidden captures, capture transfers, a
//! whole-pattern strategy and deferred compilation.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::OnceCell;
use regress::Regex;

use crate::details::{CompiledDetails, EmulationConfig};
use crate::error::{OnigexError, Result};
use crate::ir::Strategy;
use crate::postprocess::scan;

/// A successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    /// Byte range of the whole match
    pub start: usize,
    pub end: usize,
    /// User-visible capture groups, 1-based in declaration order
    groups: Vec<Option<Range<usize>>>,
    names: Arc<[Option<String>]>,
}

impl Captures {
    /// The matched text
    pub fn as_str<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }

    /// Range of a group by number; 0 is the whole match
    pub fn group(&self, n: usize) -> Option<Range<usize>> {
        if n == 0 {
            return Some(self.start..self.end);
        }
        self.groups.get(n - 1).cloned().flatten()
    }

    /// Range of a named group
    pub fn named_group(&self, name: &str) -> Option<Range<usize>> {
        let index = self
            .names
            .iter()
            .position(|n| n.as_deref() == Some(name))?;
        self.group(index + 1)
    }

    /// Text of a group by number
    pub fn group_str<'a>(&self, input: &'a str, n: usize) -> Option<&'a str> {
        self.group(n).map(|range| &input[range])
    }

    /// Text of a named group
    pub fn named_group_str<'a>(&self, input: &'a str, name: &str) -> Option<&'a str> {
        self.named_group(name).map(|range| &input[range])
    }

    /// Number of capture groups, excluding the whole match
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Capture groups in order, excluding the whole match
    pub fn iter(&self) -> impl Iterator<Item = Option<Range<usize>>> + '_ {
        self.groups.iter().cloned()
    }
}

/// A compiled pattern with the host engine's match contract
pub trait Pattern: fmt::Debug + Send + Sync {
    /// Emitted pattern text
    fn source(&self) -> &str;

    /// Flag string, including `d` and `g` when requested
    fn flags(&self) -> &str;

    /// Number of user-visible capture groups
    fn captures_len(&self) -> usize;

    /// Names of the user-visible capture groups, in order
    fn capture_names(&self) -> Vec<Option<String>>;

    /// Leftmost match starting at or after byte offset `start`
    ///
    /// An offset past the end or inside a character finds nothing.
    ///
    /// # Errors
    /// `Compile` when a deferred compilation fails.
    fn find_at(&self, text: &str, start: usize) -> Result<Option<Captures>>;

    /// Resume position used by global matching
    fn last_index(&self) -> usize;

    fn set_last_index(&self, index: usize);

    fn is_global(&self) -> bool {
        self.flags().contains('g')
    }

    /// Match like the host engine's `exec`
    ///
    /// Global patterns search from [`Pattern::last_index`] and move it to the match end,
    /// or reset it to 0 when nothing matches.
    fn exec(&self, text: &str) -> Result<Option<Captures>> {
        if !self.is_global() {
            return self.find_at(text, 0);
        }
        let start = self.last_index();
        if !is_search_start(text, start) {
            self.set_last_index(0);
            return Ok(None);
        }
        let found = self.find_at(text, start)?;
        self.set_last_index(found.as_ref().map_or(0, |m| m.end));
        Ok(found)
    }

    /// Whether [`Pattern::exec`] finds a match
    fn test(&self, text: &str) -> Result<bool> {
        Ok(self.exec(text)?.is_some())
    }

    /// Every non-overlapping match, ignoring and not touching `last_index`
    fn find_all(&self, text: &str) -> Result<Vec<Captures>> {
        let mut matches = Vec::new();
        let mut position = 0;
        while position <= text.len() {
            let Some(found) = self.find_at(text, position)? else {
                break;
            };
            position = if found.end == found.start {
                // Step over empty matches one character at a time
                match text[found.end..].chars().next() {
                    Some(c) => found.end + c.len_utf8(),
                    None => text.len() + 1,
                }
            } else {
                found.end
            };
            matches.push(found);
        }
        Ok(matches)
    }
}

/// Flags understood by `regress`; `d` and `g` are handled here
fn is_search_start(text: &str, start: usize) -> bool {
    text.is_char_boundary(start)
}

fn engine_flags(flags: &str) -> String {
    flags.chars().filter(|c| "imsuv".contains(*c)).collect()
}

fn compile(pattern: &str, flags: &str) -> Result<Regex> {
    Regex::with_flags(pattern, engine_flags(flags).as_str())
        .map_err(|e| OnigexError::Compile(e.to_string()))
}

fn names_of(pattern: &str) -> Result<Vec<Option<String>>> {
    scan::capture_names(pattern)
}

/// Pass-through wrapper around a natively compiled pattern
pub struct NativePattern {
    source: String,
    flags: String,
    regex: Regex,
    names: Arc<[Option<String>]>,
    last_index: AtomicUsize,
}

impl NativePattern {
    /// Compile `pattern` with `flags`
    pub fn new(pattern: &str, flags: &str) -> Result<Self> {
        Ok(NativePattern {
            source: pattern.to_string(),
            flags: flags.to_string(),
            regex: compile(pattern, flags)?,
            names: names_of(pattern)?.into(),
            last_index: AtomicUsize::new(0),
        })
    }
}

impl fmt::Debug for NativePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativePattern")
            .field("source", &self.source)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Pattern for NativePattern {
    fn source(&self) -> &str {
        &self.source
    }

    fn flags(&self) -> &str {
        &self.flags
    }

    fn captures_len(&self) -> usize {
        self.names.len()
    }

    fn capture_names(&self) -> Vec<Option<String>> {
        self.names.to_vec()
    }

    fn find_at(&self, text: &str, start: usize) -> Result<Option<Captures>> {
        if !is_search_start(text, start) {
            return Ok(None);
        }
        let Some(found) = self.regex.find_from(text, start).next() else {
            return Ok(None);
        };
        let range = found.range();
        Ok(Some(Captures {
            start: range.start,
            end: range.end,
            groups: (1..=self.names.len()).map(|i| found.group(i)).collect(),
            names: Arc::clone(&self.names),
        }))
    }

    fn last_index(&self) -> usize {
        self.last_index.load(Ordering::Relaxed)
    }

    fn set_last_index(&self, index: usize) {
        self.last_index.store(index, Ordering::Relaxed);
    }
}

/// Pattern that rewrites match results to hide emulation details
pub struct EmulatedPattern {
    source: String,
    flags: String,
    config: EmulationConfig,
    regex: OnceCell<Regex>,
    /// Emitted index of each user-visible capture
    visible: Vec<usize>,
    /// Emitted indices reported under each visible capture
    sources: HashMap<usize, Vec<usize>>,
    names: Arc<[Option<String>]>,
    last_index: AtomicUsize,
}

impl EmulatedPattern {
    /// Build the wrapper, compiling right away unless compilation is deferred
    ///
    /// # Errors
    /// `Compile` when the host engine rejects the pattern, `Syntax` when the pattern's
    /// groups cannot be scanned.
    pub fn new(pattern: &str, flags: &str, config: EmulationConfig) -> Result<Self> {
        let all_names = names_of(pattern)?;
        let visible: Vec<usize> = (1..=all_names.len())
            .filter(|i| !config.hidden_captures.contains(i))
            .collect();
        let names: Vec<Option<String>> = visible
            .iter()
            .map(|&i| all_names[i - 1].clone())
            .collect();
        let sources = config.transfers.iter().cloned().collect();

        let regex = OnceCell::new();
        if !config.lazy_compile {
            regex
                .set(compile(pattern, flags)?)
                .map_err(|_| OnigexError::Compile("pattern compiled twice".to_string()))?;
        }

        Ok(EmulatedPattern {
            source: pattern.to_string(),
            flags: flags.to_string(),
            config,
            regex,
            visible,
            sources,
            names: names.into(),
            last_index: AtomicUsize::new(0),
        })
    }

    /// Emulation settings this pattern was built with
    pub fn config(&self) -> &EmulationConfig {
        &self.config
    }

    /// Whether the underlying pattern has been compiled
    pub fn is_compiled(&self) -> bool {
        self.regex.get().is_some()
    }

    fn regex(&self) -> Result<&Regex> {
        self.regex
            .get_or_try_init(|| compile(&self.source, &self.flags))
    }

    /// Visible captures of a raw match
    fn visible_groups(&self, found: &regress::Match) -> Vec<Option<Range<usize>>> {
        self.visible
            .iter()
            .map(|&index| {
                let own = found.group(index);
                let transferred = self
                    .sources
                    .get(&index)
                    .into_iter()
                    .flatten()
                    .filter_map(|&source| found.group(source).map(|range| (source, range)));
                // The participating group with the highest index matched last
                own.map(|range| (index, range))
                    .into_iter()
                    .chain(transferred)
                    .max_by_key(|(i, _)| *i)
                    .map(|(_, range)| range)
            })
            .collect()
    }

    /// Whether a match at `at` is acceptable under the strategy
    fn accepts(&self, text: &str, search_start: usize, at: usize) -> bool {
        match self.config.strategy {
            None => true,
            Some(Strategy::SearchStart) => at == search_start,
            Some(Strategy::NotSearchStart) => at != search_start,
            Some(Strategy::LineOrSearchStart) => {
                at == search_start || at == 0 || text[..at].ends_with('\n')
            }
            Some(Strategy::StringOrSearchStart) => at == search_start || at == 0,
        }
    }
}

impl fmt::Debug for EmulatedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedPattern")
            .field("source", &self.source)
            .field("flags", &self.flags)
            .field("config", &self.config)
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

impl Pattern for EmulatedPattern {
    fn source(&self) -> &str {
        &self.source
    }

    fn flags(&self) -> &str {
        &self.flags
    }

    fn captures_len(&self) -> usize {
        self.visible.len()
    }

    fn capture_names(&self) -> Vec<Option<String>> {
        self.names.to_vec()
    }

    fn find_at(&self, text: &str, start: usize) -> Result<Option<Captures>> {
        let regex = self.regex()?;
        if !is_search_start(text, start) {
            return Ok(None);
        }
        let mut position = start;
        while position <= text.len() {
            let Some(found) = regex.find_from(text, position).next() else {
                return Ok(None);
            };
            let range = found.range();
            if self.accepts(text, start, range.start) {
                return Ok(Some(Captures {
                    start: range.start,
                    end: range.end,
                    groups: self.visible_groups(&found),
                    names: Arc::clone(&self.names),
                }));
            }
            if self.config.strategy == Some(Strategy::SearchStart) {
                return Ok(None);
            }
            // Retry from the next character after the rejected start
            position = match text[range.start..].chars().next() {
                Some(c) => range.start + c.len_utf8(),
                None => return Ok(None),
            };
        }
        Ok(None)
    }

    fn last_index(&self) -> usize {
        self.last_index.load(Ordering::Relaxed)
    }

    fn set_last_index(&self, index: usize) {
        self.last_index.store(index, Ordering::Relaxed);
    }
}

/// Build the pattern object for compiled details
pub fn from_details(details: CompiledDetails) -> Result<Box<dyn Pattern>> {
    match details.options {
        None => Ok(Box::new(NativePattern::new(&details.pattern, &details.flags)?)),
        Some(config) => Ok(Box::new(EmulatedPattern::new(
            &details.pattern,
            &details.flags,
            config,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emulated(pattern: &str, config: EmulationConfig) -> EmulatedPattern {
        EmulatedPattern::new(pattern, "u", config).unwrap()
    }

    #[test]
    fn test_native_find() {
        let pattern = NativePattern::new("(?<x>b)(c)?", "u").unwrap();
        let found = pattern.find_at("abd", 0).unwrap().unwrap();
        assert_eq!((found.start, found.end), (1, 2));
        assert_eq!(found.named_group_str("abd", "x"), Some("b"));
        assert_eq!(found.group(2), None);
        assert_eq!(pattern.capture_names(), vec![Some("x".to_string()), None]);
    }

    #[test]
    fn test_engine_flags_drop_d_and_g() {
        assert_eq!(engine_flags("dgiu"), "iu");
    }

    #[test]
    fn test_compile_error() {
        assert!(matches!(
            NativePattern::new("a**", "u"),
            Err(OnigexError::Compile(_))
        ));
    }

    #[test]
    fn test_hidden_captures_filtered() {
        let config = EmulationConfig {
            hidden_captures: vec![1],
            ..EmulationConfig::default()
        };
        let pattern = emulated(r"(?:(?=(a+))\1)(b)", config);
        assert_eq!(pattern.captures_len(), 1);
        let found = pattern.find_at("aab", 0).unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.group_str("aab", 1), Some("b"));
    }

    #[test]
    fn test_transfers_report_last_participant() {
        let config = EmulationConfig {
            hidden_captures: vec![2],
            transfers: vec![(1, vec![2])],
            ..EmulationConfig::default()
        };
        let pattern = emulated("(?<n>a)(b)", config);
        let found = pattern.find_at("ab", 0).unwrap().unwrap();
        assert_eq!(found.named_group_str("ab", "n"), Some("b"));

        let config = EmulationConfig {
            hidden_captures: vec![2],
            transfers: vec![(1, vec![2])],
            ..EmulationConfig::default()
        };
        let pattern = emulated("(a)(b)?", config);
        let found = pattern.find_at("a", 0).unwrap().unwrap();
        assert_eq!(found.group_str("a", 1), Some("a"));
    }

    #[test]
    fn test_search_start_strategy() {
        let config = EmulationConfig {
            strategy: Some(Strategy::SearchStart),
            ..EmulationConfig::default()
        };
        let pattern = emulated("a", config);
        assert!(pattern.find_at("ba", 0).unwrap().is_none());
        assert!(pattern.find_at("ba", 1).unwrap().is_some());
    }

    #[test]
    fn test_not_search_start_strategy() {
        let config = EmulationConfig {
            strategy: Some(Strategy::NotSearchStart),
            ..EmulationConfig::default()
        };
        let pattern = emulated("a", config);
        let found = pattern.find_at("aa", 0).unwrap().unwrap();
        assert_eq!(found.start, 1);
    }

    #[test]
    fn test_line_or_search_start_strategy() {
        let config = EmulationConfig {
            strategy: Some(Strategy::LineOrSearchStart),
            ..EmulationConfig::default()
        };
        let pattern = emulated("b", config);
        assert_eq!(pattern.find_at("ab\nb", 0).unwrap().unwrap().start, 3);
        assert_eq!(pattern.find_at("ab\nb", 1).unwrap().unwrap().start, 1);
    }

    #[test]
    fn test_string_or_search_start_strategy() {
        let config = EmulationConfig {
            strategy: Some(Strategy::StringOrSearchStart),
            ..EmulationConfig::default()
        };
        let pattern = emulated("b", config);
        assert!(pattern.find_at("ab\nb", 0).unwrap().is_none());
        assert_eq!(pattern.find_at("b\nb", 0).unwrap().unwrap().start, 0);
        assert_eq!(pattern.find_at("ab\nb", 1).unwrap().unwrap().start, 1);
    }

    #[test]
    fn test_find_at_inside_char_finds_nothing() {
        let native = NativePattern::new("a", "u").unwrap();
        assert!(native.find_at("éa", 1).unwrap().is_none());
        assert!(native.find_at("éa", 9).unwrap().is_none());
        assert_eq!(native.find_at("éa", 2).unwrap().unwrap().start, 2);

        let config = EmulationConfig {
            strategy: Some(Strategy::NotSearchStart),
            ..EmulationConfig::default()
        };
        let pattern = emulated("a", config);
        assert!(pattern.find_at("éa", 1).unwrap().is_none());
        assert!(pattern.find_at("éa", 9).unwrap().is_none());
        assert_eq!(pattern.find_at("éaa", 2).unwrap().unwrap().start, 3);
    }

    #[test]
    fn test_lazy_compile_defers() {
        let config = EmulationConfig {
            lazy_compile: true,
            ..EmulationConfig::default()
        };
        let pattern = emulated("a", config);
        assert!(!pattern.is_compiled());
        assert!(pattern.test("a").unwrap());
        assert!(pattern.is_compiled());
    }

    #[test]
    fn test_lazy_compile_error_surfaces_on_use() {
        let config = EmulationConfig {
            lazy_compile: true,
            ..EmulationConfig::default()
        };
        let pattern = EmulatedPattern::new("a**", "u", config).unwrap();
        assert!(matches!(pattern.find_at("a", 0), Err(OnigexError::Compile(_))));
    }

    #[test]
    fn test_global_exec_advances_last_index() {
        let pattern = NativePattern::new("a", "gu").unwrap();
        assert_eq!(pattern.exec("aba").unwrap().unwrap().start, 0);
        assert_eq!(pattern.last_index(), 1);
        assert_eq!(pattern.exec("aba").unwrap().unwrap().start, 2);
        assert!(pattern.exec("aba").unwrap().is_none());
        assert_eq!(pattern.last_index(), 0);
    }

    #[test]
    fn test_find_all_steps_over_empty_matches() {
        let pattern = NativePattern::new("a*", "u").unwrap();
        let found: Vec<_> = pattern
            .find_all("baa")
            .unwrap()
            .iter()
            .map(|m| (m.start, m.end))
            .collect();
        assert_eq!(found, vec![(0, 0), (1, 3), (3, 3)]);
    }
}
