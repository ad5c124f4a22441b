//! Translation options
//!
//! User-facing configuration and its normalization into the resolved settings
//! consumed by the pipeline stages.

use std::fmt;

use crate::capability;
use crate::error::{OnigexError, Result};

/// Default recursion depth for bounded recursion emulation
pub const DEFAULT_RECURSION_LIMIT: u32 = 20;

/// Accepted range for `Rules::recursion_limit`
pub const RECURSION_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 2..=100;

/// Whether approximate emulation is acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Accuracy {
    /// Best effort; may diverge for pathological inputs
    #[default]
    Default,
    /// Fail rather than approximate
    Strict,
}

/// Native feature level the emitted pattern may rely on
///
/// Levels are ordered: each one includes every feature of the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    /// Flag `u`, lookbehind, named groups, property escapes
    Es2018,
    /// Adds flag `v`: nested classes, set intersection and subtraction
    Es2024,
    /// Adds `(?i:...)` style modifier groups
    Es2025,
}

impl Target {
    /// Parse a target name such as `ES2024` (case-insensitive); `auto` yields `None`
    pub fn parse(name: &str) -> Result<Option<Target>> {
        match name.to_ascii_lowercase().as_str() {
            "auto" => Ok(None),
            "es2018" => Ok(Some(Target::Es2018)),
            "es2024" => Ok(Some(Target::Es2024)),
            "es2025" => Ok(Some(Target::Es2025)),
            _ => Err(OnigexError::InvalidOption(format!("unknown target '{}'", name))),
        }
    }

    /// Whether the `v` flag (and its class syntax) is available
    pub fn has_unicode_sets(self) -> bool {
        self >= Target::Es2024
    }

    /// Whether `(?i:...)` modifier groups are available
    pub fn has_flag_groups(self) -> bool {
        self >= Target::Es2025
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Es2018 => write!(f, "ES2018"),
            Target::Es2024 => write!(f, "ES2024"),
            Target::Es2025 => write!(f, "ES2025"),
        }
    }
}

/// Oniguruma rule variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    /// Treat backreferences to missing groups as never-matching instead of an error
    pub allow_orphan_backrefs: bool,
    /// `\b` and `\B` use ASCII word characters
    pub ascii_word_boundaries: bool,
    /// Unnamed groups keep capturing when named groups are present
    pub capture_group: bool,
    /// Maximum depth for bounded recursion emulation
    pub recursion_limit: u32,
    /// `^` and `$` only match at the string start/end
    pub singleline: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            allow_orphan_backrefs: false,
            ascii_word_boundaries: false,
            capture_group: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            singleline: false,
        }
    }
}

/// Options for [`crate::translate`] and [`crate::translate_to_details`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    /// Accuracy policy
    pub accuracy: Accuracy,
    /// Require a plain native result; fail if emulation would be needed
    pub avoid_emulation: bool,
    /// Oniguruma flags: any of `i`, `m`, `x`, `D`, `S`, `W`
    pub flags: String,
    /// Add flag `g`
    pub global: bool,
    /// Add flag `d`
    pub has_indices: bool,
    /// Defer compilation for patterns at least this long; `None` never defers
    pub lazy_compile_length: Option<usize>,
    /// Rule variants
    pub rules: Rules,
    /// Target level; `None` probes the host engine
    pub target: Option<Target>,
    /// Keep redundant wrappers in the output for readability
    pub verbose: bool,
}

/// Oniguruma flags, resolved from a flag string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternFlags {
    /// Ignore case (`i`)
    pub ignore_case: bool,
    /// Dot matches newline (`m` in Oniguruma)
    pub dot_all: bool,
    /// Free-spacing (`x`)
    pub extended: bool,
    /// ASCII-only `\d` (`D`)
    pub digit_is_ascii: bool,
    /// ASCII-only `\s` (`S`)
    pub space_is_ascii: bool,
    /// ASCII-only `\w` and `\b` (`W`)
    pub word_is_ascii: bool,
}

impl PatternFlags {
    /// Parse a flag string like "imx"
    pub fn from_string(flags: &str) -> Result<Self> {
        let mut mode = PatternFlags::default();
        for c in flags.chars() {
            match c {
                'i' => mode.ignore_case = true,
                'm' => mode.dot_all = true,
                'x' => mode.extended = true,
                'D' => mode.digit_is_ascii = true,
                'S' => mode.space_is_ascii = true,
                'W' => mode.word_is_ascii = true,
                _ => {
                    return Err(OnigexError::InvalidOption(format!(
                        "unknown flag '{}'",
                        c
                    )));
                }
            }
        }
        Ok(mode)
    }
}

/// Options after validation and target resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub accuracy: Accuracy,
    pub avoid_emulation: bool,
    pub flags: PatternFlags,
    pub global: bool,
    pub has_indices: bool,
    pub lazy_compile_length: Option<usize>,
    pub rules: Rules,
    pub target: Target,
    pub verbose: bool,
}

impl Options {
    /// Validate the options and resolve the target level
    ///
    /// # Errors
    /// `ConfigurationConflict` when emulation is avoided while lazy compilation is
    /// requested, `InvalidOption` for unknown flags or an out-of-range recursion limit.
    pub fn normalize(&self) -> Result<ResolvedOptions> {
        if self.avoid_emulation && self.lazy_compile_length.is_some() {
            return Err(OnigexError::ConfigurationConflict(
                "lazy compilation requires the emulation wrapper".to_string(),
            ));
        }
        if !RECURSION_LIMIT_RANGE.contains(&self.rules.recursion_limit) {
            return Err(OnigexError::InvalidOption(format!(
                "recursion limit must be between {} and {}, got {}",
                RECURSION_LIMIT_RANGE.start(),
                RECURSION_LIMIT_RANGE.end(),
                self.rules.recursion_limit
            )));
        }
        let flags = PatternFlags::from_string(&self.flags)?;
        let target = self
            .target
            .unwrap_or_else(|| capability::capabilities().auto_target());

        Ok(ResolvedOptions {
            accuracy: self.accuracy,
            avoid_emulation: self.avoid_emulation,
            flags,
            global: self.global,
            has_indices: self.has_indices,
            lazy_compile_length: self.lazy_compile_length,
            rules: self.rules.clone(),
            target,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_ordered() {
        assert!(Target::Es2018 < Target::Es2024);
        assert!(Target::Es2024 < Target::Es2025);
        assert!(!Target::Es2018.has_unicode_sets());
        assert!(Target::Es2025.has_unicode_sets());
        assert!(Target::Es2025.has_flag_groups());
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("ES2024").unwrap(), Some(Target::Es2024));
        assert_eq!(Target::parse("auto").unwrap(), None);
        assert!(Target::parse("es5").is_err());
    }

    #[test]
    fn test_flags_from_string() {
        let flags = PatternFlags::from_string("imxW").unwrap();
        assert!(flags.ignore_case && flags.dot_all && flags.extended && flags.word_is_ascii);
        assert!(!flags.digit_is_ascii);
        assert!(PatternFlags::from_string("g").is_err());
    }

    #[test]
    fn test_conflict_avoid_emulation_with_lazy_compile() {
        let options = Options {
            avoid_emulation: true,
            lazy_compile_length: Some(100),
            ..Options::default()
        };
        assert!(matches!(
            options.normalize(),
            Err(OnigexError::ConfigurationConflict(_))
        ));
    }

    #[test]
    fn test_recursion_limit_range() {
        let mut options = Options::default();
        options.rules.recursion_limit = 1;
        assert!(matches!(
            options.normalize(),
            Err(OnigexError::InvalidOption(_))
        ));
        options.rules.recursion_limit = 5;
        assert_eq!(options.normalize().unwrap().rules.recursion_limit, 5);
    }

    #[test]
    fn test_explicit_target_is_kept() {
        let options = Options {
            target: Some(Target::Es2018),
            ..Options::default()
        };
        assert_eq!(options.normalize().unwrap().target, Target::Es2018);
    }
}
