//! Host engine capability table
//!
//! The table is computed once, on first access, by probe functions that compile and
//! run small sample patterns on the host engine. It is read-only afterwards and safe to
//! share between threads.

use once_cell::sync::Lazy;
use regress::Regex;

use crate::options::Target;

/// Native features detected on the host engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Flag `v` with nested classes and set operations
    pub unicode_sets: bool,
    /// `(?i:...)` modifier groups
    pub flag_groups: bool,
}

static CAPABILITIES: Lazy<Capabilities> = Lazy::new(Capabilities::probe);

/// The process-wide capability table
pub fn capabilities() -> &'static Capabilities {
    &CAPABILITIES
}

impl Capabilities {
    /// Run every probe against the host engine
    pub fn probe() -> Self {
        Capabilities {
            unicode_sets: probe_unicode_sets(),
            flag_groups: probe_flag_groups(),
        }
    }

    /// Newest target level whose features all passed their probes
    pub fn auto_target(&self) -> Target {
        if self.flag_groups && self.unicode_sets {
            Target::Es2025
        } else if self.unicode_sets {
            Target::Es2024
        } else {
            Target::Es2018
        }
    }
}

/// Whole-string match check used by the probes
fn matches_exactly(regex: &Regex, input: &str) -> bool {
    regex
        .find(input)
        .is_some_and(|m| m.range() == (0..input.len()))
}

fn probe_unicode_sets() -> bool {
    // Subtraction only behaves correctly when the engine parsed the class in `v` mode
    match Regex::with_flags(r"[\p{L}--[a-z]]", "v") {
        Ok(regex) => matches_exactly(&regex, "A") && !matches_exactly(&regex, "a"),
        Err(_) => false,
    }
}

fn probe_flag_groups() -> bool {
    match Regex::with_flags("a(?i:b)", "u") {
        Ok(regex) => matches_exactly(&regex, "aB") && !matches_exactly(&regex, "AB"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_target_ordering() {
        let none = Capabilities {
            unicode_sets: false,
            flag_groups: false,
        };
        assert_eq!(none.auto_target(), Target::Es2018);

        let sets = Capabilities {
            unicode_sets: true,
            flag_groups: false,
        };
        assert_eq!(sets.auto_target(), Target::Es2024);

        let all = Capabilities {
            unicode_sets: true,
            flag_groups: true,
        };
        assert_eq!(all.auto_target(), Target::Es2025);
    }

    #[test]
    fn test_flag_groups_without_sets_stays_low() {
        let caps = Capabilities {
            unicode_sets: false,
            flag_groups: true,
        };
        assert_eq!(caps.auto_target(), Target::Es2018);
    }

    #[test]
    fn test_probe_is_stable() {
        assert_eq!(*capabilities(), Capabilities::probe());
    }
}
