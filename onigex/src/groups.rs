//! Group registry for tracking capture groups
//!
//! This module tracks the capturing groups of a source pattern, mapping names to
//! numbers and vice versa. Oniguruma allows several groups to share a name, so a
//! name maps to a list of numbers. It is used to:
//! - Resolve backreferences and subroutine calls by name or number
//! - Resolve relative references against the groups opened so far
//! - Report the user-visible capture layout of a pattern

use std::collections::HashMap;

/// Information about a capture group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    /// The number of the group (1-based)
    pub number: u32,
    /// The name of the group (if it's a named group)
    pub name: Option<String>,
}

/// Registry for tracking capture groups
#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    /// Groups in declaration order
    groups: Vec<GroupInfo>,
    /// Map from group name to numbers, in declaration order
    name_to_numbers: HashMap<String, Vec<u32>>,
}

impl GroupRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        GroupRegistry::default()
    }

    /// Register the next capture group and return its number
    pub fn register_group(&mut self, name: Option<String>) -> u32 {
        let number = self.groups.len() as u32 + 1;
        if let Some(ref group_name) = name {
            self.name_to_numbers
                .entry(group_name.clone())
                .or_default()
                .push(number);
        }
        self.groups.push(GroupInfo { number, name });
        number
    }

    /// Get group info by number
    pub fn get_by_number(&self, number: u32) -> Option<&GroupInfo> {
        number
            .checked_sub(1)
            .and_then(|i| self.groups.get(i as usize))
    }

    /// Get every group number carrying a name
    pub fn numbers_for_name(&self, name: &str) -> Option<&[u32]> {
        self.name_to_numbers.get(name).map(Vec::as_slice)
    }

    /// Whether any group is named
    pub fn has_named_groups(&self) -> bool {
        !self.name_to_numbers.is_empty()
    }

    /// Whether a name is shared by more than one group
    pub fn is_duplicate_name(&self, name: &str) -> bool {
        self.numbers_for_name(name).is_some_and(|n| n.len() > 1)
    }

    /// Get the total number of capture groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get all group infos
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Resolve a relative reference (`-1` = last group opened before `opened_so_far`)
    pub fn resolve_relative(&self, relative: i32, opened_so_far: u32) -> Option<u32> {
        if relative >= 0 {
            return None;
        }
        let back = relative.unsigned_abs();
        if back > opened_so_far {
            return None;
        }
        Some(opened_so_far - back + 1)
    }
}
