//! Exclusion-set construction.
//!
//! The builder is split into phases so callers can run the I/O parts
//! (junction discovery, catalog lookups) between them:
//!
//! 1. [`TableSetDraft::new`] deduplicates the requested names.
//! 2. [`TableSetDraft::expand`] folds in discovered junction tables.
//! 3. [`TableSetDraft::validate`] keeps only tables present on both sides.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::naming::{NamingMode, normalize};

/// Where a candidate table was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Both,
    MissingFromSource,
    MissingFromTarget,
    MissingFromBoth,
    /// The catalog lookup itself failed.
    Unknown(String),
}

impl Presence {
    pub fn from_flags(in_source: bool, in_target: bool) -> Self {
        match (in_source, in_target) {
            (true, true) => Presence::Both,
            (false, true) => Presence::MissingFromSource,
            (true, false) => Presence::MissingFromTarget,
            (false, false) => Presence::MissingFromBoth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub table: String,
    pub message: String,
}

/// Exclusion set under construction.
#[derive(Debug, Clone)]
pub struct TableSetDraft {
    mode: NamingMode,
    raw: Vec<String>,
    tables: Vec<String>,
    seen: BTreeSet<String>,
    discovered: Vec<String>,
    duplicates_removed: usize,
}

impl TableSetDraft {
    /// Deduplicate the requested names, keeping first-seen order.
    pub fn new(initial: &[String], mode: NamingMode) -> Self {
        let mut raw = Vec::with_capacity(initial.len());
        let mut raw_seen = BTreeSet::new();
        for name in initial {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if raw_seen.insert(name.to_string()) {
                raw.push(name.to_string());
            }
        }
        let requested = initial.iter().filter(|name| !name.trim().is_empty()).count();
        let duplicates_removed = requested - raw.len();

        let mut draft = Self {
            mode,
            raw: Vec::new(),
            tables: Vec::new(),
            seen: BTreeSet::new(),
            discovered: Vec::new(),
            duplicates_removed,
        };
        for name in &raw {
            draft.insert(normalize(name, mode));
        }
        draft.raw = raw;
        draft
    }

    /// Names as requested, before normalization.
    ///
    /// Relationship metadata stores names in this form, so discovery is
    /// keyed on it.
    pub fn discovery_input(&self) -> &[String] {
        &self.raw
    }

    pub fn mode(&self) -> NamingMode {
        self.mode
    }

    /// Add discovered junction tables, normalized with the working-set mode.
    ///
    /// Returns the normalized names that were not already in the set.
    pub fn expand<I>(&mut self, discovered: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = Vec::new();
        for name in discovered {
            let normalized = normalize(&name, self.mode);
            if !self.discovered.contains(&normalized) {
                self.discovered.push(normalized.clone());
            }
            if self.insert(normalized.clone()) {
                added.push(normalized);
            }
        }
        added
    }

    /// Current working set, in insertion order.
    pub fn candidates(&self) -> &[String] {
        &self.tables
    }

    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// Split the working set by presence in both catalogs.
    pub fn validate<F>(self, mut presence: F) -> TableSet
    where
        F: FnMut(&str) -> Presence,
    {
        let mut set = TableSet {
            requested: self.tables.clone(),
            discovered: self.discovered,
            duplicates_removed: self.duplicates_removed,
            ..TableSet::default()
        };

        for table in self.tables {
            match presence(&table) {
                Presence::Both => set.validated.push(table),
                Presence::MissingFromSource => set.missing_from_source.push(table),
                Presence::MissingFromTarget => set.missing_from_target.push(table),
                Presence::MissingFromBoth => {
                    set.missing_from_source.push(table.clone());
                    set.missing_from_target.push(table);
                }
                Presence::Unknown(message) => set.lookup_failed.push(LookupFailure {
                    table,
                    message,
                }),
            }
        }

        set
    }

    fn insert(&mut self, name: String) -> bool {
        if self.seen.insert(name.clone()) {
            self.tables.push(name);
            true
        } else {
            false
        }
    }
}

/// Final exclusion set plus everything that was dropped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSet {
    /// Tables present in both schemas, in working-set order.
    pub validated: Vec<String>,
    /// Absent from Source: no destination structure to load into.
    pub missing_from_source: Vec<String>,
    /// Absent from Target: no replacement data to source.
    pub missing_from_target: Vec<String>,
    pub lookup_failed: Vec<LookupFailure>,
    /// Full working set before validation.
    pub requested: Vec<String>,
    /// Junction tables found through relationship metadata, normalized.
    pub discovered: Vec<String>,
    pub duplicates_removed: usize,
}

impl TableSet {
    pub fn is_empty(&self) -> bool {
        self.validated.is_empty()
    }
}

/// Run all builder phases with synchronous collaborators.
pub fn build_table_set<D, P>(
    initial: &[String],
    mode: NamingMode,
    discover: D,
    presence: P,
) -> TableSet
where
    D: FnOnce(&[String]) -> Vec<String>,
    P: FnMut(&str) -> Presence,
{
    let mut draft = TableSetDraft::new(initial, mode);
    let discovered = discover(draft.discovery_input());
    draft.expand(discovered);
    draft.validate(presence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn duplicate_request_is_counted_and_kept_once() {
        let set = build_table_set(
            &names(&["t", "t"]),
            NamingMode::None,
            |_| Vec::new(),
            |_| Presence::Both,
        );
        assert_eq!(set.duplicates_removed, 1);
        assert_eq!(set.validated, names(&["t"]));
    }

    #[test]
    fn discovered_junctions_are_normalized_and_merged() {
        let set = build_table_set(
            &names(&["users"]),
            NamingMode::ToSeparated,
            |raw| {
                assert_eq!(raw, names(&["users"]).as_slice());
                names(&["userRoles"])
            },
            |_| Presence::Both,
        );
        assert_eq!(set.validated, names(&["users", "user_roles"]));
        assert_eq!(set.discovered, names(&["user_roles"]));
    }

    #[test]
    fn discovery_sees_raw_names() {
        let mut seen = Vec::new();
        build_table_set(
            &names(&["postTags"]),
            NamingMode::ToSeparated,
            |raw| {
                seen = raw.to_vec();
                Vec::new()
            },
            |_| Presence::Both,
        );
        assert_eq!(seen, names(&["postTags"]));
    }

    #[test]
    fn one_sided_tables_are_dropped_into_their_bucket() {
        let set = build_table_set(
            &names(&["a", "x", "y", "z"]),
            NamingMode::None,
            |_| Vec::new(),
            |table| match table {
                "x" => Presence::MissingFromSource,
                "y" => Presence::MissingFromTarget,
                "z" => Presence::MissingFromBoth,
                _ => Presence::Both,
            },
        );
        assert_eq!(set.validated, names(&["a"]));
        assert_eq!(set.missing_from_source, names(&["x", "z"]));
        assert_eq!(set.missing_from_target, names(&["y", "z"]));
        for table in set.missing_from_source.iter().chain(&set.missing_from_target) {
            assert!(!set.validated.contains(table));
        }
    }

    #[test]
    fn lookup_failures_exclude_only_that_table() {
        let set = build_table_set(
            &names(&["ok", "broken"]),
            NamingMode::None,
            |_| Vec::new(),
            |table| {
                if table == "broken" {
                    Presence::Unknown("permission denied".to_string())
                } else {
                    Presence::Both
                }
            },
        );
        assert_eq!(set.validated, names(&["ok"]));
        assert_eq!(set.lookup_failed.len(), 1);
        assert_eq!(set.lookup_failed[0].table, "broken");
    }

    #[test]
    fn expand_reports_only_new_names() {
        let mut draft = TableSetDraft::new(&names(&["users", "user_roles"]), NamingMode::ToSeparated);
        let added = draft.expand(names(&["userRoles", "roleGrants"]));
        assert_eq!(added, names(&["role_grants"]));
        assert_eq!(
            draft.candidates(),
            names(&["users", "user_roles", "role_grants"]).as_slice()
        );
    }

    #[test]
    fn blank_entries_are_ignored() {
        let draft = TableSetDraft::new(&names(&["", "  ", "a"]), NamingMode::None);
        assert_eq!(draft.candidates(), names(&["a"]).as_slice());
        assert_eq!(draft.duplicates_removed(), 0);
    }
}
