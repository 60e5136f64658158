use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Outcome of comparing one table's columns across Source and Target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReconciliation {
    /// Columns present in both, in Source physical order.
    pub common: Vec<String>,
    /// Source columns with no Target counterpart; left at their defaults.
    pub source_only: Vec<String>,
    /// Target columns with no Source counterpart; never written.
    pub target_only: Vec<String>,
    pub source_total: usize,
    pub target_total: usize,
}

impl ColumnReconciliation {
    /// True when the two column sets differ in either direction.
    pub fn is_divergent(&self) -> bool {
        !self.source_only.is_empty() || !self.target_only.is_empty()
    }

    /// True when Target carries columns the destination cannot receive, which
    /// rules out a passthrough of Target's native dump.
    pub fn needs_restricted_read(&self) -> bool {
        !self.target_only.is_empty()
    }
}

/// Compute the column intersection for a table present in both schemas.
///
/// Inputs are expected in physical column order. Comparison is by exact name.
pub fn reconcile(source_cols: &[String], target_cols: &[String]) -> ColumnReconciliation {
    let target_set: HashSet<&str> = target_cols.iter().map(String::as_str).collect();
    let source_set: HashSet<&str> = source_cols.iter().map(String::as_str).collect();

    let mut common = Vec::new();
    let mut source_only = Vec::new();
    for column in source_cols {
        if target_set.contains(column.as_str()) {
            if !common.contains(column) {
                common.push(column.clone());
            }
        } else {
            source_only.push(column.clone());
        }
    }

    let target_only = target_cols
        .iter()
        .filter(|column| !source_set.contains(column.as_str()))
        .cloned()
        .collect();

    ColumnReconciliation {
        common,
        source_only,
        target_only,
        source_total: source_cols.len(),
        target_total: target_cols.len(),
    }
}
