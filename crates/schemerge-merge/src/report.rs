use serde::{Deserialize, Serialize};

use schemerge_core::TableSet;

use crate::engine::PipelineState;

/// What happened to one validated table during emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Merged,
    /// No column exists on both sides; only a comment was written.
    NoCommonColumns,
    /// One side reported no columns at all.
    NotFound,
    /// Reading or rendering failed; recorded inline in the artifact.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOutcome {
    pub table: String,
    pub status: TableStatus,
    pub common_columns: Vec<String>,
    pub source_only: Vec<String>,
    pub target_only: Vec<String>,
    pub rows_emitted: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TableOutcome {
    pub fn failed(table: &str, message: String) -> Self {
        Self {
            table: table.to_string(),
            status: TableStatus::Failed,
            common_columns: Vec::new(),
            source_only: Vec::new(),
            target_only: Vec::new(),
            rows_emitted: 0,
            message: Some(message),
        }
    }
}

/// Report for a merge run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    pub state: PipelineState,
    /// Working set handed to the dump as data exclusions.
    pub excluded_from_dump: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_set: Option<TableSet>,
    pub tables: Vec<TableOutcome>,
    pub artifact_bytes: u64,
}

impl MergeReport {
    pub fn merged_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|outcome| outcome.status == TableStatus::Merged)
            .count()
    }
}
