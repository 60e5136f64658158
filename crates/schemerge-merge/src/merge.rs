//! Per-table merge: reconcile columns, read Target rows, render statements.

use tracing::{info, warn};

use schemerge_core::{EmitOptions, MergeUnit, Result, emit, qualified_name, reconcile};
use schemerge_introspect::{Catalog, ColumnInfo};

use crate::report::{TableOutcome, TableStatus};

/// Produce the merge section for one validated table.
///
/// Statements target the Source schema, which is where the dumped structure
/// lands, so the conflict key is the Source primary key. Generated Source
/// columns are never written, so they are left out of the reconciliation.
pub async fn merge_table(
    source: &dyn Catalog,
    target: &dyn Catalog,
    table: &str,
    opts: &EmitOptions,
) -> Result<(String, TableOutcome)> {
    let source_columns = source.list_columns(table).await?;
    let target_columns = target.list_columns(table).await?;

    if source_columns.is_empty() || target_columns.is_empty() {
        let side = if source_columns.is_empty() { "source" } else { "target" };
        warn!(event = "table_columns_missing", table = %table, side = side);
        let text = format!(
            "--\n-- Merge data for {}: no columns found in {side}; table skipped.\n--\n\n",
            qualified_name(source.schema(), table)
        );
        let outcome = TableOutcome {
            table: table.to_string(),
            status: TableStatus::NotFound,
            common_columns: Vec::new(),
            source_only: Vec::new(),
            target_only: Vec::new(),
            rows_emitted: 0,
            message: Some(format!("no columns found in {side}")),
        };
        return Ok((text, outcome));
    }

    let writable: Vec<String> = source_columns
        .iter()
        .filter(|col| !col.is_generated)
        .map(|col| col.name.clone())
        .collect();
    let target_names: Vec<String> = target_columns.iter().map(|col| col.name.clone()).collect();
    let reconciliation = reconcile(&writable, &target_names);

    info!(
        event = "columns_reconciled",
        table = %table,
        common = reconciliation.common.len(),
        source_only = reconciliation.source_only.len(),
        target_only = reconciliation.target_only.len(),
        divergent = reconciliation.is_divergent(),
        restricted_read = reconciliation.needs_restricted_read()
    );

    let mut unit = MergeUnit {
        schema: source.schema().to_string(),
        table: table.to_string(),
        reconciliation,
        primary_key: Vec::new(),
        sequence_columns: Vec::new(),
        target_row_count: None,
    };

    if unit.reconciliation.common.is_empty() {
        warn!(event = "no_common_columns", table = %table);
        let text = emit(&unit, &[], opts)?;
        return Ok((text, outcome(&unit, TableStatus::NoCommonColumns, 0)));
    }

    unit.primary_key = source.primary_key(table).await?;
    unit.sequence_columns = source_columns
        .iter()
        .filter(|col| col.is_sequence_backed() && unit.reconciliation.common.contains(&col.name))
        .map(|col| col.name.clone())
        .collect();
    unit.target_row_count = match target.count_rows(table).await {
        Ok(count) => Some(count),
        Err(err) => {
            warn!(event = "row_count_failed", table = %table, error = %err);
            None
        }
    };

    let read_columns = restrict_columns(&target_columns, &unit.reconciliation.common);
    let order_by = unit
        .conflict_key()
        .map(|key| key.to_vec())
        .unwrap_or_default();
    let rows = target.fetch_rows(table, &read_columns, &order_by).await?;

    let text = emit(&unit, &rows, opts)?;
    info!(event = "table_merged", table = %table, rows = rows.len());
    Ok((text, outcome(&unit, TableStatus::Merged, rows.len())))
}

/// Target column metadata for exactly `common`, in `common` order.
fn restrict_columns(target_columns: &[ColumnInfo], common: &[String]) -> Vec<ColumnInfo> {
    common
        .iter()
        .filter_map(|name| target_columns.iter().find(|col| &col.name == name).cloned())
        .collect()
}

fn outcome(unit: &MergeUnit, status: TableStatus, rows_emitted: usize) -> TableOutcome {
    TableOutcome {
        table: unit.table.clone(),
        status,
        common_columns: unit.reconciliation.common.clone(),
        source_only: unit.reconciliation.source_only.clone(),
        target_only: unit.reconciliation.target_only.clone(),
        rows_emitted,
        message: None,
    }
}
