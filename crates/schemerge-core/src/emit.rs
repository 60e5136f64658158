//! Merge-data statement generation.
//!
//! Each validated table becomes one self-contained section: a comment block
//! describing the column reconciliation, an unconditional clear, and batched
//! upserts restricted to the common columns. Applying a section twice leaves
//! the destination exactly as applying it once.

use std::fmt::Write as _;

use crate::columns::ColumnReconciliation;
use crate::error::{Error, Result};
use crate::value::{SqlValue, qualified_name, quote_ident, quote_literal};

/// Rows per `INSERT` statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub batch_size: usize,
    pub reset_sequences: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            reset_sequences: true,
        }
    }
}

/// Everything needed to emit one table's merge section.
#[derive(Debug, Clone)]
pub struct MergeUnit {
    pub schema: String,
    pub table: String,
    pub reconciliation: ColumnReconciliation,
    /// Source primary key, in key order.
    pub primary_key: Vec<String>,
    /// Common columns backed by a sequence or identity.
    pub sequence_columns: Vec<String>,
    pub target_row_count: Option<i64>,
}

impl MergeUnit {
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema, &self.table)
    }

    /// Primary key usable as a conflict target: every key column must be
    /// written.
    pub fn conflict_key(&self) -> Option<&[String]> {
        let common = &self.reconciliation.common;
        if !self.primary_key.is_empty() && self.primary_key.iter().all(|col| common.contains(col)) {
            Some(&self.primary_key)
        } else {
            None
        }
    }
}

/// Emit the complete merge section for one table.
///
/// `rows` hold values for `unit.reconciliation.common`, in that order.
pub fn emit(unit: &MergeUnit, rows: &[Vec<SqlValue>], opts: &EmitOptions) -> Result<String> {
    if opts.batch_size == 0 {
        return Err(Error::InvalidConfig("batch size must be at least 1".to_string()));
    }

    let mut out = describe(unit);
    let common = &unit.reconciliation.common;
    if common.is_empty() {
        out.push_str("-- No common columns between Source and Target; table skipped.\n\n");
        return Ok(out);
    }

    let width = common.len();
    if let Some(position) = rows.iter().position(|row| row.len() != width) {
        return Err(Error::Emit(format!(
            "row {position} of {} has {} values, expected {width}",
            unit.table,
            rows[position].len()
        )));
    }

    let target = unit.qualified_name();
    let column_list = common
        .iter()
        .map(|col| quote_ident(col))
        .collect::<Vec<_>>()
        .join(", ");
    let conflict = conflict_clause(unit);

    let _ = writeln!(out, "DELETE FROM {target};");
    if rows.is_empty() {
        out.push_str("-- Target has no rows for this table.\n");
    }

    for batch in rows.chunks(opts.batch_size) {
        let _ = writeln!(out, "INSERT INTO {target} ({column_list}) VALUES");
        let tuples = batch
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .map(SqlValue::to_literal)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("    ({values})")
            })
            .collect::<Vec<_>>()
            .join(",\n");
        out.push_str(&tuples);
        let _ = writeln!(out, "\n{conflict};");
    }

    if opts.reset_sequences {
        for column in unit
            .sequence_columns
            .iter()
            .filter(|col| common.contains(*col))
        {
            let ident = quote_ident(column);
            let _ = writeln!(
                out,
                "SELECT pg_catalog.setval(pg_catalog.pg_get_serial_sequence({}, {}), COALESCE(MAX({ident}), 1), MAX({ident}) IS NOT NULL) FROM {target};",
                quote_literal(&target),
                quote_literal(column),
            );
        }
    }

    out.push('\n');
    Ok(out)
}

/// Comment block reporting the reconciliation for one table.
pub fn describe(unit: &MergeUnit) -> String {
    let rec = &unit.reconciliation;
    let mut out = String::new();
    let _ = writeln!(out, "--");
    let _ = writeln!(out, "-- Merge data for {}", unit.qualified_name());
    let _ = writeln!(
        out,
        "-- Common columns: {} (source: {}, target: {})",
        rec.common.len(),
        rec.source_total,
        rec.target_total
    );
    if !rec.source_only.is_empty() {
        let _ = writeln!(
            out,
            "-- Source-only columns (left at default): {}",
            rec.source_only.join(", ")
        );
    }
    if !rec.target_only.is_empty() {
        let _ = writeln!(
            out,
            "-- Target-only columns (not written): {}",
            rec.target_only.join(", ")
        );
    }
    if let Some(count) = unit.target_row_count {
        let _ = writeln!(out, "-- Target rows: {count}");
    }
    if !rec.common.is_empty() && unit.conflict_key().is_none() {
        let _ = writeln!(
            out,
            "-- No primary key among common columns; conflicting rows are left untouched."
        );
    }
    let _ = writeln!(out, "--");
    out
}

/// Inline record of a table whose merge could not be produced.
pub fn emit_failure(schema: &str, table: &str, message: &str) -> String {
    let message = message.replace('\n', " ");
    format!(
        "--\n-- Merge data for {} FAILED: {message}\n--\n\n",
        qualified_name(schema, table)
    )
}

/// Statements opening the merge-data part of the artifact.
pub fn section_preamble(disable_triggers: bool) -> String {
    let mut out = String::from("--\n-- Merge data from Target\n--\n\n");
    out.push_str("SET standard_conforming_strings = on;\n");
    if disable_triggers {
        out.push_str("SET session_replication_role = replica;\n");
    }
    out.push('\n');
    out
}

/// Statements closing the merge-data part of the artifact.
pub fn section_postamble(disable_triggers: bool) -> String {
    if disable_triggers {
        "SET session_replication_role = DEFAULT;\n".to_string()
    } else {
        String::new()
    }
}

fn conflict_clause(unit: &MergeUnit) -> String {
    let Some(key) = unit.conflict_key() else {
        return "ON CONFLICT DO NOTHING".to_string();
    };

    let key_list = key
        .iter()
        .map(|col| quote_ident(col))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = unit
        .reconciliation
        .common
        .iter()
        .filter(|col| !key.contains(*col))
        .map(|col| {
            let ident = quote_ident(col);
            format!("{ident} = EXCLUDED.{ident}")
        })
        .collect::<Vec<_>>();

    if updates.is_empty() {
        format!("ON CONFLICT ({key_list}) DO NOTHING")
    } else {
        format!("ON CONFLICT ({key_list}) DO UPDATE SET {}", updates.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::reconcile;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn unit(source: &[&str], target: &[&str], pk: &[&str]) -> MergeUnit {
        MergeUnit {
            schema: "public".to_string(),
            table: "t".to_string(),
            reconciliation: reconcile(&cols(source), &cols(target)),
            primary_key: cols(pk),
            sequence_columns: Vec::new(),
            target_row_count: Some(2),
        }
    }

    fn row(id: i64, name: &str) -> Vec<SqlValue> {
        vec![
            SqlValue::Number(id.to_string()),
            SqlValue::Text(name.to_string()),
        ]
    }

    #[test]
    fn empty_common_emits_comment_only() {
        let unit = unit(&["a"], &["b"], &[]);
        let text = emit(&unit, &[], &EmitOptions::default()).unwrap();
        assert!(text.contains("No common columns"));
        assert!(!text.contains("DELETE"));
        assert!(!text.contains("INSERT"));
    }

    #[test]
    fn clears_then_upserts_on_primary_key() {
        let unit = unit(&["id", "name"], &["id", "name", "legacy"], &["id"]);
        let text = emit(&unit, &[row(1, "a"), row(2, "O'Neil")], &EmitOptions::default()).unwrap();

        let delete_at = text.find("DELETE FROM \"public\".\"t\";").unwrap();
        let insert_at = text.find("INSERT INTO \"public\".\"t\" (\"id\", \"name\") VALUES").unwrap();
        assert!(delete_at < insert_at);
        assert!(text.contains("    (1, 'a'),\n    (2, 'O''Neil')\n"));
        assert!(text.contains("ON CONFLICT (\"id\") DO UPDATE SET \"name\" = EXCLUDED.\"name\";"));
        assert!(text.contains("-- Target-only columns (not written): legacy"));
        assert!(!text.contains("legacy\""));
    }

    #[test]
    fn clear_is_emitted_even_without_rows() {
        let unit = unit(&["id"], &["id"], &["id"]);
        let text = emit(&unit, &[], &EmitOptions::default()).unwrap();
        assert!(text.contains("DELETE FROM \"public\".\"t\";"));
        assert!(!text.contains("INSERT"));
    }

    #[test]
    fn batches_respect_batch_size() {
        let unit = unit(&["id", "name"], &["id", "name"], &["id"]);
        let rows: Vec<_> = (0..5).map(|id| row(id, "x")).collect();
        let opts = EmitOptions {
            batch_size: 2,
            reset_sequences: false,
        };
        let text = emit(&unit, &rows, &opts).unwrap();
        assert_eq!(text.matches("INSERT INTO").count(), 3);
        assert_eq!(text.matches("ON CONFLICT").count(), 3);
    }

    #[test]
    fn rebatching_yields_the_same_tuples() {
        let unit = unit(&["id", "name"], &["id", "name"], &["id"]);
        let rows: Vec<_> = (0..7).map(|id| row(id, "x")).collect();
        let tuples = |batch_size| {
            let opts = EmitOptions {
                batch_size,
                reset_sequences: false,
            };
            let text = emit(&unit, &rows, &opts).unwrap();
            text.lines()
                .filter(|line| line.starts_with("    ("))
                .map(|line| line.trim().trim_end_matches(',').to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(tuples(1), tuples(100));
        assert_eq!(tuples(3).len(), 7);
    }

    #[test]
    fn emission_is_deterministic() {
        let unit = unit(&["id", "name"], &["name", "id"], &["id"]);
        let rows = vec![row(1, "a")];
        let first = emit(&unit, &rows, &EmitOptions::default()).unwrap();
        let second = emit(&unit, &rows, &EmitOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_key_falls_back_to_do_nothing() {
        let unit = unit(&["id", "name"], &["id", "name"], &[]);
        let text = emit(&unit, &[row(1, "a")], &EmitOptions::default()).unwrap();
        assert!(text.contains("\nON CONFLICT DO NOTHING;"));
        assert!(text.contains("No primary key among common columns"));
    }

    #[test]
    fn key_only_tables_do_nothing_on_conflict() {
        let unit = unit(&["user_id", "role_id"], &["user_id", "role_id"], &["user_id", "role_id"]);
        let rows = vec![vec![
            SqlValue::Number("1".to_string()),
            SqlValue::Number("2".to_string()),
        ]];
        let text = emit(&unit, &rows, &EmitOptions::default()).unwrap();
        assert!(text.contains("ON CONFLICT (\"user_id\", \"role_id\") DO NOTHING;"));
    }

    #[test]
    fn resets_sequences_for_serial_columns() {
        let mut unit = unit(&["id", "name"], &["id", "name"], &["id"]);
        unit.sequence_columns = cols(&["id"]);
        let text = emit(&unit, &[row(1, "a")], &EmitOptions::default()).unwrap();
        assert!(text.contains(
            "pg_get_serial_sequence('\"public\".\"t\"', 'id'), COALESCE(MAX(\"id\"), 1)"
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let unit = unit(&["id", "name"], &["id", "name"], &["id"]);
        let err = emit(&unit, &[vec![SqlValue::Null]], &EmitOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Emit(_)));
    }

    #[test]
    fn failure_comment_is_single_line() {
        let text = emit_failure("public", "t", "connection reset\nby peer");
        assert!(text.contains("FAILED: connection reset by peer"));
    }
}
