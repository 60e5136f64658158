use schemerge_core::{SqlValue, ValueKind};

use crate::adapter::{ColumnInfo, RelationField};

use super::queries::{RawColumn, RawRelationField};

pub fn map_columns(raw: Vec<RawColumn>) -> Vec<ColumnInfo> {
    let mut columns: Vec<ColumnInfo> = raw
        .into_iter()
        .map(|col| ColumnInfo {
            ordinal_position: col.ordinal_position,
            name: col.name,
            udt_name: col.udt_name,
            default: col.default,
            is_identity: col.is_identity,
            is_generated: col.is_generated,
        })
        .collect();
    columns.sort_by_key(|col| col.ordinal_position);
    columns
}

pub fn map_relation_fields(raw: Vec<RawRelationField>) -> Vec<RelationField> {
    raw.into_iter()
        .map(|field| RelationField {
            owner_table: field.owner_table,
            field_name: field.field_name,
            options: field.options,
        })
        .collect()
}

/// Attach a rendering kind to each text value, by column type.
pub fn map_rows(raw: Vec<Vec<Option<String>>>, columns: &[ColumnInfo]) -> Vec<Vec<SqlValue>> {
    let kinds: Vec<ValueKind> = columns
        .iter()
        .map(|col| ValueKind::from_pg_type(&col.udt_name))
        .collect();

    raw.into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&kinds)
                .map(|(value, kind)| SqlValue::from_db_text(*kind, value))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(position: i16, name: &str, udt: &str) -> ColumnInfo {
        ColumnInfo {
            ordinal_position: position,
            name: name.to_string(),
            udt_name: udt.to_string(),
            default: None,
            is_identity: false,
            is_generated: false,
        }
    }

    #[test]
    fn rows_follow_column_types() {
        let columns = vec![column(1, "id", "int8"), column(2, "name", "text")];
        let rows = map_rows(
            vec![
                vec![Some("12".to_string()), None],
                vec![Some("18446744073709551".to_string()), Some("x".to_string())],
            ],
            &columns,
        );
        assert_eq!(rows[0], vec![SqlValue::Number("12".to_string()), SqlValue::Null]);
        assert_eq!(
            rows[1],
            vec![
                SqlValue::Text("18446744073709551".to_string()),
                SqlValue::Text("x".to_string())
            ]
        );
    }

    #[test]
    fn columns_are_ordered_by_position() {
        let mapped = map_columns(vec![
            RawColumn {
                ordinal_position: 2,
                name: "b".to_string(),
                udt_name: "text".to_string(),
                default: None,
                is_identity: false,
                is_generated: false,
            },
            RawColumn {
                ordinal_position: 1,
                name: "a".to_string(),
                udt_name: "int4".to_string(),
                default: Some("nextval('a_seq'::regclass)".to_string()),
                is_identity: false,
                is_generated: false,
            },
        ]);
        let names: Vec<_> = mapped.iter().map(|col| col.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(mapped[0].is_sequence_backed());
        assert!(!mapped[1].is_sequence_backed());
    }
}
