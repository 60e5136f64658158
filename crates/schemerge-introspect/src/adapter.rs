use async_trait::async_trait;

use schemerge_core::{Result, SqlValue};

/// Column metadata needed for reconciliation and literal rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub ordinal_position: i16,
    pub name: String,
    /// `pg_type.typname`, e.g. `int8` or `timestamptz`.
    pub udt_name: String,
    pub default: Option<String>,
    pub is_identity: bool,
    pub is_generated: bool,
}

impl ColumnInfo {
    /// True when values come from a sequence that must follow loaded rows.
    pub fn is_sequence_backed(&self) -> bool {
        self.is_identity
            || self
                .default
                .as_deref()
                .is_some_and(|default| default.starts_with("nextval("))
    }
}

/// One field definition tagged as many-to-many, as stored in the
/// relationship metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationField {
    pub owner_table: String,
    pub field_name: String,
    /// Raw options payload, usually JSON.
    pub options: String,
}

/// Read access to one database's catalog and rows.
///
/// Table names are passed exactly as they should appear in the database.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Schema the catalog reads from.
    fn schema(&self) -> &str;

    async fn table_exists(&self, table: &str) -> Result<bool>;

    async fn count_rows(&self, table: &str) -> Result<i64>;

    /// Columns in physical order.
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Primary key columns in key order; empty when the table has none.
    async fn primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// Many-to-many field definitions owned by `owners`.
    ///
    /// Returns `None` when the relationship metadata table does not exist.
    async fn relation_fields(&self, owners: &[String]) -> Result<Option<Vec<RelationField>>>;

    /// Read every row of `table`, restricted to `columns` and ordered by
    /// `order_by`. Values are returned in `columns` order.
    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        order_by: &[String],
    ) -> Result<Vec<Vec<SqlValue>>>;

    /// Release the underlying connections.
    async fn close(&self);
}
