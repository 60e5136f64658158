use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use schemerge_core::{Error, Result, SqlValue};

use crate::adapter::{Catalog, ColumnInfo, RelationField};
use crate::options::CatalogOptions;

mod mapper;
mod queries;

pub use queries::select_text_sql;

/// Catalog backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    options: CatalogOptions,
}

impl PostgresCatalog {
    /// Create a new catalog using a pre-configured pool.
    pub fn new(pool: PgPool, options: CatalogOptions) -> Self {
        Self { pool, options }
    }

    /// Open a small pool against `url`.
    ///
    /// The pipeline issues one query at a time, so two connections are
    /// plenty.
    pub async fn connect(url: &str, options: CatalogOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        Ok(Self::new(pool, options))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Catalog for PostgresCatalog {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn schema(&self) -> &str {
        &self.options.schema
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        queries::table_exists(&self.pool, &self.options.schema, table).await
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        queries::count_rows(&self.pool, &self.options.schema, table).await
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let raw = queries::list_columns(&self.pool, &self.options.schema, table).await?;
        Ok(mapper::map_columns(raw))
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        queries::get_primary_key(&self.pool, &self.options.schema, table).await
    }

    async fn relation_fields(&self, owners: &[String]) -> Result<Option<Vec<RelationField>>> {
        let meta = &self.options.relationships;
        if !queries::relation_metadata_exists(&self.pool, &self.options.schema, meta).await? {
            return Ok(None);
        }

        let raw =
            queries::list_relation_fields(&self.pool, &self.options.schema, meta, owners).await?;
        Ok(Some(mapper::map_relation_fields(raw)))
    }

    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        order_by: &[String],
    ) -> Result<Vec<Vec<SqlValue>>> {
        let names: Vec<String> = columns.iter().map(|col| col.name.clone()).collect();
        let raw =
            queries::select_rows_as_text(&self.pool, &self.options.schema, table, &names, order_by)
                .await?;
        Ok(mapper::map_rows(raw, columns))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
