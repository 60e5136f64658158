use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};

use schemerge_core::{Error, Result, qualified_name, quote_ident};

use crate::options::RelationshipMetadata;

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

pub async fn table_exists(pool: &PgPool, schema: &str, table: &str) -> Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        select exists (
          select 1
          from pg_class c
          join pg_namespace n on n.oid = c.relnamespace
          where n.nspname = $1
            and c.relname = $2
            and c.relkind in ('r','p')
        )
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_one(pool)
    .await
    .map_err(db_error)
}

pub async fn count_rows(pool: &PgPool, schema: &str, table: &str) -> Result<i64> {
    let sql = format!("select count(*) from {}", qualified_name(schema, table));
    sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

#[derive(Debug, FromRow)]
pub struct RawColumn {
    pub ordinal_position: i16,
    pub name: String,
    pub udt_name: String,
    pub default: Option<String>,
    pub is_identity: bool,
    pub is_generated: bool,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attnum as ordinal_position,
          a.attname::text as name,
          t.typname::text as udt_name,
          pg_get_expr(ad.adbin, ad.adrelid) as "default",
          (a.attidentity <> '') as is_identity,
          (a.attgenerated <> '') as is_generated
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn get_primary_key(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<String>> {
    let columns = sqlx::query_scalar::<_, Vec<String>>(
        r#"
        select array_agg(att.attname::text order by ord.ordinality)
        from pg_constraint con
        join pg_class rel on rel.oid = con.conrelid
        join pg_namespace nsp on nsp.oid = rel.relnamespace
        join unnest(con.conkey) with ordinality as ord(attnum, ordinality) on true
        join pg_attribute att on att.attrelid = rel.oid and att.attnum = ord.attnum
        where nsp.nspname = $1
          and rel.relname = $2
          and con.contype = 'p'
        group by con.conname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_optional(pool)
    .await
    .map_err(db_error)?;

    Ok(columns.unwrap_or_default())
}

pub async fn relation_metadata_exists(
    pool: &PgPool,
    schema: &str,
    meta: &RelationshipMetadata,
) -> Result<bool> {
    sqlx::query_scalar::<_, bool>("select to_regclass($1) is not null")
        .bind(qualified_name(schema, &meta.table))
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

#[derive(Debug, FromRow)]
pub struct RawRelationField {
    pub owner_table: String,
    pub field_name: String,
    pub options: String,
}

pub async fn list_relation_fields(
    pool: &PgPool,
    schema: &str,
    meta: &RelationshipMetadata,
    owners: &[String],
) -> Result<Vec<RawRelationField>> {
    let owner = quote_ident(&meta.owner_column);
    let options = quote_ident(&meta.options_column);
    let sql = format!(
        r#"
        select
          {owner}::text as owner_table,
          {field}::text as field_name,
          {options}::text as options
        from {table}
        where {owner}::text = any($1)
          and {interface}::text = $2
          and {options} is not null
        order by 1, 2
        "#,
        field = quote_ident(&meta.field_column),
        interface = quote_ident(&meta.interface_column),
        table = qualified_name(schema, &meta.table),
    );

    sqlx::query_as::<_, RawRelationField>(&sql)
        .bind(owners)
        .bind(&meta.many_to_many_kind)
        .fetch_all(pool)
        .await
        .map_err(db_error)
}

/// Read `columns` as text, in order, sorted by `order_by`.
pub async fn select_rows_as_text(
    pool: &PgPool,
    schema: &str,
    table: &str,
    columns: &[String],
    order_by: &[String],
) -> Result<Vec<Vec<Option<String>>>> {
    let sql = select_text_sql(schema, table, columns, order_by);
    let rows: Vec<PgRow> = sqlx::query(&sql).fetch_all(pool).await.map_err(db_error)?;

    rows.iter()
        .map(|row| {
            (0..columns.len())
                .map(|idx| row.try_get::<Option<String>, _>(idx).map_err(db_error))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

pub fn select_text_sql(
    schema: &str,
    table: &str,
    columns: &[String],
    order_by: &[String],
) -> String {
    let select_list = columns
        .iter()
        .map(|col| {
            let ident = quote_ident(col);
            format!("{ident}::text as {ident}")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("select {select_list} from {}", qualified_name(schema, table));
    if !order_by.is_empty() {
        let order = order_by
            .iter()
            .map(|col| quote_ident(col))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" order by {order}"));
    }
    sql
}
