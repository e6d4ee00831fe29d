//! PostgreSQL access helpers.
//!
//! Every query endpoint is a thin passthrough: the SQL is assembled with
//! `QueryBuilder` and PostgreSQL serializes the result set to JSON itself,
//! so handlers never decode rows column by column.

use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Wraps a query so it returns its rows as one JSON array.
pub fn rows_query<'a>() -> QueryBuilder<'a, Postgres> {
    QueryBuilder::new("SELECT COALESCE(json_agg(t), '[]'::json) FROM (")
}

/// Wraps a query whose rows carry a `geom` column into a GeoJSON
/// FeatureCollection. Every non-geometry column becomes a property.
pub fn feature_collection_query<'a>() -> QueryBuilder<'a, Postgres> {
    QueryBuilder::new(
        "SELECT json_build_object('type', 'FeatureCollection', 'features', \
         COALESCE(json_agg(ST_AsGeoJSON(t.*, 'geom')::json), '[]'::json)) FROM (",
    )
}

pub async fn json_rows(pool: &PgPool, mut qb: QueryBuilder<'_, Postgres>) -> Result<Vec<Value>, sqlx::Error> {
    qb.push(") t");
    let value: Value = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

pub async fn json_feature_collection(pool: &PgPool, mut qb: QueryBuilder<'_, Postgres>) -> Result<Value, sqlx::Error> {
    qb.push(") t");
    qb.build_query_scalar().fetch_one(pool).await
}

/// Appends `WHERE <base conditions>` plus an optional `dane_code` filter.
pub fn push_where<'a>(qb: &mut QueryBuilder<'a, Postgres>, conditions: &[&str], dane_code: Option<&'a str>) {
    qb.push(" WHERE ");
    if conditions.is_empty() {
        qb.push("1=1");
    } else {
        qb.push(
            conditions
                .iter()
                .map(|c| format!("({})", c))
                .collect::<Vec<_>>()
                .join(" AND "),
        );
    }
    if let Some(code) = dane_code {
        qb.push(" AND dane_code = ").push_bind(code);
    }
}

/// Returns a single scalar count, or 0 if the table is missing.
pub async fn count_or_zero(pool: &PgPool, qualified_table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", qualified_table);
    sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await.unwrap_or(0)
}

/// Schemas written by the ETL and exposed through the catalog endpoints.
pub const SERVED_SCHEMAS: [&str; 6] = ["cartografia", "catastro", "socioeconomico", "seguridad", "servicios", "empleo"];

/// `(schema, table)` pairs of every table in the served schemas.
pub async fn served_tables(pool: &PgPool) -> Result<Vec<(String, String)>, sqlx::Error> {
    let schemas: Vec<String> = SERVED_SCHEMAS.iter().map(|s| s.to_string()).collect();
    sqlx::query_as(
        "SELECT schemaname::text, tablename::text FROM pg_tables \
         WHERE schemaname = ANY($1) ORDER BY schemaname, tablename",
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
}

/// `[{name, type}]` of a table's columns in declaration order.
pub async fn table_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<Value>, sqlx::Error> {
    let mut qb = rows_query();
    qb.push(
        "SELECT column_name::text AS name, data_type::text AS type FROM information_schema.columns \
         WHERE table_schema = ",
    )
    .push_bind(schema.to_string())
    .push(" AND table_name = ")
    .push_bind(table.to_string())
    .push(" ORDER BY ordinal_position");
    json_rows(pool, qb).await
}

/// `"schema"."table"` for names read back from the catalog.
pub fn quoted_table(schema: &str, table: &str) -> String {
    format!("\"{}\".\"{}\"", schema.replace('"', "\"\""), table.replace('"', "\"\""))
}

/// Empty-string query params are treated as absent.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_without_filter() {
        let mut qb = rows_query();
        qb.push("SELECT * FROM socioeconomico.terridata");
        push_where(&mut qb, &["dimension = 'Salud'"], None);
        assert_eq!(
            qb.sql(),
            "SELECT COALESCE(json_agg(t), '[]'::json) FROM (SELECT * FROM socioeconomico.terridata WHERE (dimension = 'Salud')"
        );
    }

    #[test]
    fn where_clause_binds_dane_code() {
        let mut qb = rows_query();
        qb.push("SELECT * FROM seguridad.hurtos");
        push_where(&mut qb, &[], Some("05045"));
        assert!(qb.sql().ends_with("WHERE 1=1 AND dane_code = $1"));
    }

    #[test]
    fn blank_params_are_absent() {
        assert_eq!(non_empty(&Some("  ".into())), None);
        assert_eq!(non_empty(&Some("05045".into())), Some("05045"));
        assert_eq!(non_empty(&None), None);
    }
}
