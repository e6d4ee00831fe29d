//! Load step: writes a `Frame` into PostgreSQL/PostGIS.

use chrono::NaiveDateTime;
use log::info;
use sqlx::query_builder::Separated;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame};

const MAX_BIND_PARAMS: usize = 65_535;
const MAX_CHUNK_ROWS: usize = 1_000;
pub const GEOMETRY_COLUMN: &str = "geom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Timestamp,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "TEXT",
        }
    }
}

/// Narrowest SQL type that holds every non-null cell; all-null columns are TEXT.
pub fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Cell>,
{
    let (mut ints, mut floats, mut bools, mut stamps, mut other) = (0, 0, 0, 0, 0);
    for cell in cells {
        match cell {
            Cell::Null => {}
            Cell::Int(_) => ints += 1,
            Cell::Float(_) => floats += 1,
            Cell::Bool(_) => bools += 1,
            Cell::Timestamp(_) => stamps += 1,
            Cell::Text(_) => other += 1,
        }
    }
    let numeric = ints + floats;
    match (numeric, bools, stamps, other) {
        (0, 0, 0, _) => ColumnType::Text,
        (n, 0, 0, 0) if n == ints => ColumnType::BigInt,
        (_, 0, 0, 0) => ColumnType::Double,
        (0, _, 0, 0) => ColumnType::Boolean,
        (0, 0, _, 0) => ColumnType::Timestamp,
        _ => ColumnType::Text,
    }
}

pub fn infer_types(frame: &Frame) -> Vec<ColumnType> {
    (0..frame.columns.len())
        .map(|idx| infer_column_type(frame.rows.iter().map(|r| &r[idx])))
        .collect()
}

pub fn validate_identifier(name: &str) -> Result<&str, EtlError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63;
    if valid {
        Ok(name)
    } else {
        Err(EtlError::Identifier(name.to_string()))
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn qualified(schema: &str, table: &str) -> Result<String, EtlError> {
    Ok(format!("{}.{}", validate_identifier(schema)?, validate_identifier(table)?))
}

pub fn create_table_sql(qualified_name: &str, frame: &Frame, types: &[ColumnType]) -> String {
    let mut columns: Vec<String> = frame
        .columns
        .iter()
        .zip(types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
        .collect();
    if frame.geometry.is_some() {
        columns.push(format!("{} geometry(Geometry, 4326)", GEOMETRY_COLUMN));
    }
    format!("CREATE TABLE {} ({})", qualified_name, columns.join(", "))
}

pub fn chunk_rows(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).clamp(1, MAX_CHUNK_ROWS)
}

/// Drops and recreates `schema.table` from the frame in a single transaction.
pub async fn replace_table(pool: &PgPool, schema: &str, table: &str, frame: &Frame) -> Result<u64, EtlError> {
    replace_table_typed(pool, schema, table, frame, &infer_types(frame)).await
}

/// Same as [`replace_table`] with caller-declared column types.
pub async fn replace_table_typed(
    pool: &PgPool,
    schema: &str,
    table: &str,
    frame: &Frame,
    types: &[ColumnType],
) -> Result<u64, EtlError> {
    let name = qualified(schema, table)?;
    if types.len() != frame.columns.len() {
        return Err(EtlError::Format(format!("{}: {} types for {} columns", name, types.len(), frame.columns.len())));
    }

    let mut tx = pool.begin().await?;
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", name))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&create_table_sql(&name, frame, types))
        .execute(&mut *tx)
        .await?;
    let inserted = insert_rows(&mut *tx, &name, frame, types).await?;
    tx.commit().await?;

    info!("{}: {} rows written", name, inserted);
    Ok(inserted)
}

async fn insert_rows(conn: &mut PgConnection, name: &str, frame: &Frame, types: &[ColumnType]) -> Result<u64, EtlError> {
    if frame.is_empty() {
        return Ok(0);
    }
    let mut column_list: Vec<String> = frame.columns.iter().map(|c| quote_ident(c)).collect();
    let geometry = frame.geometry.as_ref();
    if geometry.is_some() {
        column_list.push(GEOMETRY_COLUMN.to_string());
    }
    let geojson_text: Vec<Option<String>> = match geometry {
        Some(g) => g
            .values
            .iter()
            .map(|v| v.as_ref().and_then(|geom| serde_json::to_string(geom).ok()))
            .collect(),
        None => Vec::new(),
    };
    let srid = geometry.map(|g| g.srid).unwrap_or(4326);

    let indices: Vec<usize> = (0..frame.len()).collect();
    let mut inserted = 0u64;
    for chunk in indices.chunks(chunk_rows(column_list.len())) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", name, column_list.join(", ")));
        qb.push_values(chunk, |mut b, &i| {
            for (cell, ty) in frame.rows[i].iter().zip(types) {
                push_cell(&mut b, cell, *ty);
            }
            if geometry.is_some() {
                match geojson_text.get(i).cloned().flatten() {
                    Some(text) => {
                        b.push("ST_MakeValid(ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON(");
                        b.push_bind_unseparated(text);
                        b.push_unseparated(format!("), {}), 4326))", srid));
                    }
                    None => {
                        b.push("NULL");
                    }
                }
            }
        });
        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(inserted)
}

fn push_cell<Sep: std::fmt::Display>(b: &mut Separated<'_, '_, Postgres, Sep>, cell: &Cell, ty: ColumnType) {
    match ty {
        ColumnType::BigInt => {
            let v = match cell {
                Cell::Int(i) => Some(*i),
                other => other.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64),
            };
            b.push_bind(v);
        }
        ColumnType::Double => {
            b.push_bind(cell.as_f64());
        }
        ColumnType::Boolean => {
            let v = match cell {
                Cell::Bool(v) => Some(*v),
                _ => None,
            };
            b.push_bind(v);
        }
        ColumnType::Timestamp => {
            let v: Option<NaiveDateTime> = match cell {
                Cell::Timestamp(t) => Some(*t),
                _ => None,
            };
            b.push_bind(v);
        }
        ColumnType::Text => {
            b.push_bind(cell.to_text());
        }
    }
}

pub async fn create_indexes(pool: &PgPool, schema: &str, table: &str, columns: &[&str]) -> Result<(), EtlError> {
    let name = qualified(schema, table)?;
    for column in columns {
        let column = validate_identifier(column)?;
        let sql = format!("CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({})", table, column, name, column);
        sqlx::query(&sql).execute(pool).await?;
    }
    Ok(())
}

/// Row count as stored, read back after a load.
pub async fn table_count(pool: &PgPool, schema: &str, table: &str) -> Result<i64, EtlError> {
    let name = qualified(schema, table)?;
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", name))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::frame::GeometryColumn;

    #[test]
    fn type_inference() {
        let ints = [Cell::Int(1), Cell::Null, Cell::Int(3)];
        let mixed_numbers = [Cell::Int(1), Cell::Float(2.5)];
        let mixed = [Cell::Int(1), Cell::Text("a".into())];
        let empty = [Cell::Null, Cell::Null];
        let flags = [Cell::Bool(true), Cell::Null];
        assert_eq!(infer_column_type(&ints), ColumnType::BigInt);
        assert_eq!(infer_column_type(&mixed_numbers), ColumnType::Double);
        assert_eq!(infer_column_type(&mixed), ColumnType::Text);
        assert_eq!(infer_column_type(&empty), ColumnType::Text);
        assert_eq!(infer_column_type(&flags), ColumnType::Boolean);
    }

    #[test]
    fn identifiers_are_validated() {
        assert!(validate_identifier("socioeconomico").is_ok());
        assert!(validate_identifier("icfes_raw").is_ok());
        assert!(validate_identifier("Icfes").is_err());
        assert!(validate_identifier("x; DROP TABLE y").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("9lives").is_err());
    }

    #[test]
    fn quoting_escapes_quotes() {
        assert_eq!(quote_ident("addr_street"), "\"addr_street\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn create_table_includes_geometry() {
        let mut frame = Frame::new(vec!["id".into(), "name".into()]);
        frame.push_row(vec![Cell::Int(1), Cell::Text("x".into())]);
        frame.geometry = Some(GeometryColumn { srid: 4686, values: vec![None] });
        let sql = create_table_sql("cartografia.osm_vias", &frame, &infer_types(&frame));
        assert_eq!(
            sql,
            "CREATE TABLE cartografia.osm_vias (\"id\" BIGINT, \"name\" TEXT, geom geometry(Geometry, 4326))"
        );
    }

    #[test]
    fn chunks_respect_bind_limit() {
        assert_eq!(chunk_rows(5), 1_000);
        assert_eq!(chunk_rows(200), 327);
        assert_eq!(chunk_rows(0), 1_000);
        assert_eq!(chunk_rows(100_000), 1);
    }
}
