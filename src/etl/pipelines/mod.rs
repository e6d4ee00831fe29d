//! One module per ETL stage. Each stage records one result per dataset.

pub mod cartografia;
pub mod catastro;
pub mod completeness;
pub mod critical;
pub mod empleo;
pub mod places;
pub mod regional;
pub mod seguridad;
pub mod socioeconomico;
pub mod terridata;

use crate::errors::EtlError;
use crate::etl::frame::Frame;
use crate::etl::loader::replace_table;
use crate::etl::report::LoadOutcome;
use crate::etl::runner::EtlContext;
use crate::etl::sources::json::{is_api_error, read_json, records_from_value};

/// Reads a JSON export into a frame with cleaned column names.
/// An API error payload or an empty export is an error.
pub fn read_json_frame(ctx: &EtlContext, relative: &str) -> Result<Frame, EtlError> {
    let path = ctx.require(relative)?;
    let value = read_json(&path)?;
    if is_api_error(&value) {
        return Err(EtlError::NoData("Vacío o error API".into()));
    }
    let records = records_from_value(value)
        .ok_or_else(|| EtlError::Format(format!("unrecognized JSON layout in {}", relative)))?;
    let mut frame = Frame::from_records(&records);
    if frame.is_empty() {
        return Err(EtlError::NoData("Vacío".into()));
    }
    frame.clean_columns();
    Ok(frame)
}

/// Loads a JSON export as-is into `schema.table` after `prepare` runs on it.
pub async fn load_raw_json<F>(
    ctx: &EtlContext,
    relative: &str,
    schema: &str,
    table: &str,
    prepare: F,
) -> Result<LoadOutcome, EtlError>
where
    F: FnOnce(&mut Frame),
{
    let mut frame = read_json_frame(ctx, relative)?;
    prepare(&mut frame);
    let rows = replace_table(&ctx.pool, schema, table, &frame).await?;
    Ok(LoadOutcome::rows(rows))
}
