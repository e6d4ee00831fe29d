//! Saved Google Places search output into `servicios.google_places`.

use std::collections::HashSet;

use geojson::{Geometry, Value as GeoValue};
use serde_json::{Map, Value};

use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame, GeometryColumn};
use crate::etl::loader::replace_table;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;
use crate::etl::sources::json::load_json_records;

const COLUMNS: [&str; 11] = [
    "place_id",
    "name",
    "category",
    "types",
    "address",
    "rating",
    "user_ratings_total",
    "price_level",
    "lat",
    "lon",
    "dane_code",
];

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    report.record("google_places", load(ctx).await);
}

async fn load(ctx: &EtlContext) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require("google_places/all_places.json")?;
    let records = load_json_records(&path)?;
    let frame = places_frame(&records, &ctx.config.dane_code);
    if frame.is_empty() {
        return Err(EtlError::NoData("Sin datos para cargar".into()));
    }
    let rows = replace_table(&ctx.pool, "servicios", "google_places", &frame).await?;
    Ok(LoadOutcome::rows(rows))
}

/// Accepts either processed records or raw Nearby Search results.
/// Rows without coordinates are dropped; the first record per `place_id` wins.
pub fn places_frame(records: &[Map<String, Value>], dane_code: &str) -> Frame {
    let mut frame = Frame::new(COLUMNS.iter().map(|c| c.to_string()).collect());
    let mut geometries = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for record in records {
        let location = record.get("geometry").and_then(|g| g.get("location"));
        let lat = record.get("lat").or_else(|| location.and_then(|l| l.get("lat"))).and_then(Value::as_f64);
        let lon = record
            .get("lon")
            .or_else(|| location.and_then(|l| l.get("lng")))
            .and_then(Value::as_f64);
        let (Some(lat), Some(lon)) = (lat, lon) else { continue };

        let place_id = record.get("place_id").and_then(Value::as_str).map(str::to_string);
        if let Some(id) = &place_id {
            if !seen.insert(id.clone()) {
                continue;
            }
        }

        let field = |key: &str| record.get(key).map(Cell::from_json).unwrap_or(Cell::Null);
        let types = record.get("types").cloned().unwrap_or_else(|| Value::Array(Vec::new()));
        let address = record.get("address").or_else(|| record.get("vicinity"));

        frame.push_row(vec![
            place_id.map(Cell::Text).unwrap_or(Cell::Null),
            field("name"),
            field("category"),
            Cell::Text(types.to_string()),
            address.map(Cell::from_json).unwrap_or(Cell::Null),
            field("rating"),
            field("user_ratings_total"),
            field("price_level"),
            Cell::Float(lat),
            Cell::Float(lon),
            Cell::Text(dane_code.to_string()),
        ]);
        geometries.push(Some(Geometry::new(GeoValue::Point(vec![lon, lat]))));
    }

    frame.geometry = Some(GeometryColumn { srid: 4326, values: geometries });
    frame
}
