//! Base cartography: municipal boundary, OSM layers, IGAC and MGN shapefiles.

use log::info;

use crate::config::{uraba_bbox, BBox, APARTADO_BBOX};
use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame, GeometryColumn};
use crate::etl::heuristics::map_block_columns;
use crate::etl::loader::replace_table;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;
use crate::etl::sources::geojson_file::{read_features, string_property};
use crate::etl::sources::osm::{self, OverpassDump};
use crate::etl::sources::shp::read_shapefile;

const SCHEMA: &str = "cartografia";

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    report.record("limite_municipal", load_limite_municipal(ctx).await);
    report.record("osm_edificaciones", load_osm(ctx, "buildings", "osm_edificaciones", osm::buildings).await);
    report.record("osm_vias", load_osm(ctx, "roads", "osm_vias", osm::roads).await);
    report.record("osm_uso_suelo", load_osm(ctx, "landuse", "osm_uso_suelo", osm::landuse).await);
    report.record("osm_amenidades", load_osm(ctx, "amenities", "osm_amenidades", osm::amenities).await);
    report.record("igac_municipios", load_igac(ctx, "igac_municipios", &APARTADO_BBOX).await);
    report.record("igac_uraba", load_igac(ctx, "igac_uraba", &uraba_bbox()).await);
    report.record("manzanas_censales", load_manzanas(ctx).await);
}

async fn load_limite_municipal(ctx: &EtlContext) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require("cartografia/geojson/apartado.geojson")?;
    let features = read_features(&path)?;
    let feature = features
        .into_iter()
        .next()
        .ok_or_else(|| EtlError::NoData("límite municipal sin features".into()))?;

    let text_or = |key: &str, default: &str| {
        Cell::Text(string_property(&feature, key).unwrap_or_else(|| default.to_string()))
    };
    let area = feature
        .property("DANE:area")
        .map(Cell::from_json)
        .unwrap_or(Cell::Null);

    let mut frame = Frame::new(vec!["nombre".into(), "divipola".into(), "departamento".into(), "area_km2".into()]);
    frame.push_row(vec![
        text_or("name", &ctx.config.municipality_name),
        text_or("divipola", &ctx.config.dane_code),
        text_or("is_in:state", "Antioquia"),
        area,
    ]);
    frame.geometry = Some(GeometryColumn { srid: 4326, values: vec![feature.geometry.clone()] });

    let rows = replace_table(&ctx.pool, SCHEMA, "limite_municipal", &frame).await?;
    Ok(LoadOutcome::rows(rows))
}

async fn load_osm(
    ctx: &EtlContext,
    kind: &str,
    table: &str,
    extract: fn(&OverpassDump) -> Frame,
) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require(format!("cartografia/osm/apartado_{}.json", kind))?;
    let dump = osm::read_dump(&path)?;
    let frame = extract(&dump);
    info!("{}: {} of {} elements usable", table, frame.len(), dump.elements.len());
    if frame.is_empty() {
        return Err(EtlError::NoData("Sin datos".into()));
    }
    let rows = replace_table(&ctx.pool, SCHEMA, table, &frame).await?;
    Ok(LoadOutcome::rows(rows))
}

async fn load_igac(ctx: &EtlContext, table: &str, bbox: &BBox) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require("cartografia/igac/raw/DireccionesTerritoriales_shp/DTerritorialesMunpio.shp")?;
    let mut frame = read_shapefile(&path, Some(bbox))?;
    if frame.is_empty() {
        return Err(EtlError::NoData("Sin datos en bbox".into()));
    }
    frame.clean_columns();
    let rows = replace_table(&ctx.pool, SCHEMA, table, &frame).await?;
    Ok(LoadOutcome::rows(rows))
}

async fn load_manzanas(ctx: &EtlContext) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require("cartografia/mgn/raw/MGN_ANM_MANZANA.shp")?;
    let frame = read_shapefile(&path, Some(&APARTADO_BBOX))?;
    if frame.is_empty() {
        return Err(EtlError::NoData("Sin manzanas en bbox".into()));
    }
    let mapping = map_block_columns(&frame.columns);
    info!("manzanas_censales: column mapping {:?}", mapping);
    let blocks = frame.select(&mapping);
    let rows = replace_table(&ctx.pool, SCHEMA, "manzanas_censales", &blocks).await?;
    Ok(LoadOutcome::rows(rows))
}
