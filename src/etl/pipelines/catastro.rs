use crate::config::APARTADO_BBOX;
use crate::errors::EtlError;
use crate::etl::loader::replace_table;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;
use crate::etl::sources::shp::read_shapefile;

const CATASTRO_DIR: &str = "catastro/raw/CatastroPubliconNoviembre2025";

// (dataset, shapefile, table)
const LAYERS: [(&str, &str, &str); 4] = [
    ("catastro_terrenos", "R_TERRENO.shp", "terrenos"),
    ("catastro_construcciones", "R_CONSTRUCCION.shp", "construcciones"),
    ("catastro_sectores", "R_SECTOR.shp", "sectores"),
    ("catastro_veredas", "R_VEREDA.shp", "veredas"),
];

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    for (dataset, file, table) in LAYERS {
        report.record(dataset, load_layer(ctx, file, table).await);
    }
}

async fn load_layer(ctx: &EtlContext, file: &str, table: &str) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require(format!("{}/{}", CATASTRO_DIR, file))?;
    let mut frame = read_shapefile(&path, Some(&APARTADO_BBOX))?;
    if frame.is_empty() {
        return Err(EtlError::NoData(format!("Sin {} en bbox", table)));
    }
    frame.clean_columns();
    let rows = replace_table(&ctx.pool, "catastro", table, &frame).await?;
    Ok(LoadOutcome::rows(rows))
}
