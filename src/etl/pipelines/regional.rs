//! Regional catalog: open-data JSON exports covering the Urabá municipalities.

use std::path::PathBuf;

use log::{info, warn};

use crate::config::MUNICIPIOS;
use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame};
use crate::etl::heuristics::{extract_dane_code, find_dane_column};
use crate::etl::loader::{replace_table, table_count};
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;
use crate::etl::sources::json::load_json_records;

pub struct Dataset {
    pub path: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
    pub expected: u64,
}

const fn dataset(path: &'static str, schema: &'static str, table: &'static str, expected: u64) -> Dataset {
    Dataset { path, schema, table, expected }
}

pub const DATASETS: [Dataset; 23] = [
    // salud
    dataset("salud/irca_calidad_agua.json", "socioeconomico", "irca_raw", 18),
    dataset("salud/sivigila_eventos.json", "socioeconomico", "sivigila_raw", 2441),
    // economía
    dataset("economia/secop_integrado.json", "servicios", "secop_raw", 25584),
    dataset("economia/eva_agricola.json", "socioeconomico", "eva_agricola_raw", 86),
    dataset("economia/eva_agricola_historico.json", "socioeconomico", "eva_agricola_historico_raw", 162),
    // seguridad
    dataset("seguridad/lesiones_personales.json", "seguridad", "lesiones_personales_raw", 3653),
    dataset("seguridad/accidentes_transito_vehiculos.json", "seguridad", "accidentes_transito_raw", 1126),
    dataset("seguridad/minas_antipersonal_eventos.json", "seguridad", "minas_antipersonal_raw", 125),
    dataset("seguridad/minas_antipersonal_victimas.json", "seguridad", "minas_victimas_raw", 45),
    dataset("seguridad/sievcac_masacres.json", "seguridad", "masacres_raw", 70),
    dataset("seguridad/sievcac_minas_victimas.json", "seguridad", "sievcac_minas_raw", 53),
    dataset("seguridad/siniestros_viales_criticos.json", "seguridad", "siniestros_viales_raw", 3),
    // infraestructura
    dataset("infraestructura/internet_fijo.json", "servicios", "internet_fijo_raw", 9310),
    // gobierno
    dataset("gobierno/familias_en_accion.json", "socioeconomico", "familias_en_accion_raw", 18345),
    dataset("gobierno/icbf_prevencion.json", "socioeconomico", "icbf_prevencion_raw", 2099),
    dataset("gobierno/icbf_primera_infancia.json", "socioeconomico", "icbf_primera_infancia_raw", 801),
    dataset("gobierno/indice_gobierno_digital.json", "socioeconomico", "gobierno_digital_raw", 84),
    dataset("gobierno/ungrd_emergencias.json", "socioeconomico", "ungrd_emergencias_raw", 32),
    dataset("gobierno/puestos_votacion_2023.json", "socioeconomico", "puestos_votacion_raw", 27),
    dataset("gobierno/colombia_mayor_directo.json", "socioeconomico", "colombia_mayor_raw", 2),
    // educación
    dataset("educacion/sedes_educativas_geo.json", "socioeconomico", "sedes_educativas_geo_raw", 75),
    // cultura
    dataset("cultura/rnt_turismo.json", "servicios", "rnt_turismo_raw", 816),
    dataset("cultura/espacios_culturales.json", "servicios", "espacios_culturales_raw", 25),
];

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    for dataset in &DATASETS {
        let name = format!("{}.{}", dataset.schema, dataset.table);
        report.record(&name, load(ctx, dataset).await);
    }
}

async fn load(ctx: &EtlContext, dataset: &Dataset) -> Result<LoadOutcome, EtlError> {
    let files = dataset_files(ctx, dataset.path)?;
    let mut frames = Vec::with_capacity(files.len());
    for file in &files {
        let records = load_json_records(file)?;
        let mut frame = Frame::from_records(&records);
        frame.clean_columns();
        frames.push(frame);
    }
    let mut frame = if frames.len() == 1 {
        frames.remove(0)
    } else {
        Frame::concat(frames)
    };
    tag_municipality(&mut frame, &ctx.codes, &ctx.config.dane_code);

    replace_table(&ctx.pool, dataset.schema, dataset.table, &frame).await?;
    let stored = table_count(&ctx.pool, dataset.schema, dataset.table).await?.max(0) as u64;
    Ok(LoadOutcome::with_detail(stored, expectation_detail(stored, dataset.expected)))
}

/// The dataset file itself or, when absent, its per-municipality splits
/// (`<stem>_<municipio>.json`).
fn dataset_files(ctx: &EtlContext, relative: &str) -> Result<Vec<PathBuf>, EtlError> {
    let whole = ctx.data_path(relative);
    if whole.exists() {
        return Ok(vec![whole]);
    }
    let stem = relative.trim_end_matches(".json");
    let parts: Vec<PathBuf> = MUNICIPIOS
        .iter()
        .map(|m| ctx.data_path(format!("{}_{}.json", stem, municipio_slug(m.name))))
        .filter(|p| p.exists())
        .collect();
    if parts.is_empty() {
        // reported as skipped
        ctx.require(relative).map(|p| vec![p])
    } else {
        info!("{}: {} per-municipality files", relative, parts.len());
        Ok(parts)
    }
}

pub fn municipio_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Keeps rows of the Urabá municipalities and adds `dane_code`. Without a
/// recognizable code column every row is attributed to `default_code`.
pub fn tag_municipality(frame: &mut Frame, codes: &[&str], default_code: &str) {
    let Some(idx) = find_dane_column(frame, codes) else {
        warn!("no DANE column found, defaulting to {}", default_code);
        let rows = frame.len();
        frame.set_column("dane_code", vec![Cell::Text(default_code.to_string()); rows]);
        return;
    };
    let code_of = |row: &[Cell]| row[idx].to_text().and_then(|v| extract_dane_code(&v, codes));
    frame.retain_rows(|row| code_of(row).is_some());
    let tags = frame
        .rows
        .iter()
        .map(|row| code_of(row).map(|c| Cell::Text(c.to_string())).unwrap_or(Cell::Null))
        .collect();
    frame.set_column("dane_code", tags);
}

fn expectation_detail(loaded: u64, expected: u64) -> String {
    if loaded == expected {
        String::new()
    } else {
        format!("(esperados: {})", expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CODES: [&str; 3] = ["05045", "05837", "05147"];

    fn frame(value: serde_json::Value) -> Frame {
        let records: Vec<_> = value.as_array().unwrap().iter().map(|r| r.as_object().unwrap().clone()).collect();
        Frame::from_records(&records)
    }

    #[test]
    fn filters_to_uraba_and_tags_code() {
        let mut f = frame(json!([
            {"cod_mpio": "05045", "valor": 1},
            {"cod_mpio": "11001", "valor": 2},
            {"cod_mpio": 5837, "valor": 3}
        ]));
        tag_municipality(&mut f, &CODES, "05045");
        assert_eq!(f.len(), 2);
        let codes: Vec<Cell> = f.column("dane_code").unwrap().into_iter().cloned().collect();
        assert_eq!(codes, vec![Cell::Text("05045".into()), Cell::Text("05837".into())]);
    }

    #[test]
    fn defaults_when_no_code_column() {
        let mut f = frame(json!([{"nombre": "Casa de la cultura"}, {"nombre": "Biblioteca"}]));
        tag_municipality(&mut f, &CODES, "05045");
        assert_eq!(f.len(), 2);
        assert_eq!(f.rows[1][1], Cell::Text("05045".into()));
    }

    #[test]
    fn expected_count_mismatch_is_reported() {
        assert_eq!(expectation_detail(18, 18), "");
        assert_eq!(expectation_detail(17, 18), "(esperados: 18)");
        assert_eq!(municipio_slug("San Juan"), "san_juan");
    }
}
