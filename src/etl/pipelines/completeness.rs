//! Data completeness report: row counts per table and coverage of the
//! observatory's planning dimensions.

use std::collections::BTreeMap;
use std::fs;

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::{quoted_table, served_tables};
use crate::errors::EtlError;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;

pub struct Dimension {
    pub name: &'static str,
    pub description: &'static str,
    pub expected_tables: &'static [&'static str],
    pub missing_conceptual: &'static [&'static str],
}

pub const DIMENSIONS: [Dimension; 11] = [
    Dimension {
        name: "demografia",
        description: "Poblacion y proyecciones demograficas",
        expected_tables: &["socioeconomico.terridata"],
        missing_conceptual: &["proyecciones_dane", "censo_basico"],
    },
    Dimension {
        name: "educacion",
        description: "Calidad educativa, cobertura, infraestructura",
        expected_tables: &[
            "socioeconomico.icfes_raw",
            "socioeconomico.establecimientos_educativos_raw",
            "socioeconomico.sedes_educativas_geo_raw",
        ],
        missing_conceptual: &["matriculas_simat", "desercion_escolar"],
    },
    Dimension {
        name: "salud",
        description: "Prestadores de salud, vigilancia epidemiologica, calidad del agua",
        expected_tables: &[
            "socioeconomico.ips_raw",
            "servicios.prestadores_raw",
            "socioeconomico.irca_raw",
            "socioeconomico.sivigila_raw",
        ],
        missing_conceptual: &["mortalidad_infantil", "cobertura_vacunacion"],
    },
    Dimension {
        name: "seguridad",
        description: "Delincuencia, conflicto armado, siniestralidad vial",
        expected_tables: &[
            "seguridad.homicidios_raw",
            "seguridad.hurtos_raw",
            "seguridad.delitos_sexuales_raw",
            "seguridad.violencia_intrafamiliar_raw",
            "seguridad.victimas_raw",
            "seguridad.lesiones_personales_raw",
            "seguridad.accidentes_transito_raw",
            "seguridad.minas_antipersonal_raw",
            "seguridad.minas_victimas_raw",
            "seguridad.masacres_raw",
            "seguridad.sievcac_minas_raw",
            "seguridad.siniestros_viales_raw",
        ],
        missing_conceptual: &["extorsion", "secuestro"],
    },
    Dimension {
        name: "economia",
        description: "Produccion agricola, contratacion publica, empleo",
        expected_tables: &[
            "socioeconomico.eva_agricola_raw",
            "socioeconomico.eva_agricola_historico_raw",
            "servicios.secop_raw",
        ],
        missing_conceptual: &["empleo_dane", "pib_municipal", "catastro"],
    },
    Dimension {
        name: "pobreza",
        description: "IPM, NBI, programas sociales",
        expected_tables: &[
            "socioeconomico.ipm_raw",
            "socioeconomico.nbi_raw",
            "socioeconomico.familias_en_accion_raw",
            "socioeconomico.colombia_mayor_raw",
        ],
        missing_conceptual: &["gini_municipal"],
    },
    Dimension {
        name: "infancia_y_familia",
        description: "Proteccion de primera infancia, prevencion",
        expected_tables: &["socioeconomico.icbf_prevencion_raw", "socioeconomico.icbf_primera_infancia_raw"],
        missing_conceptual: &["adopciones", "trabajo_infantil"],
    },
    Dimension {
        name: "infraestructura_y_servicios",
        description: "Conectividad, servicios publicos, vias",
        expected_tables: &[
            "servicios.internet_fijo_raw",
            "servicios.google_places",
            "cartografia.osm_vias",
            "cartografia.osm_edificaciones",
        ],
        missing_conceptual: &["acueducto_cobertura", "alcantarillado_cobertura", "energia_cobertura"],
    },
    Dimension {
        name: "gobierno_y_participacion",
        description: "Gobierno digital, emergencias, participacion ciudadana",
        expected_tables: &[
            "socioeconomico.gobierno_digital_raw",
            "socioeconomico.ungrd_emergencias_raw",
            "socioeconomico.puestos_votacion_raw",
        ],
        missing_conceptual: &["presupuesto_municipal", "plan_desarrollo"],
    },
    Dimension {
        name: "territorio_y_ambiente",
        description: "Uso del suelo, areas protegidas, cartografia base",
        expected_tables: &[
            "cartografia.limite_municipal",
            "cartografia.manzanas_censales",
            "cartografia.osm_uso_suelo",
            "cartografia.osm_amenidades",
            "cartografia.igac_municipios",
        ],
        missing_conceptual: &["deforestacion", "coberturas_ideam", "riesgos_pot"],
    },
    Dimension {
        name: "cultura_y_turismo",
        description: "Turismo, espacios culturales, patrimonio",
        expected_tables: &["servicios.rnt_turismo_raw", "servicios.espacios_culturales_raw"],
        missing_conceptual: &["patrimonio_cultural", "bibliotecas"],
    },
];

#[derive(Debug, Serialize, PartialEq)]
pub struct TableCount {
    pub name: String,
    pub records: i64,
}

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct SchemaSummary {
    pub tables: Vec<TableCount>,
    pub total_records: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Coverage {
    pub description: &'static str,
    pub available: Vec<String>,
    pub missing: Vec<String>,
    pub coverage_pct: f64,
}

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    report.record("data_completeness_report", generate(ctx).await);
}

async fn generate(ctx: &EtlContext) -> Result<LoadOutcome, EtlError> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for (schema, table) in served_tables(&ctx.pool).await? {
        let sql = format!("SELECT COUNT(*) FROM {}", quoted_table(&schema, &table));
        let count = match sqlx::query_scalar::<_, i64>(&sql).fetch_one(&ctx.pool).await {
            Ok(n) => n,
            Err(e) => {
                warn!("No se pudo contar {}.{}: {}", schema, table, e);
                0
            }
        };
        counts.insert(format!("{}.{}", schema, table), count);
    }

    let document = serde_json::json!({
        "generated": Utc::now().to_rfc3339(),
        "municipality": format!("{} ({})", ctx.config.municipality_name, ctx.config.dane_code),
        "total_tables": counts.len(),
        "total_records": counts.values().sum::<i64>(),
        "dimensions": group_by_schema(&counts),
        "data_dictionary_coverage": coverage_document(&counts)?,
    });

    fs::create_dir_all(&ctx.config.docs_dir)?;
    let path = ctx.config.docs_dir.join("data_completeness_report.json");
    fs::write(&path, serde_json::to_string_pretty(&document)?)?;
    info!("Reporte guardado en: {}", path.display());

    Ok(LoadOutcome::with_detail(counts.len() as u64, path.display().to_string()))
}

pub fn group_by_schema(counts: &BTreeMap<String, i64>) -> BTreeMap<String, SchemaSummary> {
    let mut schemas: BTreeMap<String, SchemaSummary> = BTreeMap::new();
    for (name, records) in counts {
        let schema = name.split('.').next().unwrap_or(name).to_string();
        let summary = schemas.entry(schema).or_default();
        summary.tables.push(TableCount { name: name.clone(), records: *records });
        summary.total_records += records;
    }
    schemas
}

pub fn coverage(dimension: &Dimension, counts: &BTreeMap<String, i64>) -> Coverage {
    let (available, mut missing): (Vec<String>, Vec<String>) = dimension
        .expected_tables
        .iter()
        .map(|t| t.to_string())
        .partition(|t| counts.get(t).copied().unwrap_or(0) > 0);
    missing.extend(dimension.missing_conceptual.iter().map(|m| format!("(pendiente) {}", m)));

    let pct = available.len() as f64 / dimension.expected_tables.len().max(1) as f64 * 100.0;
    Coverage {
        description: dimension.description,
        available,
        missing,
        coverage_pct: (pct * 10.0).round() / 10.0,
    }
}

fn coverage_document(counts: &BTreeMap<String, i64>) -> Result<Map<String, Value>, EtlError> {
    let mut out = Map::new();
    for dimension in &DIMENSIONS {
        out.insert(dimension.name.to_string(), serde_json::to_value(coverage(dimension, counts))?);
    }
    Ok(out)
}
