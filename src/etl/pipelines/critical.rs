//! Typed tables read by the query layer, built from the raw JSON exports
//! through declarative column maps.

use log::info;

use crate::errors::EtlError;
use crate::etl::frame::{parse_timestamp, Cell, Frame};
use crate::etl::loader::{replace_table_typed, ColumnType};
use crate::etl::pipelines::read_json_frame;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Text,
    Integer,
    Float,
    Timestamp,
}

impl Kind {
    fn column_type(self) -> ColumnType {
        match self {
            Kind::Text => ColumnType::Text,
            Kind::Integer => ColumnType::BigInt,
            Kind::Float => ColumnType::Double,
            Kind::Timestamp => ColumnType::Timestamp,
        }
    }
}

/// Value used when none of the source columns exist.
#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Null,
    Text(&'static str),
    Zero,
}

pub struct Field {
    pub target: &'static str,
    pub sources: &'static [&'static str],
    pub kind: Kind,
    pub fallback: Fallback,
}

const fn text(target: &'static str, sources: &'static [&'static str], fallback: &'static str) -> Field {
    Field { target, sources, kind: Kind::Text, fallback: Fallback::Text(fallback) }
}

const fn count(target: &'static str, sources: &'static [&'static str]) -> Field {
    Field { target, sources, kind: Kind::Integer, fallback: Fallback::Zero }
}

const fn date(target: &'static str, sources: &'static [&'static str]) -> Field {
    Field { target, sources, kind: Kind::Timestamp, fallback: Fallback::Null }
}

const fn score(target: &'static str, sources: &'static [&'static str]) -> Field {
    Field { target, sources, kind: Kind::Float, fallback: Fallback::Null }
}

pub struct TableMap {
    pub file: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
    pub fields: &'static [Field],
}

const HOMICIDIOS: &[Field] = &[
    date("fecha", &["fecha_hecho"]),
    text("municipio", &["municipio"], "APARTADO"),
    text("cod_municipio", &["cod_muni"], "05045"),
    text("departamento", &["departamento"], "ANTIOQUIA"),
    text("genero", &["sexo"], ""),
    text("grupo_etario", &["zona"], ""),
    text("arma_medio", &[], ""),
    count("cantidad", &["cantidad"]),
];

const HURTOS: &[Field] = &[
    date("fecha", &["fecha_hecho"]),
    text("municipio", &["municipio"], "APARTADO"),
    text("cod_municipio", &["codigo_dane"], "05045"),
    text("departamento", &["departamento"], "ANTIOQUIA"),
    text("tipo_hurto", &["tipo_de_hurto"], ""),
    text("genero", &["genero"], ""),
    text("grupo_etario", &["grupo_etario"], ""),
    text("arma_medio", &["armas_medios"], ""),
    count("cantidad", &["cantidad"]),
];

const VIOLENCIA_INTRAFAMILIAR: &[Field] = &[
    date("fecha", &["fecha_hecho"]),
    text("municipio", &["municipio"], "APARTADO"),
    text("cod_municipio", &["codigo_dane"], "05045"),
    text("departamento", &["departamento"], "ANTIOQUIA"),
    text("genero", &["genero"], ""),
    text("grupo_etario", &["grupo_etario"], ""),
    text("arma_medio", &["armas_medios"], ""),
    count("cantidad", &["cantidad"]),
];

const DELITOS_SEXUALES: &[Field] = &[
    date("fecha", &["fecha_hecho"]),
    text("municipio", &["municipio"], "APARTADO"),
    text("cod_municipio", &["codigo_dane"], "05045"),
    text("departamento", &["departamento"], "ANTIOQUIA"),
    text("genero", &["genero"], ""),
    text("grupo_etario", &["grupo_etario"], ""),
    count("cantidad", &["cantidad"]),
];

const VICTIMAS: &[Field] = &[
    text("cod_municipio", &["cod_ciudad_muni"], "5045"),
    text("municipio", &["ciudad_municipio"], "Apartado"),
    text("departamento", &["estado_depto"], "Antioquia"),
    text("hecho", &["hecho"], ""),
    text("sexo", &["sexo"], ""),
    text("etnia", &["etnia"], ""),
    text("ciclo_vital", &["ciclo_vital"], ""),
    text("discapacidad", &["discapacidad"], ""),
    count("personas", &["per_ocu"]),
    count("eventos", &["eventos"]),
    date("fecha_corte", &["fecha_corte"]),
];

pub const SCORE_COLUMNS: [&str; 5] =
    ["punt_lectura_critica", "punt_matematicas", "punt_c_naturales", "punt_sociales", "punt_ingles"];

const ICFES: &[Field] = &[
    text("periodo", &["periodo"], ""),
    text("cole_nombre", &["cole_nombre_establecimiento"], ""),
    text("cole_cod_dane", &["cole_cod_dane_establecimiento"], ""),
    text("cole_mcpio", &["cole_mcpio_ubicacion"], ""),
    text("estu_genero", &["estu_genero"], ""),
    score("punt_lectura_critica", &["punt_lectura_critica"]),
    score("punt_matematicas", &["punt_matematicas"]),
    score("punt_c_naturales", &["punt_c_naturales"]),
    score("punt_sociales", &["punt_sociales", "punt_sociales_ciudadanas"]),
    score("punt_ingles", &["punt_ingles"]),
];

const IPS_SALUD: &[Field] = &[
    text("codigo_habilitacion", &["codigoprestador"], ""),
    text("nombre", &["nombreprestador"], ""),
    text("municipio", &["municipioprestadordesc"], "APARTADÓ"),
    text("cod_municipio", &["municipio_prestador"], "05045"),
    text("departamento", &["departamentoprestadordesc"], "Antioquia"),
    text("clase_persona", &["claseprestador"], ""),
    text("nivel_atencion", &[], ""),
    text("caracter", &[], ""),
    text("direccion", &["direcci_nsede", "direccionprestador"], ""),
    text("telefono", &["t_lefonosede", "telefonoprestador"], ""),
];

const ESTABLECIMIENTOS: &[Field] = &[
    text("codigo_dane", &["codigo_dane"], ""),
    text("nombre", &["nombre_establecimiento"], ""),
    text("municipio", &["municipio"], "Apartadó"),
    text("cod_municipio", &["cod_dane_municipio"], "5045"),
    text("sector", &["sector"], ""),
    text("calendario", &["calendario"], ""),
    text("direccion", &["direccion"], ""),
    text("telefono", &[], ""),
    count("total_matricula", &["total_matricula"]),
    count("cantidad_sedes", &["cantidad_sedes"]),
];

pub const TABLES: [TableMap; 8] = [
    TableMap { file: "seguridad/homicidios_apartado.json", schema: "seguridad", table: "homicidios", fields: HOMICIDIOS },
    TableMap { file: "seguridad/hurtos_apartado.json", schema: "seguridad", table: "hurtos", fields: HURTOS },
    TableMap {
        file: "seguridad/violencia_intrafamiliar_apartado.json",
        schema: "seguridad",
        table: "violencia_intrafamiliar",
        fields: VIOLENCIA_INTRAFAMILIAR,
    },
    TableMap {
        file: "seguridad/delitos_sexuales_apartado.json",
        schema: "seguridad",
        table: "delitos_sexuales",
        fields: DELITOS_SEXUALES,
    },
    TableMap { file: "conflicto/victimas_apartado.json", schema: "seguridad", table: "victimas_conflicto", fields: VICTIMAS },
    TableMap { file: "educacion/icfes_apartado.json", schema: "socioeconomico", table: "icfes", fields: ICFES },
    TableMap { file: "salud/ips_apartado.json", schema: "socioeconomico", table: "ips_salud", fields: IPS_SALUD },
    TableMap {
        file: "educacion/establecimientos_apartado.json",
        schema: "socioeconomico",
        table: "establecimientos_educativos",
        fields: ESTABLECIMIENTOS,
    },
];

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    for map in &TABLES {
        let name = format!("{}.{}", map.schema, map.table);
        report.record(&name, load(ctx, map).await);
    }
}

async fn load(ctx: &EtlContext, map: &TableMap) -> Result<LoadOutcome, EtlError> {
    let source = read_json_frame(ctx, map.file)?;
    let (mut frame, mut types) = apply_map(&source, map.fields, &ctx.config.dane_code);
    if map.table == "icfes" {
        add_global_score(&mut frame);
        types.push(ColumnType::Double);
    }
    let rows = replace_table_typed(&ctx.pool, map.schema, map.table, &frame, &types).await?;
    info!("{}.{}: {}/{} rows", map.schema, map.table, rows, source.len());
    Ok(LoadOutcome::rows(rows))
}

/// Builds the typed frame (`dane_code` first) and its declared column types.
pub fn apply_map(source: &Frame, fields: &[Field], dane_code: &str) -> (Frame, Vec<ColumnType>) {
    let mut columns = vec!["dane_code".to_string()];
    columns.extend(fields.iter().map(|f| f.target.to_string()));
    let mut types = vec![ColumnType::Text];
    types.extend(fields.iter().map(|f| f.kind.column_type()));

    let sources: Vec<Option<usize>> = fields
        .iter()
        .map(|f| f.sources.iter().find_map(|s| source.column_index(s)))
        .collect();

    let mut frame = Frame::new(columns);
    for row in &source.rows {
        let mut out = Vec::with_capacity(fields.len() + 1);
        out.push(Cell::Text(dane_code.to_string()));
        for (field, idx) in fields.iter().zip(&sources) {
            out.push(match idx {
                Some(i) => convert(&row[*i], field.kind),
                None => fallback(field.fallback),
            });
        }
        frame.push_row(out);
    }
    (frame, types)
}

fn convert(cell: &Cell, kind: Kind) -> Cell {
    match kind {
        Kind::Text => cell.to_text().map(Cell::Text).unwrap_or(Cell::Null),
        Kind::Integer => Cell::Int(cell.as_f64().map(|f| f.trunc() as i64).unwrap_or(0)),
        Kind::Float => cell.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        Kind::Timestamp => match cell {
            Cell::Timestamp(_) => cell.clone(),
            Cell::Text(s) => parse_timestamp(s).map(Cell::Timestamp).unwrap_or(Cell::Null),
            _ => Cell::Null,
        },
    }
}

fn fallback(value: Fallback) -> Cell {
    match value {
        Fallback::Null => Cell::Null,
        Fallback::Text(s) => Cell::Text(s.to_string()),
        Fallback::Zero => Cell::Int(0),
    }
}

/// `punt_global`: row mean of the subject scores present anywhere in the
/// table, rounded to two decimals.
pub fn add_global_score(frame: &mut Frame) {
    let available: Vec<usize> = SCORE_COLUMNS
        .iter()
        .filter_map(|c| frame.column_index(c))
        .filter(|&i| frame.rows.iter().any(|r| !r[i].is_null()))
        .collect();
    let values = frame
        .rows
        .iter()
        .map(|row| {
            let scores: Vec<f64> = available.iter().filter_map(|&i| row[i].as_f64()).collect();
            if scores.is_empty() {
                Cell::Null
            } else {
                let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                Cell::Float((mean * 100.0).round() / 100.0)
            }
        })
        .collect();
    frame.set_column("punt_global", values);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: serde_json::Value) -> Frame {
        let records: Vec<_> = value.as_array().unwrap().iter().map(|r| r.as_object().unwrap().clone()).collect();
        Frame::from_records(&records)
    }

    #[test]
    fn maps_sources_with_fallbacks() {
        let src = source(json!([
            {"fecha_hecho": "2022-05-01T00:00:00.000", "cantidad": "2", "sexo": "MASCULINO"},
            {"fecha_hecho": "sin fecha", "cantidad": null, "sexo": "FEMENINO"}
        ]));
        let (frame, types) = apply_map(&src, HOMICIDIOS, "05045");
        assert_eq!(frame.columns[0], "dane_code");
        assert_eq!(frame.columns.len(), HOMICIDIOS.len() + 1);
        assert_eq!(types.len(), frame.columns.len());

        let row = &frame.rows[0];
        assert_eq!(row[0], Cell::Text("05045".into()));
        assert!(matches!(row[1], Cell::Timestamp(_)));
        assert_eq!(row[2], Cell::Text("APARTADO".into()));
        assert_eq!(row[5], Cell::Text("MASCULINO".into()));
        assert_eq!(row[8], Cell::Int(2));

        assert_eq!(frame.rows[1][1], Cell::Null);
        assert_eq!(frame.rows[1][8], Cell::Int(0));
    }

    #[test]
    fn sociales_falls_back_to_ciudadanas() {
        let src = source(json!([{"punt_sociales_ciudadanas": "55", "punt_matematicas": 60}]));
        let (frame, _) = apply_map(&src, ICFES, "05045");
        let idx = frame.column_index("punt_sociales").unwrap();
        assert_eq!(frame.rows[0][idx], Cell::Float(55.0));
    }

    #[test]
    fn global_score_is_rounded_mean() {
        let src = source(json!([
            {"punt_matematicas": 50, "punt_lectura_critica": 61, "punt_ingles": 60},
            {"punt_matematicas": null, "punt_lectura_critica": null}
        ]));
        let (mut frame, _) = apply_map(&src, ICFES, "05045");
        add_global_score(&mut frame);
        let idx = frame.column_index("punt_global").unwrap();
        assert_eq!(frame.rows[0][idx], Cell::Float(57.0));
        assert_eq!(frame.rows[1][idx], Cell::Null);

        let src = source(json!([{"punt_matematicas": 50, "punt_ingles": 51, "punt_lectura_critica": 51}]));
        let (mut frame, _) = apply_map(&src, ICFES, "05045");
        add_global_score(&mut frame);
        assert_eq!(frame.rows[0][frame.columns.len() - 1], Cell::Float(50.67));
    }
}
