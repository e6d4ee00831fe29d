//! DNP TerriData indicators workbook into `socioeconomico.terridata`.

use std::collections::HashMap;

use log::info;

use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame};
use crate::etl::heuristics::parse_spanish_number;
use crate::etl::loader::{create_indexes, replace_table};
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;
use crate::etl::sources::excel::read_sheet;

const SHEET: &str = "Datos";

const COLUMN_MAP: [(&str, &str); 13] = [
    ("Código Departamento", "codigo_departamento"),
    ("Departamento", "departamento"),
    ("Código Entidad", "codigo_entidad"),
    ("Entidad", "entidad"),
    ("Dimensión", "dimension"),
    ("Subcategoría", "subcategoria"),
    ("Indicador", "indicador"),
    ("Dato Numérico", "dato_numerico"),
    ("Dato Cualitativo", "dato_cualitativo"),
    ("Año", "anio"),
    ("Mes", "mes"),
    ("Fuente", "fuente"),
    ("Unidad de Medida", "unidad_de_medida"),
];

const INTEGER_COLUMNS: [&str; 4] = ["codigo_departamento", "codigo_entidad", "anio", "mes"];

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    report.record("terridata", load(ctx).await);
}

async fn load(ctx: &EtlContext) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require(format!("terridata/TerriData{}f.xlsx", ctx.config.dane_code))?;
    let raw = read_sheet(&path, Some(SHEET))?;
    info!("terridata: {} raw rows", raw.len());
    let frame = clean(raw);
    info!("terridata: {} clean rows", frame.len());

    let rows = replace_table(&ctx.pool, "socioeconomico", "terridata", &frame).await?;
    create_indexes(&ctx.pool, "socioeconomico", "terridata", &["dimension", "indicador", "anio", "dane_code"]).await?;
    Ok(LoadOutcome::rows(rows))
}

pub fn clean(mut frame: Frame) -> Frame {
    let entity = frame.column_index("Código Entidad");
    let department = frame.column_index("Código Departamento");
    let before = frame.len();
    frame.retain_rows(|row| {
        let present = |idx: Option<usize>| idx.map(|i| !row[i].is_null()).unwrap_or(false);
        present(entity) || present(department)
    });
    info!("terridata: {} junk rows removed", before - frame.len());

    let mapping: HashMap<&str, &str> = COLUMN_MAP.into_iter().collect();
    frame.rename_columns(&mapping);
    frame.clean_columns();

    frame.map_column("dato_numerico", |cell| {
        parse_spanish_number(cell).map(Cell::Float).unwrap_or(Cell::Null)
    });
    for column in INTEGER_COLUMNS {
        frame.map_column(column, to_integer);
    }

    let dane_codes = frame
        .column("codigo_entidad")
        .map(|cells| {
            cells
                .into_iter()
                .map(|cell| match cell {
                    Cell::Int(code) => Cell::Text(format!("{:05}", code)),
                    _ => Cell::Null,
                })
                .collect()
        })
        .unwrap_or_default();
    frame.set_column("dane_code", dane_codes);
    frame
}

fn to_integer(cell: &Cell) -> Cell {
    match cell {
        Cell::Int(_) => cell.clone(),
        other => other
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| Cell::Int(f as i64))
            .unwrap_or(Cell::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Frame {
        let mut frame = Frame::new(
            ["Código Departamento", "Código Entidad", "Dimensión", "Indicador", "Dato Numérico", "Año"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        frame.push_row(vec![
            Cell::Null,
            Cell::Null,
            Cell::Text("aaaa".into()),
            Cell::Text("aaaa".into()),
            Cell::Text("aaaa".into()),
            Cell::Null,
        ]);
        frame.push_row(vec![
            Cell::Float(5.0),
            Cell::Float(5045.0),
            Cell::Text("Economía".into()),
            Cell::Text("Valor agregado".into()),
            Cell::Text("58.868.473.856,00".into()),
            Cell::Text("2021".into()),
        ]);
        frame
    }

    #[test]
    fn drops_junk_and_normalizes() {
        let frame = clean(sheet());
        assert_eq!(frame.len(), 1);
        assert_eq!(
            frame.columns,
            vec!["codigo_departamento", "codigo_entidad", "dimension", "indicador", "dato_numerico", "anio", "dane_code"]
        );
        let row = &frame.rows[0];
        assert_eq!(row[1], Cell::Int(5045));
        assert_eq!(row[4], Cell::Float(58868473856.0));
        assert_eq!(row[5], Cell::Int(2021));
        assert_eq!(row[6], Cell::Text("05045".into()));
    }
}
