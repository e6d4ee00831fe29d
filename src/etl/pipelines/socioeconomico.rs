//! Poverty spreadsheets plus the raw education, health and utilities exports.

use log::info;

use crate::errors::EtlError;
use crate::etl::frame::Frame;
use crate::etl::heuristics::row_mentions_code;
use crate::etl::loader::replace_table;
use crate::etl::pipelines::load_raw_json;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;
use crate::etl::sources::excel::read_sheet;

const SCHEMA: &str = "socioeconomico";

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    report.record("ipm", load_poverty_sheet(ctx, "socioeconomico/ipm/ipm_municipal.xls", "ipm_raw").await);
    report.record("nbi", load_poverty_sheet(ctx, "socioeconomico/nbi/nbi_municipios.xls", "nbi_raw").await);
    report.record(
        "establecimientos_educativos",
        load_raw_json(ctx, "educacion/establecimientos_apartado.json", SCHEMA, "establecimientos_educativos_raw", |_| {}).await,
    );
    report.record(
        "icfes",
        load_raw_json(ctx, "educacion/icfes_apartado.json", SCHEMA, "icfes_raw", coerce_scores).await,
    );
    report.record("ips_salud", load_raw_json(ctx, "salud/ips_apartado.json", SCHEMA, "ips_raw", |_| {}).await);
    report.record(
        "servicios_publicos",
        load_raw_json(ctx, "servicios_publicos/prestadores_apartado.json", "servicios", "prestadores_raw", |_| {}).await,
    );
}

/// Keeps only the rows that mention the municipality; when none do the whole
/// sheet is loaded and the outcome says so.
async fn load_poverty_sheet(ctx: &EtlContext, relative: &str, table: &str) -> Result<LoadOutcome, EtlError> {
    let path = ctx.require(relative)?;
    let mut frame = read_sheet(&path, None)?;
    info!("{}: {} rows x {} columns", relative, frame.len(), frame.columns.len());
    frame.clean_columns();

    let full = !filter_municipality(&mut frame, &ctx.config.dane_code);
    let rows = replace_table(&ctx.pool, SCHEMA, table, &frame).await?;
    if full {
        Ok(LoadOutcome::with_detail(rows, "(tabla completa)"))
    } else {
        Ok(LoadOutcome::rows(rows))
    }
}

/// Returns false (and leaves the frame untouched) when no row mentions `code`.
fn filter_municipality(frame: &mut Frame, code: &str) -> bool {
    if !frame.rows.iter().any(|row| row_mentions_code(row, code)) {
        return false;
    }
    frame.retain_rows(|row| row_mentions_code(row, code));
    true
}

fn coerce_scores(frame: &mut Frame) {
    let scores: Vec<String> = frame
        .columns
        .iter()
        .filter(|c| c.contains("punt_") || c.contains("puntaje"))
        .cloned()
        .collect();
    for column in scores {
        frame.coerce_numeric(&column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::frame::Cell;

    #[test]
    fn filters_rows_mentioning_the_municipality() {
        let mut frame = Frame::new(vec!["codigo".into(), "ipm".into()]);
        frame.push_row(vec![Cell::Int(5045), Cell::Float(48.1)]);
        frame.push_row(vec![Cell::Text("05837".into()), Cell::Float(60.2)]);
        assert!(filter_municipality(&mut frame, "05045"));
        assert_eq!(frame.len(), 1);

        let mut other = Frame::new(vec!["codigo".into()]);
        other.push_row(vec![Cell::Text("05837".into())]);
        assert!(!filter_municipality(&mut other, "05045"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn score_columns_become_numeric() {
        let mut frame = Frame::new(vec!["punt_global".into(), "periodo".into()]);
        frame.push_row(vec![Cell::Text("251".into()), Cell::Text("20194".into())]);
        coerce_scores(&mut frame);
        assert_eq!(frame.rows[0], vec![Cell::Float(251.0), Cell::Text("20194".into())]);
    }
}
