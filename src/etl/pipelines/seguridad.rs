use crate::etl::frame::Frame;
use crate::etl::pipelines::load_raw_json;
use crate::etl::report::EtlReport;
use crate::etl::runner::EtlContext;

// (dataset, file under seguridad/, table)
const CRIME_DATASETS: [(&str, &str, &str); 4] = [
    ("homicidios", "homicidios_apartado.json", "homicidios_raw"),
    ("hurtos", "hurtos_apartado.json", "hurtos_raw"),
    ("delitos_sexuales", "delitos_sexuales_apartado.json", "delitos_sexuales_raw"),
    ("violencia_intrafamiliar", "violencia_intrafamiliar_apartado.json", "violencia_intrafamiliar_raw"),
];

const VICTIM_NUMERIC_COLUMNS: [&str; 3] = ["per_ocu", "eventos", "personas"];

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    for (dataset, file, table) in CRIME_DATASETS {
        let relative = format!("seguridad/{}", file);
        report.record(dataset, load_raw_json(ctx, &relative, "seguridad", table, prepare_crimes).await);
    }
    report.record(
        "victimas_conflicto",
        load_raw_json(ctx, "conflicto/victimas_apartado.json", "seguridad", "victimas_raw", prepare_victims).await,
    );
}

fn prepare_crimes(frame: &mut Frame) {
    let dates: Vec<String> = frame.columns.iter().filter(|c| c.contains("fecha")).cloned().collect();
    for column in dates {
        frame.coerce_timestamp(&column);
    }
    frame.coerce_numeric("cantidad");
}

fn prepare_victims(frame: &mut Frame) {
    for column in VICTIM_NUMERIC_COLUMNS {
        frame.coerce_numeric(column);
    }
}
