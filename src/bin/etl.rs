use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use observatorio_backend::config::Config;
use observatorio_backend::db;
use observatorio_backend::etl::report::Status;
use observatorio_backend::etl::runner::{run_stages, EtlContext, Stage};

#[derive(Parser, Debug)]
#[command(version, about = "Carga los datos abiertos del observatorio a PostgreSQL/PostGIS", long_about = None)]
struct Cli {
    /// Directory holding the downloaded source files (overrides DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory where the run reports are written (overrides DOCS_DIR).
    #[arg(long)]
    docs_dir: Option<PathBuf>,

    /// Run only these stages, in the given order. Repeatable.
    #[arg(long = "only", value_enum)]
    only: Vec<Stage>,

    /// Print the available stages and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.list {
        for stage in Stage::ALL {
            println!("{:<16}{}", stage.name(), stage.description());
        }
        return ExitCode::SUCCESS;
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.docs_dir {
        config.docs_dir = dir;
    }

    let pool = match db::connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("No se pudo conectar a PostgreSQL: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Conexion a PostgreSQL: OK");

    let stages = if cli.only.is_empty() { Stage::ALL.to_vec() } else { cli.only };
    let docs_dir = config.docs_dir.clone();
    let ctx = EtlContext::new(pool, config);
    let report = run_stages(&ctx, &stages).await;

    info!("RESUMEN ETL: {}", report.summary());
    match report.write(&docs_dir) {
        Ok(path) => info!("Reporte guardado en: {}", path.display()),
        Err(e) => error!("No se pudo guardar el reporte: {}", e),
    }

    if report.count(Status::Error) == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
