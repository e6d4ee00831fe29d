use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::info;
use sqlx::PgPool;

use crate::config::{uraba_dane_codes, Config};
use crate::errors::EtlError;
use crate::etl::pipelines;
use crate::etl::report::EtlReport;

/// Shared state handed to every pipeline step.
pub struct EtlContext {
    pub pool: PgPool,
    pub config: Config,
    pub codes: Vec<&'static str>,
}

impl EtlContext {
    pub fn new(pool: PgPool, config: Config) -> Self {
        EtlContext { pool, config, codes: uraba_dane_codes() }
    }

    pub fn data_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.config.data_dir.join(relative)
    }

    /// Resolves a data file, failing with `NotFound` so the report marks it skipped.
    pub fn require(&self, relative: impl AsRef<Path>) -> Result<PathBuf, EtlError> {
        let path = self.data_path(relative);
        if path.exists() {
            Ok(path)
        } else {
            Err(EtlError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Cartografia,
    Catastro,
    Socioeconomico,
    Seguridad,
    Terridata,
    Places,
    Regional,
    Critical,
    Empleo,
    Completeness,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Cartografia,
        Stage::Catastro,
        Stage::Socioeconomico,
        Stage::Seguridad,
        Stage::Terridata,
        Stage::Places,
        Stage::Regional,
        Stage::Critical,
        Stage::Empleo,
        Stage::Completeness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Cartografia => "cartografia",
            Stage::Catastro => "catastro",
            Stage::Socioeconomico => "socioeconomico",
            Stage::Seguridad => "seguridad",
            Stage::Terridata => "terridata",
            Stage::Places => "places",
            Stage::Regional => "regional",
            Stage::Critical => "critical",
            Stage::Empleo => "empleo",
            Stage::Completeness => "completeness",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Cartografia => "límite municipal, OSM, IGAC y manzanas MGN",
            Stage::Catastro => "terrenos, construcciones, sectores y veredas",
            Stage::Socioeconomico => "IPM, NBI, educación, salud y servicios públicos",
            Stage::Seguridad => "delitos y víctimas (tablas crudas)",
            Stage::Terridata => "indicadores TerriData del DNP",
            Stage::Places => "negocios de Google Places",
            Stage::Regional => "catálogo regional de Urabá",
            Stage::Critical => "tablas tipadas para la API",
            Stage::Empleo => "enriquecimiento de ofertas laborales",
            Stage::Completeness => "reporte de completitud de datos",
        }
    }

    async fn run(self, ctx: &EtlContext, report: &mut EtlReport) {
        match self {
            Stage::Cartografia => pipelines::cartografia::run(ctx, report).await,
            Stage::Catastro => pipelines::catastro::run(ctx, report).await,
            Stage::Socioeconomico => pipelines::socioeconomico::run(ctx, report).await,
            Stage::Seguridad => pipelines::seguridad::run(ctx, report).await,
            Stage::Terridata => pipelines::terridata::run(ctx, report).await,
            Stage::Places => pipelines::places::run(ctx, report).await,
            Stage::Regional => pipelines::regional::run(ctx, report).await,
            Stage::Critical => pipelines::critical::run(ctx, report).await,
            Stage::Empleo => pipelines::empleo::run(ctx, report).await,
            Stage::Completeness => pipelines::completeness::run(ctx, report).await,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the given stages in order. Failures are recorded, never propagated.
pub async fn run_stages(ctx: &EtlContext, stages: &[Stage]) -> EtlReport {
    let mut report = EtlReport::new();
    info!("ETL run {} ({} stages)", report.run_id, stages.len());
    for stage in stages {
        info!("== {} ==", stage);
        stage.run(ctx, &mut report).await;
    }
    report
}
