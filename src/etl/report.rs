//! Per-dataset outcome bookkeeping for an ETL run.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::EtlError;

const MAX_DETAIL_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
    Skip,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetResult {
    pub dataset: String,
    pub status: Status,
    pub registros: u64,
    pub detalle: String,
}

/// What a successful load step returns.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub rows: u64,
    pub detail: String,
}

impl LoadOutcome {
    pub fn rows(rows: u64) -> Self {
        LoadOutcome { rows, detail: String::new() }
    }

    pub fn with_detail(rows: u64, detail: impl Into<String>) -> Self {
        LoadOutcome { rows, detail: detail.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct EtlReport {
    pub run_id: Uuid,
    pub results: Vec<DatasetResult>,
}

impl EtlReport {
    pub fn new() -> Self {
        EtlReport { run_id: Uuid::new_v4(), results: Vec::new() }
    }

    pub fn record(&mut self, dataset: &str, outcome: Result<LoadOutcome, EtlError>) {
        let result = match outcome {
            Ok(o) => {
                info!("[OK] {}: {} registros {}", dataset, o.rows, o.detail);
                DatasetResult { dataset: dataset.to_string(), status: Status::Ok, registros: o.rows, detalle: o.detail }
            }
            Err(EtlError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("[SKIP] {}: archivo no encontrado", dataset);
                DatasetResult {
                    dataset: dataset.to_string(),
                    status: Status::Skip,
                    registros: 0,
                    detalle: "Archivo no encontrado".to_string(),
                }
            }
            Err(e) => {
                error!("[FAIL] {}: {}", dataset, e);
                DatasetResult {
                    dataset: dataset.to_string(),
                    status: Status::Error,
                    registros: 0,
                    detalle: truncate_detail(&e.to_string()),
                }
            }
        };
        self.results.push(result);
    }

    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn total_rows(&self) -> u64 {
        self.results
            .iter()
            .filter(|r| r.status == Status::Ok)
            .map(|r| r.registros)
            .sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "Exitosos: {} | Fallidos: {} | Omitidos: {} | Total registros cargados: {}",
            self.count(Status::Ok),
            self.count(Status::Error),
            self.count(Status::Skip),
            self.total_rows()
        )
    }

    /// Writes `etl_report.json` into `docs_dir` and returns its path.
    pub fn write(&self, docs_dir: &Path) -> Result<PathBuf, EtlError> {
        fs::create_dir_all(docs_dir)?;
        let path = docs_dir.join("etl_report.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

impl Default for EtlReport {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_detail(detail: &str) -> String {
    detail.chars().take(MAX_DETAIL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_skipped() {
        let mut report = EtlReport::new();
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        report.record("ipm", Err(EtlError::Io(missing)));
        report.record("nbi", Ok(LoadOutcome::with_detail(12, "(tabla completa)")));
        report.record("icfes", Err(EtlError::NoData("x".repeat(300))));

        assert_eq!(report.results[0].status, Status::Skip);
        assert_eq!(report.count(Status::Ok), 1);
        assert_eq!(report.count(Status::Error), 1);
        assert_eq!(report.results[2].detalle.chars().count(), MAX_DETAIL_LEN);
        assert_eq!(report.total_rows(), 12);
    }

    #[test]
    fn writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = EtlReport::new();
        report.record("osm_vias", Ok(LoadOutcome::rows(3)));
        let path = report.write(dir.path()).unwrap();

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["results"][0]["status"], "ok");
        assert_eq!(written["results"][0]["registros"], 3);
    }
}
