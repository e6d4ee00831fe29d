use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Job boards the upstream scraper collects from.
pub const FUENTES: [&str; 7] = ["computrabajo", "elempleo", "sena", "linkedin", "comfama", "comfenalco", "indeed"];

#[derive(Deserialize)]
pub struct OfertasQuery {
    pub municipio: Option<String>,
    pub fuente: Option<String>,
    pub busqueda: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct EmpleoStats {
    pub por_municipio: Vec<Value>,
    pub por_fuente: Vec<Value>,
    pub top_empresas: Vec<Value>,
}

pub fn validate_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    match limit.unwrap_or(DEFAULT_LIMIT) {
        n if (0..=MAX_LIMIT).contains(&n) => Ok(n),
        n => Err(ApiError::BadRequest(format!("limit debe estar entre 0 y {} (recibido {})", MAX_LIMIT, n))),
    }
}

/// `%term%` for ILIKE, with the LIKE wildcards in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_bounds() {
        assert_eq!(validate_limit(None).unwrap(), 100);
        assert_eq!(validate_limit(Some(1000)).unwrap(), 1000);
        assert!(validate_limit(Some(1001)).is_err());
        assert_eq!(validate_limit(Some(0)).unwrap(), 0);
        assert!(validate_limit(Some(-1)).is_err());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Apartadó"), "%Apartadó%");
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }
}
