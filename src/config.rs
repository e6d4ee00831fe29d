use std::env;
use std::path::PathBuf;

use dotenv::dotenv;

use crate::errors::ConfigError;

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_DANE_CODE: &str = "05045";
pub const DEFAULT_MUNICIPALITY_NAME: &str = "Apartadó";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Bounding box used to pre-filter national shapefiles down to Apartadó.
pub const APARTADO_BBOX: BBox = BBox { min_x: -76.80, min_y: 7.70, max_x: -76.35, max_y: 8.10 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

pub struct Municipio {
    pub dane_code: &'static str,
    pub name: &'static str,
    pub bbox: BBox,
}

const fn municipio(dane_code: &'static str, name: &'static str, b: [f64; 4]) -> Municipio {
    Municipio {
        dane_code,
        name,
        bbox: BBox { min_x: b[0], min_y: b[1], max_x: b[2], max_y: b[3] },
    }
}

// Urabá subregion
pub const MUNICIPIOS: [Municipio; 11] = [
    municipio("05045", "Apartadó", [-76.80, 7.70, -76.35, 8.10]),
    municipio("05051", "Arboletes", [-76.60, 8.70, -76.20, 9.10]),
    municipio("05147", "Carepa", [-76.80, 7.60, -76.40, 7.95]),
    municipio("05172", "Chigorodó", [-76.85, 7.50, -76.30, 7.85]),
    municipio("05475", "Murindó", [-77.00, 6.80, -76.50, 7.20]),
    municipio("05480", "Mutatá", [-76.60, 7.10, -76.20, 7.50]),
    municipio("05490", "Necoclí", [-77.00, 8.30, -76.50, 8.70]),
    municipio("05659", "San Juan", [-76.70, 8.80, -76.30, 9.20]),
    municipio("05665", "San Pedro", [-76.50, 8.10, -76.10, 8.50]),
    municipio("05837", "Turbo", [-77.10, 7.90, -76.40, 8.60]),
    municipio("05873", "Vigía", [-77.10, 6.40, -76.40, 7.00]),
];

pub fn uraba_dane_codes() -> Vec<&'static str> {
    MUNICIPIOS.iter().map(|m| m.dane_code).collect()
}

/// Envelope of every municipality in the subregion.
pub fn uraba_bbox() -> BBox {
    MUNICIPIOS.iter().skip(1).fold(MUNICIPIOS[0].bbox, |acc, m| BBox {
        min_x: acc.min_x.min(m.bbox.min_x),
        min_y: acc.min_y.min(m.bbox.min_y),
        max_x: acc.max_x.max(m.bbox.max_x),
        max_y: acc.max_y.max(m.bbox.max_y),
    })
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_address: String,
    pub dane_code: String,
    pub municipality_name: String,
    pub data_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub max_connections: u32,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid("DB_MAX_CONNECTIONS", raw))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        let dane_code = env_or("DANE_CODE", DEFAULT_DANE_CODE);
        if dane_code.len() != 5 || !dane_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid("DANE_CODE", dane_code));
        }

        Ok(Config {
            database_url,
            server_address: env_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            dane_code,
            municipality_name: env_or("MUNICIPALITY_NAME", DEFAULT_MUNICIPALITY_NAME),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            docs_dir: PathBuf::from(env_or("DOCS_DIR", "docs")),
            max_connections,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_intersection() {
        let inside = BBox { min_x: -76.7, min_y: 7.8, max_x: -76.6, max_y: 7.9 };
        let outside = BBox { min_x: -75.0, min_y: 6.0, max_x: -74.9, max_y: 6.1 };
        assert!(APARTADO_BBOX.intersects(&inside));
        assert!(!APARTADO_BBOX.intersects(&outside));
    }

    #[test]
    fn registry_has_apartado_first() {
        let codes = uraba_dane_codes();
        assert_eq!(codes.len(), 11);
        assert_eq!(codes[0], DEFAULT_DANE_CODE);
        assert!(codes.iter().all(|c| c.starts_with("05")));
    }

    #[test]
    fn subregion_envelope_covers_every_municipality() {
        let uraba = uraba_bbox();
        assert_eq!(uraba, BBox { min_x: -77.10, min_y: 6.40, max_x: -76.10, max_y: 9.20 });
        assert!(MUNICIPIOS.iter().all(|m| uraba.intersects(&m.bbox)));
    }
}
