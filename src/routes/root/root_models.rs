use serde::Serialize;
use serde_json::{Map, Value};

pub const API_NAME: &str = "Observatorio de Ciudades";
pub const API_VERSION: &str = "2.0.0";
pub const DEPARTAMENTO: &str = "Antioquia";

pub const ENDPOINTS: [(&str, &str); 20] = [
    ("layers", "/api/layers"),
    ("geo", "/api/geo/manzanas"),
    ("indicators", "/api/indicators"),
    ("crossvar", "/api/crossvar/variables"),
    ("stats", "/api/stats/summary"),
    ("catalog", "/api/stats/data-catalog"),
    ("terridata", "/api/indicators/terridata?dimension=Salud"),
    ("salud_irca", "/api/indicators/salud/irca"),
    ("salud_sivigila", "/api/indicators/salud/sivigila/resumen"),
    ("economia_internet", "/api/indicators/economia/internet/serie"),
    ("economia_secop", "/api/indicators/economia/secop"),
    ("economia_turismo", "/api/indicators/economia/turismo"),
    ("gobierno_finanzas", "/api/indicators/gobierno/finanzas"),
    ("gobierno_desempeno", "/api/indicators/gobierno/desempeno"),
    ("gobierno_digital", "/api/indicators/gobierno/digital"),
    ("gobierno_pobreza", "/api/indicators/gobierno/pobreza"),
    ("analytics_gaps", "/api/analytics/gaps"),
    ("analytics_clusters", "/api/analytics/clusters"),
    ("empleo_ofertas", "/api/empleo/ofertas"),
    ("empleo_stats", "/api/empleo/stats"),
];

#[derive(Serialize)]
pub struct DatabaseInfo {
    pub schemas: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: &'static str,
    pub municipio: String,
    pub departamento: &'static str,
    pub dane_code: String,
    pub database: DatabaseInfo,
    pub endpoints: Map<String, Value>,
}

pub fn endpoint_map() -> Map<String, Value> {
    ENDPOINTS
        .iter()
        .map(|(key, path)| (key.to_string(), Value::String(path.to_string())))
        .collect()
}
