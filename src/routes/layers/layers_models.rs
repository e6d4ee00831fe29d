use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::layer::Layer;

pub const DEFAULT_GEOJSON_LIMIT: i64 = 5000;

#[derive(Serialize)]
pub struct LayerSummary {
    #[serde(flatten)]
    pub layer: &'static Layer,
    pub record_count: i64,
}

#[derive(Deserialize)]
pub struct GeojsonQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct LayerStats {
    pub layer_id: &'static str,
    pub name: &'static str,
    pub record_count: i64,
    pub bbox: Option<String>,
    pub columns: Vec<Value>,
}
