use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize)]
pub struct DaneQuery {
    pub dane_code: Option<String>,
}

#[derive(Deserialize)]
pub struct AggregateQuery {
    pub dane_code: Option<String>,
    pub aggregate: Option<String>,
}

#[derive(Deserialize)]
pub struct TerridataQuery {
    pub dane_code: Option<String>,
    pub dimension: Option<String>,
}

#[derive(Deserialize)]
pub struct SerieQuery {
    pub dane_code: Option<String>,
    pub tipo: Option<String>,
}

#[derive(Serialize)]
pub struct TurismoResponse {
    pub total: usize,
    pub detalle: Vec<Value>,
}

#[derive(Serialize)]
pub struct PobrezaResponse {
    pub terridata: Vec<Value>,
    pub ipm_detalle: Vec<Value>,
}

#[derive(Serialize)]
pub struct TurismoDetalleResponse {
    pub total: i64,
    pub por_categoria: Map<String, Value>,
}

pub const TERRIDATA: &str = "socioeconomico.terridata";

/// Google Places labels counted as tourism offer.
pub const TURISMO_CATEGORIES: [&str; 4] = ["Restaurantes", "Hoteles", "Cafeterías", "Bares"];

/// Typed crime table for a series; unknown kinds fall back to homicides.
pub fn serie_table(tipo: Option<&str>) -> &'static str {
    match tipo {
        Some("hurtos") => "seguridad.hurtos",
        Some("vif") => "seguridad.violencia_intrafamiliar",
        Some("delitos_sexuales") => "seguridad.delitos_sexuales",
        _ => "seguridad.homicidios",
    }
}

pub fn turismo_categories_sql() -> String {
    let quoted: Vec<String> = TURISMO_CATEGORIES.iter().map(|c| format!("'{}'", c)).collect();
    format!("category IN ({})", quoted.join(", "))
}

/// Keys each row by its `category`, summing `total`.
pub fn group_by_category(rows: Vec<Value>) -> TurismoDetalleResponse {
    let mut total = 0;
    let mut por_categoria = Map::new();
    for row in rows {
        total += row.get("total").and_then(Value::as_i64).unwrap_or(0);
        let key = match row.get("category") {
            Some(Value::String(s)) => s.clone(),
            _ => "sin_categoria".to_string(),
        };
        por_categoria.insert(key, row);
    }
    TurismoDetalleResponse { total, por_categoria }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_serie_falls_back_to_homicidios() {
        assert_eq!(serie_table(Some("hurtos")), "seguridad.hurtos");
        assert_eq!(serie_table(Some("vif")), "seguridad.violencia_intrafamiliar");
        assert_eq!(serie_table(Some("abigeato")), "seguridad.homicidios");
        assert_eq!(serie_table(None), "seguridad.homicidios");
    }

    #[test]
    fn groups_tourism_by_category() {
        let grouped = group_by_category(vec![
            json!({"category": "Restaurantes", "total": 40, "avg_rating": 4.2}),
            json!({"category": "Hoteles", "total": 12, "avg_rating": null}),
        ]);
        assert_eq!(grouped.total, 52);
        assert_eq!(grouped.por_categoria["Hoteles"]["total"], 12);
    }

    #[test]
    fn category_filter_sql() {
        assert_eq!(turismo_categories_sql(), "category IN ('Restaurantes', 'Hoteles', 'Cafeterías', 'Bares')");
    }
}
