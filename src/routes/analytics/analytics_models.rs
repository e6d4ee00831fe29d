use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

pub const DEFAULT_INDICADOR: &str = "Población total";
pub const POBREZA_INDICADOR: &str = "Incidencia de la pobreza monetaria";
pub const VALOR_AGREGADO_INDICADOR: &str = "Valor agregado municipal";

/// Leading `YYYY-MM-DD` of a scraped timestamp. Values that do not match
/// are counted as undated instead of being cast.
pub const FECHA_ISO_PATTERN: &str = "^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])";

#[derive(Deserialize)]
pub struct GapsQuery {
    pub dane_code: Option<String>,
    pub indicador: Option<String>,
}

#[derive(Deserialize)]
pub struct RankingQuery {
    pub indicador: Option<String>,
    pub order: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Termometro {
    pub municipio: Option<String>,
    pub ultimos_7_dias: i64,
    pub anteriores_7_dias: i64,
    pub tendencia: f64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct OfertaDemanda {
    pub municipio: String,
    pub vacantes: i64,
    pub poblacion: f64,
    pub vacantes_por_1000_hab: f64,
}

#[derive(Serialize, Debug, Default, PartialEq, Clone, Copy)]
pub struct ClusterIndicadores {
    pub poblacion: f64,
    pub pobreza: f64,
    pub pib: f64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Cluster {
    pub municipio: String,
    pub cluster: &'static str,
    pub descripcion: &'static str,
    pub indicadores: ClusterIndicadores,
}

/// SQL sort direction for a ranking; only `asc` and `desc` are accepted.
pub fn parse_order(order: Option<&str>) -> Result<&'static str, ApiError> {
    match order.map(str::to_ascii_lowercase).as_deref() {
        None | Some("desc") => Ok("DESC"),
        Some("asc") => Ok("ASC"),
        Some(other) => Err(ApiError::BadRequest(format!("order inválido: '{}' (use asc o desc)", other))),
    }
}

/// Week-over-week change in percent; an empty previous week counts as 1.
pub fn tendencia(ultimos: i64, anteriores: i64) -> f64 {
    (ultimos - anteriores) as f64 / anteriores.max(1) as f64 * 100.0
}

pub fn municipio_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Joins offer counts with population by normalized municipality name.
pub fn oferta_demanda(offers: &[(Option<String>, i64)], population: &[(String, Option<f64>)]) -> Vec<OfertaDemanda> {
    let by_key: HashMap<String, (&str, f64)> = population
        .iter()
        .filter_map(|(name, pop)| Some((municipio_key(name), (name.as_str(), (*pop)?))))
        .collect();

    offers
        .iter()
        .filter_map(|(municipio, vacantes)| {
            let (name, poblacion) = *by_key.get(&municipio_key(municipio.as_deref()?))?;
            if poblacion <= 0.0 {
                return None;
            }
            Some(OfertaDemanda {
                municipio: name.to_string(),
                vacantes: *vacantes,
                poblacion,
                vacantes_por_1000_hab: *vacantes as f64 * 1000.0 / poblacion,
            })
        })
        .collect()
}

/// Territorial profile; rules apply in order and the first match wins.
pub fn classify(ind: &ClusterIndicadores) -> (&'static str, &'static str) {
    if ind.poblacion > 100_000.0 {
        ("Nodo Urbano Regional", "Municipios con alta densidad poblacional y servicios centralizados.")
    } else if ind.pib > 1_000_000.0 {
        ("Eje Agroindustrial", "Municipios con fuerte base económica en banano/plátano y logística.")
    } else if ind.pobreza > 50.0 {
        ("Territorio en Desarrollo", "Municipios con altos retos sociales y brechas de infraestructura.")
    } else {
        ("Ruralidad Emergente", "Municipios con economías en transición y potencial turístico.")
    }
}

/// Pivots `(municipio, indicador, valor)` rows; missing values count as 0.
pub fn clusters(rows: &[(String, String, Option<f64>)]) -> Vec<Cluster> {
    let mut pivot: BTreeMap<&str, ClusterIndicadores> = BTreeMap::new();
    for (municipio, indicador, valor) in rows {
        let entry = pivot.entry(municipio.as_str()).or_default();
        let value = valor.unwrap_or(0.0);
        match indicador.as_str() {
            DEFAULT_INDICADOR => entry.poblacion = value,
            POBREZA_INDICADOR => entry.pobreza = value,
            VALOR_AGREGADO_INDICADOR => entry.pib = value,
            _ => {}
        }
    }
    pivot
        .into_iter()
        .map(|(municipio, indicadores)| {
            let (cluster, descripcion) = classify(&indicadores);
            Cluster { municipio: municipio.to_string(), cluster, descripcion, indicadores }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraped_dates_are_guarded() {
        let pattern = regex::Regex::new(FECHA_ISO_PATTERN).unwrap();
        assert!(pattern.is_match("2025-11-03"));
        assert!(pattern.is_match("2025-11-03T08:15:00"));
        assert!(pattern.is_match("2025-11-03 08:15:00.123"));
        assert!(!pattern.is_match("hace 3 días"));
        assert!(!pattern.is_match("03/11/2025"));
        assert!(!pattern.is_match("2025-13-01"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn order_is_validated() {
        assert_eq!(parse_order(None).unwrap(), "DESC");
        assert_eq!(parse_order(Some("ASC")).unwrap(), "ASC");
        assert!(matches!(parse_order(Some("random")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_order(Some("desc; DROP TABLE x")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn tendencia_treats_empty_week_as_one() {
        assert_eq!(tendencia(5, 0), 500.0);
        assert_eq!(tendencia(15, 10), 50.0);
        assert_eq!(tendencia(0, 4), -100.0);
        assert_eq!(tendencia(0, 0), 0.0);
    }

    #[test]
    fn joins_offers_on_normalized_name() {
        let offers = vec![(Some(" APARTADÓ ".to_string()), 30), (Some("Turbo".to_string()), 4), (None, 9)];
        let population = vec![("Apartadó".to_string(), Some(120_000.0)), ("Carepa".to_string(), Some(60_000.0))];
        let joined = oferta_demanda(&offers, &population);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].municipio, "Apartadó");
        assert_eq!(joined[0].vacantes_por_1000_hab, 0.25);
    }

    #[test]
    fn cluster_rules_apply_in_priority_order() {
        let big_and_poor = ClusterIndicadores { poblacion: 200_000.0, pobreza: 70.0, pib: 2_000_000.0 };
        assert_eq!(classify(&big_and_poor).0, "Nodo Urbano Regional");
        let rich = ClusterIndicadores { poblacion: 50_000.0, pobreza: 70.0, pib: 2_000_000.0 };
        assert_eq!(classify(&rich).0, "Eje Agroindustrial");
        let poor = ClusterIndicadores { poblacion: 50_000.0, pobreza: 70.0, pib: 10.0 };
        assert_eq!(classify(&poor).0, "Territorio en Desarrollo");
        assert_eq!(classify(&ClusterIndicadores::default()).0, "Ruralidad Emergente");
    }

    #[test]
    fn pivots_indicator_rows() {
        let rows = vec![
            ("Turbo".to_string(), DEFAULT_INDICADOR.to_string(), Some(130_000.0)),
            ("Turbo".to_string(), POBREZA_INDICADOR.to_string(), None),
            ("Necoclí".to_string(), POBREZA_INDICADOR.to_string(), Some(62.0)),
        ];
        let result = clusters(&rows);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].municipio, "Necoclí");
        assert_eq!(result[0].cluster, "Territorio en Desarrollo");
        assert_eq!(result[1].indicadores.poblacion, 130_000.0);
        assert_eq!(result[1].cluster, "Nodo Urbano Regional");
    }
}
