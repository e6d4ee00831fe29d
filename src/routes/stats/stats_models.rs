use serde::Serialize;
use serde_json::Value;

pub const DEPARTAMENTO: &str = "Antioquia";
pub const REGION: &str = "Urabá";

/// `(summary key, typed table)` for the crime totals.
pub const CRIME_TOTALS: [(&str, &str); 4] = [
    ("total_homicidios", "seguridad.homicidios"),
    ("total_hurtos", "seguridad.hurtos"),
    ("total_delitos_sexuales", "seguridad.delitos_sexuales"),
    ("total_vif", "seguridad.violencia_intrafamiliar"),
];

#[derive(Serialize, Default)]
pub struct IcfesSummary {
    pub colegios_evaluados: i64,
    pub estudiantes_evaluados: i64,
    pub promedio_global: Option<f64>,
}

#[derive(Serialize, Default)]
pub struct Summary {
    pub municipio: String,
    pub divipola: String,
    pub departamento: &'static str,
    pub region: &'static str,
    pub poblacion_censal_2018: Option<i64>,
    pub manzanas_censales: i64,
    pub edificaciones_osm: i64,
    pub vias_osm: i64,
    pub establecimientos_comerciales: i64,
    pub establecimientos_educativos: i64,
    pub matricula_total: Option<i64>,
    pub icfes: IcfesSummary,
    pub ips_salud: i64,
    pub total_homicidios: i64,
    pub total_hurtos: i64,
    pub total_delitos_sexuales: i64,
    pub total_vif: i64,
    pub total_victimas_conflicto: i64,
    pub principales_hechos_victimizantes: Vec<Value>,
    pub prestadores_servicios: i64,
}

impl Summary {
    pub fn set_crime_total(&mut self, key: &str, total: i64) {
        match key {
            "total_homicidios" => self.total_homicidios = total,
            "total_hurtos" => self.total_hurtos = total,
            "total_delitos_sexuales" => self.total_delitos_sexuales = total,
            "total_vif" => self.total_vif = total,
            _ => {}
        }
    }
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub schema: String,
    pub table: String,
    pub full_name: String,
    pub records: i64,
    pub columns: Vec<Value>,
}

pub fn round_1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crime_totals_land_on_their_keys() {
        let mut summary = Summary::default();
        for (i, (key, _)) in CRIME_TOTALS.iter().enumerate() {
            summary.set_crime_total(key, i as i64 + 1);
        }
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["total_homicidios"], 1);
        assert_eq!(value["total_vif"], 4);
        assert_eq!(value["icfes"]["promedio_global"], Value::Null);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        assert_eq!(round_1(251.46), 251.5);
        assert_eq!(round_1(249.94), 249.9);
    }
}
