use serde::Serialize;

/// A map layer backed by one PostGIS table.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Layer {
    pub id: &'static str,
    pub name: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
    pub description: &'static str,
    pub geometry_type: &'static str,
    pub category: &'static str,
}

impl Layer {
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

pub const LAYERS: [Layer; 9] = [
    Layer {
        id: "limite_municipal",
        name: "Límite Municipal",
        schema: "cartografia",
        table: "limite_municipal",
        description: "Polígono del municipio de Apartadó",
        geometry_type: "Polygon",
        category: "cartografia",
    },
    Layer {
        id: "manzanas_censales",
        name: "Manzanas Censales (MGN 2018)",
        schema: "cartografia",
        table: "manzanas_censales",
        description: "Manzanas del censo 2018 con datos de población",
        geometry_type: "MultiPolygon",
        category: "cartografia",
    },
    Layer {
        id: "igac_apartado",
        name: "Municipio IGAC",
        schema: "cartografia",
        table: "igac_municipios",
        description: "Polígono oficial IGAC de Apartadó",
        geometry_type: "MultiPolygon",
        category: "cartografia",
    },
    Layer {
        id: "igac_uraba",
        name: "Municipios de Urabá",
        schema: "cartografia",
        table: "igac_uraba",
        description: "Municipios de la región de Urabá",
        geometry_type: "MultiPolygon",
        category: "cartografia",
    },
    Layer {
        id: "osm_edificaciones",
        name: "Edificaciones (OSM)",
        schema: "cartografia",
        table: "osm_edificaciones",
        description: "Edificaciones de OpenStreetMap",
        geometry_type: "Polygon",
        category: "osm",
    },
    Layer {
        id: "osm_vias",
        name: "Red Vial (OSM)",
        schema: "cartografia",
        table: "osm_vias",
        description: "Vías y calles de OpenStreetMap",
        geometry_type: "LineString",
        category: "osm",
    },
    Layer {
        id: "osm_uso_suelo",
        name: "Uso del Suelo (OSM)",
        schema: "cartografia",
        table: "osm_uso_suelo",
        description: "Clasificación de uso del suelo OSM",
        geometry_type: "Polygon",
        category: "osm",
    },
    Layer {
        id: "osm_amenidades",
        name: "Amenidades (OSM)",
        schema: "cartografia",
        table: "osm_amenidades",
        description: "Puntos de interés de OpenStreetMap",
        geometry_type: "Point",
        category: "osm",
    },
    Layer {
        id: "google_places",
        name: "Negocios y Servicios (Google)",
        schema: "servicios",
        table: "google_places",
        description: "Establecimientos comerciales de Google Places",
        geometry_type: "Point",
        category: "economia",
    },
];

pub fn find_layer(id: &str) -> Option<&'static Layer> {
    LAYERS.iter().find(|layer| layer.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let layer = find_layer("igac_apartado").unwrap();
        assert_eq!(layer.qualified_table(), "cartografia.igac_municipios");
        assert!(find_layer("catastro").is_none());
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<&str> = LAYERS.iter().map(|l| l.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), LAYERS.len());
    }
}
