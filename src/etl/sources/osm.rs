//! Overpass API dumps (`[out:json]` with `out geom`).

use std::collections::HashMap;
use std::path::Path;

use geojson::{Geometry, Value as GeoValue};
use serde::Deserialize;

use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame, GeometryColumn};

#[derive(Debug, Deserialize)]
pub struct OverpassDump {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub geometry: Option<Vec<LatLon>>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

pub fn read_dump(path: &Path) -> Result<OverpassDump, EtlError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

impl Element {
    fn way_coords(&self) -> Option<Vec<Vec<f64>>> {
        if self.kind != "way" {
            return None;
        }
        let geometry = self.geometry.as_ref()?;
        Some(geometry.iter().map(|p| vec![p.lon, p.lat]).collect())
    }

    fn tag(&self, key: &str) -> Cell {
        self.tags.get(key).map(|v| Cell::Text(v.clone())).unwrap_or(Cell::Null)
    }
}

/// Closes the ring if needed. Rings need at least four positions once closed.
pub fn closed_ring(mut coords: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    if coords.len() < 4 {
        return None;
    }
    if coords.first() != coords.last() {
        let first = coords[0].clone();
        coords.push(first);
    }
    Some(coords)
}

fn frame_with(columns: &[&str]) -> Frame {
    let mut frame = Frame::new(columns.iter().map(|c| c.to_string()).collect());
    frame.geometry = Some(GeometryColumn { srid: 4326, values: Vec::new() });
    frame
}

fn push(frame: &mut Frame, row: Vec<Cell>, geometry: Geometry) {
    frame.push_row(row);
    if let Some(column) = frame.geometry.as_mut() {
        column.values.push(Some(geometry));
    }
}

pub fn buildings(dump: &OverpassDump) -> Frame {
    let mut frame = frame_with(&["id", "osm_type", "building", "name", "amenity", "addr_street"]);
    for el in &dump.elements {
        let Some(ring) = el.way_coords().and_then(closed_ring) else { continue };
        let building = el.tags.get("building").cloned().unwrap_or_else(|| "yes".to_string());
        push(
            &mut frame,
            vec![
                Cell::Int(el.id),
                Cell::Text("way".into()),
                Cell::Text(building),
                el.tag("name"),
                el.tag("amenity"),
                el.tag("addr:street"),
            ],
            Geometry::new(GeoValue::Polygon(vec![ring])),
        );
    }
    frame
}

pub fn roads(dump: &OverpassDump) -> Frame {
    let mut frame = frame_with(&["id", "osm_type", "highway", "name", "surface", "lanes"]);
    for el in &dump.elements {
        let Some(line) = el.way_coords().filter(|c| c.len() >= 2) else { continue };
        let lanes = el
            .tags
            .get("lanes")
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map(Cell::Int)
            .unwrap_or(Cell::Null);
        push(
            &mut frame,
            vec![
                Cell::Int(el.id),
                Cell::Text("way".into()),
                el.tag("highway"),
                el.tag("name"),
                el.tag("surface"),
                lanes,
            ],
            Geometry::new(GeoValue::LineString(line)),
        );
    }
    frame
}

pub fn landuse(dump: &OverpassDump) -> Frame {
    let mut frame = frame_with(&["id", "landuse", "name"]);
    for el in &dump.elements {
        let Some(ring) = el.way_coords().and_then(closed_ring) else { continue };
        push(
            &mut frame,
            vec![Cell::Int(el.id), el.tag("landuse"), el.tag("name")],
            Geometry::new(GeoValue::Polygon(vec![ring])),
        );
    }
    frame
}

pub fn amenities(dump: &OverpassDump) -> Frame {
    let mut frame = frame_with(&["id", "amenity", "name", "phone", "website", "opening_hours", "lat", "lon"]);
    for el in &dump.elements {
        let (Some(lat), Some(lon)) = (el.lat, el.lon) else { continue };
        push(
            &mut frame,
            vec![
                Cell::Int(el.id),
                el.tag("amenity"),
                el.tag("name"),
                el.tag("phone"),
                el.tag("website"),
                el.tag("opening_hours"),
                Cell::Float(lat),
                Cell::Float(lon),
            ],
            Geometry::new(GeoValue::Point(vec![lon, lat])),
        );
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(json: &str) -> OverpassDump {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn open_rings_are_closed() {
        let ring = closed_ring(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert!(closed_ring(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 0.0]]).is_none());
    }

    #[test]
    fn buildings_skip_short_ways_and_nodes() {
        let d = dump(
            r#"{"elements": [
                {"type": "way", "id": 1, "tags": {"name": "Alcaldía"},
                 "geometry": [{"lat": 7.88, "lon": -76.62}, {"lat": 7.88, "lon": -76.61},
                              {"lat": 7.89, "lon": -76.61}, {"lat": 7.89, "lon": -76.62}]},
                {"type": "way", "id": 2, "geometry": [{"lat": 7.88, "lon": -76.62}, {"lat": 7.88, "lon": -76.61}]},
                {"type": "node", "id": 3, "lat": 7.88, "lon": -76.62}
            ]}"#,
        );
        let frame = buildings(&d);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.rows[0][2], Cell::Text("yes".into()));
        assert_eq!(frame.rows[0][3], Cell::Text("Alcaldía".into()));
        let geom = frame.geometry.as_ref().unwrap().values[0].as_ref().unwrap();
        match &geom.value {
            GeoValue::Polygon(rings) => assert_eq!(rings[0].len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn roads_parse_lanes() {
        let d = dump(
            r#"{"elements": [
                {"type": "way", "id": 10, "tags": {"highway": "primary", "lanes": "2"},
                 "geometry": [{"lat": 7.88, "lon": -76.62}, {"lat": 7.89, "lon": -76.61}]},
                {"type": "way", "id": 11, "tags": {"highway": "track", "lanes": "two"},
                 "geometry": [{"lat": 7.88, "lon": -76.62}, {"lat": 7.89, "lon": -76.61}]}
            ]}"#,
        );
        let frame = roads(&d);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows[0][5], Cell::Int(2));
        assert_eq!(frame.rows[1][5], Cell::Null);
    }

    #[test]
    fn amenities_need_coordinates() {
        let d = dump(
            r#"{"elements": [
                {"type": "node", "id": 5, "lat": 7.88, "lon": -76.62, "tags": {"amenity": "pharmacy"}},
                {"type": "way", "id": 6}
            ]}"#,
        );
        let frame = amenities(&d);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.rows[0][1], Cell::Text("pharmacy".into()));
    }
}
