//! ESRI shapefiles (IGAC, MGN, catastro) converted to GeoJSON geometries.

use std::fs;
use std::path::Path;

use geojson::{Geometry, Value as GeoValue};
use log::{info, warn};
use regex::Regex;
use shapefile::dbase::FieldValue;
use shapefile::{Point, PolygonRing, Shape};

use crate::config::BBox;
use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame, GeometryColumn};

/// MAGNA-SIRGAS, the geographic CRS of Colombian official cartography.
pub const MAGNA_SIRGAS_SRID: i32 = 4686;

/// CRS names seen in ESRI `.prj` files, projected ones first.
const PRJ_NAMES: [(&str, i32); 6] = [
    ("ORIGEN_NACIONAL", 9377),
    ("CTM12", 9377),
    ("MAGNA_COLOMBIA_BOGOTA", 3116),
    ("WGS_1984_UTM_ZONE_18N", 32618),
    ("MAGNA", MAGNA_SIRGAS_SRID),
    ("WGS_1984", 4326),
];

/// SRID declared by a `.prj` WKT: the outermost EPSG authority when present,
/// otherwise a match on the CRS name.
pub fn prj_srid(wkt: &str) -> Option<i32> {
    let authority = Regex::new(r#"(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).ok()?;
    if let Some(code) = authority
        .captures_iter(wkt)
        .last()
        .and_then(|caps| caps[1].parse::<i32>().ok())
    {
        return Some(code);
    }

    let name = Regex::new(r#"^\s*[A-Z0-9_]+\[\s*"([^"]+)""#).ok()?.captures(wkt)?[1].to_string();
    let normalized: String = name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    PRJ_NAMES
        .iter()
        .find(|(needle, _)| normalized.contains(needle))
        .map(|(_, srid)| *srid)
}

/// SRID of the `.prj` sidecar next to `path`, MAGNA-SIRGAS when it is
/// missing or unrecognized.
pub fn source_srid(path: &Path) -> i32 {
    let prj = path.with_extension("prj");
    match fs::read_to_string(&prj) {
        Ok(wkt) => prj_srid(&wkt).unwrap_or_else(|| {
            warn!("{}: CRS no reconocido, se asume EPSG:{}", prj.display(), MAGNA_SIRGAS_SRID);
            MAGNA_SIRGAS_SRID
        }),
        Err(_) => MAGNA_SIRGAS_SRID,
    }
}

/// Reads every shape whose bounding box intersects `bbox`. The filter is
/// applied in the file's own coordinates.
pub fn read_shapefile(path: &Path, bbox: Option<&BBox>) -> Result<Frame, EtlError> {
    let srid = source_srid(path);
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut frame = Frame::new(Vec::new());
    let mut geometries = Vec::new();
    let mut read = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        read += 1;
        let Some(geometry) = shape_to_geometry(shape) else { continue };
        if let (Some(filter), Some(extent)) = (bbox, geometry_bbox(&geometry)) {
            if !filter.intersects(&extent) {
                continue;
            }
        }

        let mut row = vec![Cell::Null; frame.columns.len()];
        for (name, value) in record {
            let idx = match frame.column_index(&name) {
                Some(idx) => idx,
                None => {
                    frame.set_column(&name, Vec::new());
                    row.push(Cell::Null);
                    frame.columns.len() - 1
                }
            };
            row[idx] = field_to_cell(value);
        }
        frame.push_row(row);
        geometries.push(Some(geometry));
    }

    info!("{}: {} shapes read, {} kept (EPSG:{})", path.display(), read, frame.len(), srid);
    frame.geometry = Some(GeometryColumn { srid, values: geometries });
    Ok(frame)
}

fn field_to_cell(value: FieldValue) -> Cell {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            let s = s.trim().to_string();
            if s.is_empty() {
                Cell::Null
            } else {
                Cell::Text(s)
            }
        }
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => number_cell(n),
        FieldValue::Float(Some(f)) => number_cell(f as f64),
        FieldValue::Integer(i) => Cell::Int(i as i64),
        FieldValue::Logical(Some(b)) => Cell::Bool(b),
        FieldValue::Date(Some(d)) => Cell::Text(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())),
        _ => Cell::Null,
    }
}

fn number_cell(n: f64) -> Cell {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Cell::Int(n as i64)
    } else {
        Cell::Float(n)
    }
}

fn position(p: &Point) -> Vec<f64> {
    vec![p.x, p.y]
}

/// Outer rings open a new polygon; inner rings attach to the last one.
pub fn group_rings(rings: &[PolygonRing<Point>]) -> Vec<Vec<Vec<Vec<f64>>>> {
    let mut polygons: Vec<Vec<Vec<Vec<f64>>>> = Vec::new();
    for ring in rings {
        let coords: Vec<Vec<f64>> = ring.points().iter().map(position).collect();
        match ring {
            PolygonRing::Outer(_) => polygons.push(vec![coords]),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some(polygon) => polygon.push(coords),
                None => polygons.push(vec![coords]),
            },
        }
    }
    polygons
}

pub fn shape_to_geometry(shape: Shape) -> Option<Geometry> {
    let value = match shape {
        Shape::Point(p) => GeoValue::Point(position(&p)),
        Shape::Multipoint(mp) => GeoValue::MultiPoint(mp.points().iter().map(position).collect()),
        Shape::Polyline(line) => {
            let mut parts: Vec<Vec<Vec<f64>>> = line
                .parts()
                .iter()
                .map(|part| part.iter().map(position).collect())
                .collect();
            match parts.len() {
                0 => return None,
                1 => GeoValue::LineString(parts.remove(0)),
                _ => GeoValue::MultiLineString(parts),
            }
        }
        Shape::Polygon(polygon) => {
            let mut polygons = group_rings(polygon.rings());
            match polygons.len() {
                0 => return None,
                1 => GeoValue::Polygon(polygons.remove(0)),
                _ => GeoValue::MultiPolygon(polygons),
            }
        }
        _ => return None,
    };
    Some(Geometry::new(value))
}

pub fn geometry_bbox(geometry: &Geometry) -> Option<BBox> {
    let mut positions: Vec<&Vec<f64>> = Vec::new();
    collect_positions(&geometry.value, &mut positions);
    let mut iter = positions.into_iter().filter(|p| p.len() >= 2);
    let first = iter.next()?;
    let mut bbox = BBox { min_x: first[0], min_y: first[1], max_x: first[0], max_y: first[1] };
    for p in iter {
        bbox.min_x = bbox.min_x.min(p[0]);
        bbox.min_y = bbox.min_y.min(p[1]);
        bbox.max_x = bbox.max_x.max(p[0]);
        bbox.max_y = bbox.max_y.max(p[1]);
    }
    Some(bbox)
}

fn collect_positions<'a>(value: &'a GeoValue, out: &mut Vec<&'a Vec<f64>>) {
    match value {
        GeoValue::Point(p) => out.push(p),
        GeoValue::MultiPoint(ps) | GeoValue::LineString(ps) => out.extend(ps.iter()),
        GeoValue::MultiLineString(lines) | GeoValue::Polygon(lines) => out.extend(lines.iter().flatten()),
        GeoValue::MultiPolygon(polys) => out.extend(polys.iter().flatten().flatten()),
        GeoValue::GeometryCollection(geoms) => geoms.iter().for_each(|g| collect_positions(&g.value, out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x, y + size),
            Point::new(x + size, y + size),
            Point::new(x + size, y),
            Point::new(x, y),
        ]
    }

    #[test]
    fn rings_group_into_polygons() {
        let rings = vec![
            PolygonRing::Outer(square(0.0, 0.0, 10.0)),
            PolygonRing::Inner(square(2.0, 2.0, 1.0)),
            PolygonRing::Outer(square(20.0, 20.0, 5.0)),
        ];
        let polygons = group_rings(&rings);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].len(), 2);
        assert_eq!(polygons[1].len(), 1);
    }

    #[test]
    fn point_and_bbox() {
        let geometry = shape_to_geometry(Shape::Point(Point::new(-76.62, 7.88))).unwrap();
        let bbox = geometry_bbox(&geometry).unwrap();
        assert_eq!(bbox.min_x, -76.62);
        assert_eq!(bbox.max_y, 7.88);
    }

    #[test]
    fn multipolygon_bbox_spans_all_parts() {
        let geometry = Geometry::new(GeoValue::MultiPolygon(vec![
            vec![vec![vec![0.0, 0.0], vec![1.0, 1.0]]],
            vec![vec![vec![-5.0, 3.0], vec![2.0, 9.0]]],
        ]));
        let bbox = geometry_bbox(&geometry).unwrap();
        assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (-5.0, 0.0, 2.0, 9.0));
    }

    #[test]
    fn srid_from_prj_authority_or_name() {
        let magna = r#"GEOGCS["GCS_MAGNA",DATUM["D_MAGNA",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(prj_srid(magna), Some(4686));

        let origen = r#"PROJCS["MAGNA-SIRGAS_Origen-Nacional",GEOGCS["GCS_MAGNA",DATUM["D_MAGNA",SPHEROID["GRS_1980",6378137.0,298.257222101]]],PROJECTION["Transverse_Mercator"]]"#;
        assert_eq!(prj_srid(origen), Some(9377));

        let bogota = r#"PROJCS["MAGNA_Colombia_Bogota",GEOGCS["GCS_MAGNA",DATUM["D_MAGNA"]]]"#;
        assert_eq!(prj_srid(bogota), Some(3116));

        let wgs84 = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(prj_srid(wgs84), Some(4326));

        assert_eq!(prj_srid(r#"LOCAL_CS["unknown"]"#), None);
    }

    #[test]
    fn srid_falls_back_without_prj() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("MGN_ANM_MANZANA.shp");
        assert_eq!(source_srid(&shp), MAGNA_SIRGAS_SRID);

        std::fs::write(dir.path().join("MGN_ANM_MANZANA.prj"), r#"PROJCS["WGS_1984_UTM_Zone_18N",GEOGCS["GCS_WGS_1984"]]"#).unwrap();
        assert_eq!(source_srid(&shp), 32618);
    }

    #[test]
    fn whole_numbers_become_ints() {
        assert_eq!(field_to_cell(FieldValue::Numeric(Some(5045.0))), Cell::Int(5045));
        assert_eq!(field_to_cell(FieldValue::Numeric(Some(2.5))), Cell::Float(2.5));
        assert_eq!(field_to_cell(FieldValue::Character(Some("  ".into()))), Cell::Null);
    }
}
