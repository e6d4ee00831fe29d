//! Extract step: one reader per source format.

pub mod excel;
pub mod geojson_file;
pub mod json;
pub mod osm;
pub mod shp;
