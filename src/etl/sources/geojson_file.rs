use std::path::Path;

use geojson::{Feature, GeoJson};

use crate::errors::EtlError;

pub fn read_features(path: &Path) -> Result<Vec<Feature>, EtlError> {
    let raw = std::fs::read_to_string(path)?;
    let parsed: GeoJson = raw
        .parse()
        .map_err(|e: geojson::Error| EtlError::Format(format!("{}: {}", path.display(), e)))?;
    Ok(match parsed {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature {
            geometry: Some(g),
            ..Default::default()
        }],
    })
}

/// Returns a string property, accepting numbers too (divipola is often numeric).
pub fn string_property(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_feature_collection() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "FeatureCollection", "features": [
                {{"type": "Feature", "properties": {{"name": "Apartadó", "DANE:area": 532}},
                  "geometry": {{"type": "Point", "coordinates": [-76.62, 7.88]}}}}
            ]}}"#
        )
        .unwrap();
        let features = read_features(file.path()).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(string_property(&features[0], "name").as_deref(), Some("Apartadó"));
        assert_eq!(string_property(&features[0], "DANE:area").as_deref(), Some("532"));
        assert_eq!(string_property(&features[0], "missing"), None);
    }
}
