use serde::Deserialize;

use crate::config::BBox;
use crate::errors::ApiError;

pub const DEFAULT_LIMIT: i64 = 2000;
pub const MAX_LIMIT: i64 = 10_000;

#[derive(Deserialize)]
pub struct GeoQuery {
    pub bbox: Option<String>,
    pub limit: Option<i64>,
    pub category: Option<String>,
}

/// Parses `minx,miny,maxx,maxy` in WGS84 degrees.
pub fn parse_bbox(raw: &str) -> Result<BBox, ApiError> {
    let invalid = || ApiError::BadRequest(format!("bbox inválido: '{}' (se espera minx,miny,maxx,maxy)", raw));
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| invalid())?;
    let &[min_x, min_y, max_x, max_y] = values.as_slice() else {
        return Err(invalid());
    };
    if values.iter().any(|v| !v.is_finite()) || min_x > max_x || min_y > max_y {
        return Err(invalid());
    }
    Ok(BBox { min_x, min_y, max_x, max_y })
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bbox() {
        let bbox = parse_bbox("-76.65, 7.87,-76.60,7.91").unwrap();
        assert_eq!(bbox, BBox { min_x: -76.65, min_y: 7.87, max_x: -76.60, max_y: 7.91 });
    }

    #[test]
    fn rejects_malformed_bbox() {
        for raw in ["", "1,2,3", "1,2,3,4,5", "a,b,c,d", "3,0,1,1", "0,0,NaN,1", "0,0,inf,1"] {
            assert!(matches!(parse_bbox(raw), Err(ApiError::BadRequest(_))), "{}", raw);
        }
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), 2000);
        assert_eq!(clamp_limit(Some(50_000)), 10_000);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(250)), 250);
    }
}
