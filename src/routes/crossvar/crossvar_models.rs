use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize)]
pub struct SecurityMatrixQuery {
    pub dane_code: Option<String>,
}

#[derive(Deserialize)]
pub struct ScatterQuery {
    pub var_x: String,
    pub var_y: String,
}

#[derive(Serialize)]
pub struct VariableName {
    pub name: &'static str,
}

#[derive(Serialize)]
pub struct Regression {
    pub r_squared: f64,
}

#[derive(Serialize)]
pub struct ScatterResponse {
    pub var_x: VariableName,
    pub var_y: VariableName,
    pub points: Vec<Value>,
    pub correlation: f64,
    pub regression: Regression,
    pub n: usize,
}

/// Crime tables stacked into the security matrix, with their display label.
pub const SECURITY_TABLES: [(&str, &str); 4] = [
    ("Homicidios", "seguridad.homicidios"),
    ("Hurtos", "seguridad.hurtos"),
    ("Violencia Intrafamiliar", "seguridad.violencia_intrafamiliar"),
    ("Delitos Sexuales", "seguridad.delitos_sexuales"),
];

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Population Pearson coefficient rounded to 3 decimals.
///
/// Returns 0 when there are fewer than three pairs or either series is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n <= 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;
    let cov = xs.iter().zip(ys).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum::<f64>() / nf;
    let std_x = (xs.iter().map(|x| (x - mean_x).powi(2)).sum::<f64>() / nf).sqrt();
    let std_y = (ys.iter().map(|y| (y - mean_y).powi(2)).sum::<f64>() / nf).sqrt();
    if std_x > 0.0 && std_y > 0.0 {
        round_to(cov / (std_x * std_y), 3)
    } else {
        0.0
    }
}

/// `(x, y)` pairs of the scatter rows that carry both numbers.
pub fn xy_pairs(points: &[Value]) -> (Vec<f64>, Vec<f64>) {
    points
        .iter()
        .filter_map(|p| Some((p.get("x")?.as_f64()?, p.get("y")?.as_f64()?)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn perfectly_linear_series() {
        assert_eq!(pearson(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 6.0, 8.0]), 1.0);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[9.0, 6.0, 3.0]), -1.0);
    }

    #[test]
    fn degenerate_series_have_no_correlation() {
        assert_eq!(pearson(&[1.0, 2.0], &[3.0, 5.0]), 0.0);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
    }

    #[test]
    fn rounds_to_three_decimals() {
        let r = pearson(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]);
        assert_eq!(r, 0.8);
        assert_eq!(round_to(0.123456, 3), 0.123);
    }

    #[test]
    fn pairs_skip_incomplete_points() {
        let points = vec![
            json!({"label": "Apartadó", "x": 1.5, "y": 2}),
            json!({"label": "Turbo", "x": null, "y": 3.0}),
        ];
        assert_eq!(xy_pairs(&points), (vec![1.5], vec![2.0]));
    }
}
