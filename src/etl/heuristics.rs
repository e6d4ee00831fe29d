//! Heuristics for schema-less government datasets: locating the DANE
//! municipality column, parsing Spanish-formatted numbers and mapping
//! census-block attribute names.

use super::frame::{Cell, Frame};

const DANE_COLUMN_CANDIDATES: [&str; 6] = [
    "municipio_id",
    "cod_mpio",
    "codigo_municipio",
    "codigo_dane",
    "cod_dane_municipio",
    "municipio_codigo",
];

/// `"58.868.473.856,00"` -> `58868473856.0` (dots group thousands, comma is decimal).
pub fn parse_spanish_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Int(i) => Some(*i as f64),
        Cell::Float(f) if f.is_finite() => Some(*f),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.replace('.', "").replace(',', ".").parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Returns the Urabá code that starts furthest left in `value`; at the same
/// position the earlier code in `codes` wins. Values that lost their
/// leading zero (`5045`) are matched against the zero-padded code.
pub fn extract_dane_code<'c>(value: &str, codes: &[&'c str]) -> Option<&'c str> {
    let value = value.trim();
    if let Some((_, _, code)) = codes
        .iter()
        .enumerate()
        .filter_map(|(order, code)| value.find(*code).map(|pos| (pos, order, *code)))
        .min()
    {
        return Some(code);
    }
    let digits = value.split('.').next().unwrap_or(value);
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        let padded = format!("0{}", digits);
        return codes.iter().find(|code| **code == padded).copied();
    }
    None
}

pub fn find_dane_column(frame: &Frame, codes: &[&str]) -> Option<usize> {
    if let Some(idx) = frame
        .columns
        .iter()
        .position(|c| DANE_COLUMN_CANDIDATES.contains(&c.as_str()))
    {
        return Some(idx);
    }
    (0..frame.columns.len()).find(|&idx| {
        frame.rows.iter().any(|row| {
            row[idx]
                .to_text()
                .map(|v| codes.iter().any(|code| v.contains(code)))
                .unwrap_or(false)
        })
    })
}

/// Used to filter IPM/NBI spreadsheets, where the code may be stored as a number.
pub fn row_mentions_code(row: &[Cell], code: &str) -> bool {
    let short = code.trim_start_matches('0');
    row.iter().any(|cell| {
        cell.to_text()
            .map(|v| v.contains(code) || v.contains(short))
            .unwrap_or(false)
    })
}

/// Maps MGN census-block attribute columns onto the normalized names.
/// Returns `(target, source)` pairs; the last matching source wins.
pub fn map_block_columns(columns: &[String]) -> Vec<(String, String)> {
    let mut mapping: Vec<(String, String)> = Vec::new();
    let mut assign = |target: &str, source: &str| {
        match mapping.iter_mut().find(|(t, _)| t == target) {
            Some(entry) => entry.1 = source.to_string(),
            None => mapping.push((target.to_string(), source.to_string())),
        }
    };
    for column in columns {
        let cl = column.to_lowercase();
        let coded = cl.contains("cod") || cl.contains("cdgo");
        if cl.contains("manz") && coded {
            assign("cod_dane_manzana", column);
        } else if cl.contains("secc") && coded {
            assign("cod_dane_seccion", column);
        } else if cl.contains("sect") && coded {
            assign("cod_dane_sector", column);
        } else if matches!(cl.as_str(), "mpio_cdpmp" | "cod_mpio" | "mpio_ccdgo") {
            assign("cod_dane_municipio", column);
        } else if cl.contains("tp_") || cl.contains("total_per") {
            assign("total_personas", column);
        } else if cl.contains("th_") || cl.contains("total_hog") {
            assign("total_hogares", column);
        } else if cl.contains("tv_") || cl.contains("total_viv") {
            assign("total_viviendas", column);
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODES: [&str; 3] = ["05045", "05837", "05147"];

    #[test]
    fn spanish_numbers() {
        assert_eq!(parse_spanish_number(&Cell::Text("58.868.473.856,00".into())), Some(58868473856.0));
        assert_eq!(parse_spanish_number(&Cell::Text("12,5".into())), Some(12.5));
        assert_eq!(parse_spanish_number(&Cell::Text("  ".into())), None);
        assert_eq!(parse_spanish_number(&Cell::Text("ND".into())), None);
        assert_eq!(parse_spanish_number(&Cell::Float(3.25)), Some(3.25));
        assert_eq!(parse_spanish_number(&Cell::Null), None);
    }

    #[test]
    fn dane_code_extraction() {
        assert_eq!(extract_dane_code("05837", &CODES), Some("05837"));
        assert_eq!(extract_dane_code("Apartadó 05045000", &CODES), Some("05045"));
        assert_eq!(extract_dane_code("5045", &CODES), Some("05045"));
        assert_eq!(extract_dane_code("5045.0", &CODES), Some("05045"));
        assert_eq!(extract_dane_code("05001", &CODES), None);
    }

    #[test]
    fn dane_code_prefers_leftmost_mention() {
        // Turbo (05837) is listed after Apartadó (05045) but appears first.
        assert_eq!(extract_dane_code("05837 limita con 05045", &CODES), Some("05837"));
        assert_eq!(extract_dane_code("05045 limita con 05837", &CODES), Some("05045"));
    }

    #[test]
    fn dane_column_by_name_then_by_value() {
        let mut frame = Frame::new(vec!["nombre".into(), "cod_mpio".into()]);
        frame.push_row(vec![Cell::Text("x".into()), Cell::Text("05045".into())]);
        assert_eq!(find_dane_column(&frame, &CODES), Some(1));

        let mut frame = Frame::new(vec!["nombre".into(), "divipola".into()]);
        frame.push_row(vec![Cell::Text("x".into()), Cell::Text("05147".into())]);
        assert_eq!(find_dane_column(&frame, &CODES), Some(1));

        let mut frame = Frame::new(vec!["nombre".into()]);
        frame.push_row(vec![Cell::Text("x".into())]);
        assert_eq!(find_dane_column(&frame, &CODES), None);
    }

    #[test]
    fn numeric_code_cells_match() {
        assert!(row_mentions_code(&[Cell::Int(5045)], "05045"));
        assert!(row_mentions_code(&[Cell::Text("05045".into())], "05045"));
        assert!(!row_mentions_code(&[Cell::Int(5001)], "05045"));
    }

    #[test]
    fn block_column_mapping() {
        let columns: Vec<String> = ["COD_DANE_MANZANA", "SECC_CCDGO", "SECT_CCDGO", "MPIO_CDPMP", "TOTAL_PERS", "TH_HOG", "TVIVIENDA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = map_block_columns(&columns);
        let get = |t: &str| mapping.iter().find(|(k, _)| k == t).map(|(_, v)| v.as_str());
        assert_eq!(get("cod_dane_manzana"), Some("COD_DANE_MANZANA"));
        assert_eq!(get("cod_dane_seccion"), Some("SECC_CCDGO"));
        assert_eq!(get("cod_dane_sector"), Some("SECT_CCDGO"));
        assert_eq!(get("cod_dane_municipio"), Some("MPIO_CDPMP"));
        assert_eq!(get("total_personas"), Some("TOTAL_PERS"));
        assert_eq!(get("total_hogares"), Some("TH_HOG"));
        assert_eq!(get("total_viviendas"), None);
    }
}
