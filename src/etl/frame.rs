//! A small in-memory table: ordered columns, typed cells, optional geometry.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use geojson::Geometry;
use serde_json::{Map, Value};

pub const MAX_TEXT_LEN: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if f.is_finite() => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Text rendering used for pattern matching and TEXT columns.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Timestamp(t) => Some(t.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(truncate(s)),
            nested => Cell::Text(truncate(&nested.to_string())),
        }
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(MAX_TEXT_LEN) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct GeometryColumn {
    pub srid: i32,
    pub values: Vec<Option<Geometry>>,
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub geometry: Option<GeometryColumn>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Frame { columns, rows: Vec::new(), geometry: None }
    }

    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for record in records {
            for key in record.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(Cell::from_json).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();
        Frame { columns, rows, geometry: None }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Adds (or overwrites) a column.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                let mut values = values.into_iter();
                for row in self.rows.iter_mut() {
                    row.push(values.next().unwrap_or(Cell::Null));
                }
            }
        }
    }

    pub fn map_column<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&Cell) -> Cell,
    {
        if let Some(idx) = self.column_index(name) {
            for row in self.rows.iter_mut() {
                row[idx] = f(&row[idx]);
            }
        }
    }

    /// Keeps the rows for which `keep` returns true, geometry included.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let mask: Vec<bool> = self.rows.iter().map(|r| keep(r.as_slice())).collect();
        let mut i = 0;
        self.rows.retain(|_| {
            i += 1;
            mask[i - 1]
        });
        if let Some(geometry) = self.geometry.as_mut() {
            let mut j = 0;
            geometry.values.retain(|_| {
                j += 1;
                mask[j - 1]
            });
        }
    }

    pub fn rename_columns(&mut self, mapping: &HashMap<&str, &str>) {
        for column in self.columns.iter_mut() {
            if let Some(target) = mapping.get(column.as_str()) {
                *column = target.to_string();
            }
        }
    }

    /// Projects onto `(target, source)` pairs, keeping geometry.
    pub fn select(&self, pairs: &[(String, String)]) -> Frame {
        let indices: Vec<(String, usize)> = pairs
            .iter()
            .filter_map(|(target, source)| self.column_index(source).map(|i| (target.clone(), i)))
            .collect();
        Frame {
            columns: indices.iter().map(|(t, _)| t.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|(_, i)| r[*i].clone()).collect())
                .collect(),
            geometry: self.geometry.clone(),
        }
    }

    /// Stacks frames, taking the union of their columns. Geometry is dropped.
    pub fn concat(frames: Vec<Frame>) -> Frame {
        let mut out = Frame::default();
        for frame in frames {
            for column in &frame.columns {
                if out.column_index(column).is_none() {
                    out.set_column(column, Vec::new());
                }
            }
            let positions: Vec<usize> = frame
                .columns
                .iter()
                .filter_map(|c| out.column_index(c))
                .collect();
            for row in frame.rows {
                let mut merged = vec![Cell::Null; out.columns.len()];
                for (cell, &pos) in row.into_iter().zip(&positions) {
                    merged[pos] = cell;
                }
                out.rows.push(merged);
            }
        }
        out
    }

    /// Lowercases and snake-cases column names; names stay unique.
    pub fn clean_columns(&mut self) {
        let mut used: HashSet<String> = HashSet::new();
        for (i, column) in self.columns.iter_mut().enumerate() {
            let mut name = clean_column_name(column);
            if name.is_empty() {
                name = format!("col_{}", i);
            }
            if used.contains(&name) {
                let mut n = 2;
                while used.contains(&format!("{}_{}", name, n)) {
                    n += 1;
                }
                name = format!("{}_{}", name, n);
            }
            used.insert(name.clone());
            *column = name;
        }
    }

    /// Unparsable values become null.
    pub fn coerce_numeric(&mut self, name: &str) {
        self.map_column(name, |cell| match cell {
            Cell::Int(_) | Cell::Float(_) => cell.clone(),
            other => other.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        });
    }

    pub fn coerce_timestamp(&mut self, name: &str) {
        self.map_column(name, |cell| match cell {
            Cell::Timestamp(_) => cell.clone(),
            Cell::Text(s) => parse_timestamp(s).map(Cell::Timestamp).unwrap_or(Cell::Null),
            _ => Cell::Null,
        });
    }
}

/// Mirrors the column normalization applied to every raw dataset:
/// trim, lowercase, non-word runs to `_`, strip edge underscores.
pub fn clean_column_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

const TIMESTAMP_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim().trim_end_matches('Z');
    if s.is_empty() {
        return None;
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(v: Value) -> Vec<Map<String, Value>> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn union_of_keys_in_first_seen_order() {
        let frame = Frame::from_records(&records(json!([
            {"a": 1, "b": "x"},
            {"c": true, "a": 2.5}
        ])));
        assert_eq!(frame.columns, vec!["a", "b", "c"]);
        assert_eq!(frame.rows[1], vec![Cell::Float(2.5), Cell::Null, Cell::Bool(true)]);
    }

    #[test]
    fn nested_values_become_json_text() {
        let frame = Frame::from_records(&records(json!([{"loc": {"lat": 7.8}, "tags": [1, 2]}])));
        assert_eq!(frame.rows[0][0], Cell::Text("{\"lat\":7.8}".into()));
        assert_eq!(frame.rows[0][1], Cell::Text("[1,2]".into()));
    }

    #[test]
    fn long_strings_are_truncated() {
        let long = "é".repeat(MAX_TEXT_LEN + 5);
        let frame = Frame::from_records(&records(json!([{ "d": long }])));
        match &frame.rows[0][0] {
            Cell::Text(s) => assert_eq!(s.chars().count(), MAX_TEXT_LEN),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn column_cleaning() {
        assert_eq!(clean_column_name("  Código Entidad "), "código_entidad");
        assert_eq!(clean_column_name("Fecha (hecho)"), "fecha_hecho");
        assert_eq!(clean_column_name("__per-ocu__"), "per_ocu");

        let mut frame = Frame::new(vec!["A B".into(), "a-b".into(), "***".into()]);
        frame.clean_columns();
        assert_eq!(frame.columns, vec!["a_b", "a_b_2", "col_2"]);

        let before = frame.columns.clone();
        frame.clean_columns();
        assert_eq!(frame.columns, before);
    }

    #[test]
    fn numeric_coercion_nulls_garbage() {
        let mut frame = Frame::from_records(&records(json!([
            {"cantidad": "3"}, {"cantidad": "n/a"}, {"cantidad": 4}
        ])));
        frame.coerce_numeric("cantidad");
        let col: Vec<Cell> = frame.column("cantidad").unwrap().into_iter().cloned().collect();
        assert_eq!(col, vec![Cell::Float(3.0), Cell::Null, Cell::Int(4)]);
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2021-03-04T00:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("04/03/2021"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-04"), Some(expected));
        assert_eq!(parse_timestamp("ayer"), None);
    }

    #[test]
    fn concat_unions_columns() {
        let a = Frame::from_records(&records(json!([{"x": 1, "y": "a"}])));
        let b = Frame::from_records(&records(json!([{"y": "b", "z": true}])));
        let merged = Frame::concat(vec![a, b]);
        assert_eq!(merged.columns, vec!["x", "y", "z"]);
        assert_eq!(merged.rows[1], vec![Cell::Null, Cell::Text("b".into()), Cell::Bool(true)]);
    }

    #[test]
    fn retain_keeps_geometry_aligned() {
        let mut frame = Frame::new(vec!["id".into()]);
        frame.push_row(vec![Cell::Int(1)]);
        frame.push_row(vec![Cell::Int(2)]);
        frame.geometry = Some(GeometryColumn {
            srid: 4326,
            values: vec![None, Some(Geometry::new(geojson::Value::Point(vec![1.0, 2.0])))],
        });
        frame.retain_rows(|r| r[0] == Cell::Int(2));
        assert_eq!(frame.len(), 1);
        assert!(frame.geometry.unwrap().values[0].is_some());
    }
}
