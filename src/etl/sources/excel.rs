use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::errors::EtlError;
use crate::etl::frame::{Cell, Frame};

/// Reads a sheet (the first one when `sheet` is `None`) using its first row as header.
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<Frame, EtlError> {
    let mut workbook = open_workbook_auto(path)?;
    let name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| EtlError::NoData(format!("{} has no sheets", path.display())))?,
    };
    let range = workbook.worksheet_range(&name)?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| EtlError::NoData(format!("sheet '{}' is empty", name)))?;
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match data_to_cell(cell) {
            Cell::Null => format!("unnamed_{}", i),
            other => other.to_text().unwrap_or_default().trim().to_string(),
        })
        .collect::<Vec<_>>();

    let mut frame = Frame::new(columns);
    for row in rows {
        let mut cells: Vec<Cell> = row.iter().map(data_to_cell).collect();
        cells.resize(frame.columns.len(), Cell::Null);
        if cells.iter().all(Cell::is_null) {
            continue;
        }
        frame.push_row(cells);
    }
    Ok(frame)
}

pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Null,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_conversion() {
        assert_eq!(data_to_cell(&Data::Empty), Cell::Null);
        assert_eq!(data_to_cell(&Data::Int(5045)), Cell::Int(5045));
        assert_eq!(data_to_cell(&Data::String(" ".into())), Cell::Null);
        assert_eq!(data_to_cell(&Data::String("Salud".into())), Cell::Text("Salud".into()));
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_sheet(&dir.path().join("nope.xlsx"), None).is_err());
    }
}
