// Primitives for reading Excel workbooks.

use log::{debug, warn};
use snafu::prelude::*;
use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};

use crate::dash::io_common::{Cell, Sheet};
use crate::dash::*;

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => Cell::Empty,
        DataType::String(s) => Cell::from_text(s),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        DataType::DateTime(f) => Cell::Number(*f),
        DataType::Error(e) => {
            warn!("read_cell: error cell {:?}, reading it as empty", e);
            Cell::Empty
        }
        #[allow(unreachable_patterns)]
        x => {
            warn!("read_cell: unexpected cell {:?}, reading it as text", x);
            Cell::from_text(&format!("{:?}", x))
        }
    }
}

/// Reads one worksheet of an xlsx workbook.
///
/// When no worksheet name is given, the workbook must contain a single worksheet.
pub fn read_excel_sheet(
    path: &str,
    bytes: Vec<u8>,
    worksheet_name: Option<&str>,
) -> DashResult<Sheet> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).context(OpeningExcelSnafu { path })?;
    let names = workbook.sheet_names().to_vec();
    debug!("read_excel_sheet: {}: worksheets {:?}", path, names);

    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: name,
            })?
            .context(OpeningExcelSnafu { path })?,
        None => {
            ensure!(names.len() <= 1, AmbiguousWorksheetSnafu { path });
            workbook
                .worksheet_range_at(0)
                .context(EmptyExcelSnafu { path })?
                .context(OpeningExcelSnafu { path })?
        }
    };

    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|c| read_cell(c).as_string().unwrap_or_default())
        .collect();
    let rows: Vec<Vec<Cell>> = iter.map(|row| row.iter().map(read_cell).collect()).collect();
    debug!("read_excel_sheet: {}: header {:?}, {} rows", path, header, rows.len());
    Ok(Sheet {
        path: path.to_string(),
        header,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dash::config_reader::DatamapSource;
    use crate::dash::io_common::read_codebook_entries;

    // Two worksheets: "Notes", then "Data Map".
    const DATAMAP_XLSX: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/excel/datamap.xlsx"
    ));

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Empty), Cell::Empty);
        assert_eq!(read_cell(&DataType::String(" ".to_string())), Cell::Empty);
        assert_eq!(read_cell(&DataType::Int(2024)), Cell::Number(2024.0));
        assert_eq!(read_cell(&DataType::Float(2.0)).as_year(), Some(2));
        assert_eq!(
            read_cell(&DataType::String("Yes".to_string())),
            Cell::Text("Yes".to_string())
        );
    }

    #[test]
    fn not_a_workbook() {
        let res = read_excel_sheet("data.xlsx", b"year,q1\n".to_vec(), None);
        assert!(matches!(res, Err(DashError::OpeningExcel { .. })));
    }

    #[test]
    fn named_worksheet() {
        let sheet = read_excel_sheet("datamap.xlsx", DATAMAP_XLSX.to_vec(), Some("Data Map")).unwrap();
        assert_eq!(sheet.header.len(), 8);
        assert_eq!(sheet.header[0], "variable");
        assert_eq!(sheet.header[7], "encoding");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1][0], Cell::Text("q2".to_string()));

        let notes = read_excel_sheet("datamap.xlsx", DATAMAP_XLSX.to_vec(), Some("Notes")).unwrap();
        assert_eq!(notes.header, vec!["note"]);

        let missing = read_excel_sheet("datamap.xlsx", DATAMAP_XLSX.to_vec(), Some("Sheet1"));
        assert!(matches!(missing, Err(DashError::MissingWorksheet { .. })));
    }

    #[test]
    fn datamap_worksheet_by_default() {
        let src: DatamapSource =
            serde_json::from_str(r#"{"provider": "local", "filePath": "datamap.xlsx"}"#).unwrap();
        let name = src.worksheet_name();
        assert_eq!(name.as_deref(), Some("Data Map"));
        let sheet = read_excel_sheet(&src.file_path, DATAMAP_XLSX.to_vec(), name.as_deref()).unwrap();
        let entries = read_codebook_entries(&sheet).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].variable, "q1");
        assert_eq!(entries[0].question_text, "Is the economy doing well?");
        assert_eq!(entries[1].encoding, "1=Very safe 2=Somewhat safe 3=Not safe");
    }

    #[test]
    fn several_worksheets_need_a_name() {
        let res = read_excel_sheet("datamap.xlsx", DATAMAP_XLSX.to_vec(), None);
        assert!(matches!(res, Err(DashError::AmbiguousWorksheet { .. })));
    }
}
