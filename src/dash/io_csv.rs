// Primitives for reading CSV files.

use log::debug;
use snafu::prelude::*;

use csv::ReaderBuilder;

use crate::dash::io_common::{Cell, Sheet};
use crate::dash::*;

/// Reads the content of a CSV file. The first line is the header.
///
/// Lines may have a different number of fields than the header.
pub fn read_csv_sheet(path: &str, bytes: &[u8]) -> DashResult<Sheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let header: Vec<String> = reader
        .headers()
        .context(CsvParseSnafu { path })?
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .collect();
    debug!("read_csv_sheet: {}: header {:?}", path, header);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record.context(CsvParseSnafu { path })?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(Sheet {
        path: path.to_string(),
        header,
        rows,
    })
}
