// Primitives shared by the CSV and Excel readers.

use log::{debug, info, warn};
use snafu::prelude::*;
use std::collections::HashMap;

use survey_tabulation::builder::Builder;
use survey_tabulation::{
    AnswerValue, CodebookEntry, Demographics, GroupDimension, InputMode, ResponseTable,
};

use crate::dash::config_reader::{FileSource, Layout};
use crate::dash::*;

/// The content of a cell, once the file format is abstracted away.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn from_text(s: &str) -> Cell {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(f) => Some(AnswerValue::from_float(*f).to_string()),
        }
    }

    pub fn as_answer(&self) -> Option<AnswerValue> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(AnswerValue::parse(s)),
            Cell::Number(f) => Some(AnswerValue::from_float(*f)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Number(f) => Some(*f),
        }
    }

    /// Years may be stored as floats: they are downcast to integers.
    pub fn as_year(&self) -> Option<i32> {
        self.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i32)
    }
}

/// A table read from a file: the header row and the data rows.
#[derive(PartialEq, Debug, Clone)]
pub struct Sheet {
    pub path: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Finds the position of a column by its header name.
    pub fn column(&self, name: &str) -> DashResult<usize> {
        self.optional_column(Some(name))
            .context(MissingColumnSnafu {
                column: name,
                path: self.path.clone(),
            })
    }

    pub fn optional_column(&self, name: Option<&str>) -> Option<usize> {
        let name = name?;
        self.header.iter().position(|h| h.trim() == name)
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Rows may be shorter than the header: missing cells are empty.
pub fn cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

/// Reads the datamap columns. The chart and panel labels are optional.
pub fn read_codebook_entries(sheet: &Sheet) -> DashResult<Vec<CodebookEntry>> {
    let variable = sheet.column("variable")?;
    let topic = sheet.column("topic")?;
    let question = sheet.column("question_text")?;
    let encoding = sheet.column("encoding")?;
    let optional: HashMap<&str, Option<usize>> = [
        "chart_title",
        "chart_subtitle",
        "panel_title",
        "panel_subtitle",
    ]
    .iter()
    .map(|c| (*c, sheet.optional_column(Some(*c))))
    .collect();
    let text = |row: &[Cell], name: &str| -> String {
        optional
            .get(name)
            .cloned()
            .flatten()
            .and_then(|idx| cell(row, idx).as_string())
            .unwrap_or_default()
    };

    let mut res: Vec<CodebookEntry> = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate() {
        let var_name = match cell(row, variable).as_string() {
            Some(v) => v.trim().to_string(),
            None => {
                debug!("read_codebook_entries: {}: skipping row {} without variable", sheet.path, idx + 2);
                continue;
            }
        };
        res.push(CodebookEntry {
            variable: var_name,
            topic: cell(row, topic).as_string().unwrap_or_default(),
            question_text: cell(row, question).as_string().unwrap_or_default(),
            chart_title: text(row, "chart_title"),
            chart_subtitle: text(row, "chart_subtitle"),
            panel_title: text(row, "panel_title"),
            panel_subtitle: text(row, "panel_subtitle"),
            encoding: cell(row, encoding).as_string().unwrap_or_default(),
        });
    }
    info!("read_codebook_entries: {}: {} entries", sheet.path, res.len());
    Ok(res)
}

/// Turns a sheet into response records, following the layout of the source.
pub fn read_responses(sheet: &Sheet, cfs: &FileSource) -> DashResult<ResponseTable> {
    let layout = cfs.layout()?;
    let table = match layout {
        Layout::Wide => read_wide(sheet, cfs)?,
        Layout::Long => read_long(sheet, cfs, InputMode::Microdata)?,
        Layout::Aggregated => read_long(sheet, cfs, InputMode::Aggregated)?,
    };
    info!(
        "read_responses: {}: {:?} layout, {} rows -> {} records, years {:?}",
        sheet.path,
        layout,
        sheet.rows.len(),
        table.records.len(),
        table.years()
    );
    Ok(table)
}

struct DemographicColumns {
    columns: Vec<(GroupDimension, usize)>,
}

impl DemographicColumns {
    fn read(&self, row: &[Cell]) -> Demographics {
        let mut d = Demographics::default();
        for (dim, idx) in self.columns.iter() {
            d.set(*dim, cell(row, *idx).as_string());
        }
        d
    }

    fn contains(&self, idx: usize) -> bool {
        self.columns.iter().any(|(_, i)| *i == idx)
    }
}

fn demographic_columns(sheet: &Sheet, cfs: &FileSource) -> DemographicColumns {
    let mut columns: Vec<(GroupDimension, usize)> = Vec::new();
    if let Some(idx) = sheet.optional_column(Some(cfs.political_affiliation_column())) {
        columns.push((GroupDimension::PoliticalAffiliation, idx));
    }
    if let Some(idx) = sheet.optional_column(Some(cfs.ethnicity_column())) {
        columns.push((GroupDimension::Ethnicity, idx));
    }
    DemographicColumns { columns }
}

// One row per respondent, one column per variable.
fn read_wide(sheet: &Sheet, cfs: &FileSource) -> DashResult<ResponseTable> {
    let year_idx = sheet.column(cfs.year_column())?;
    let weight_idx = sheet.optional_column(cfs.weight_column.as_deref());
    let demographics = demographic_columns(sheet, cfs);

    let variables: Vec<(usize, String)> = sheet
        .header
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            *idx != year_idx
                && Some(*idx) != weight_idx
                && !demographics.contains(*idx)
                && !name.trim().is_empty()
        })
        .map(|(idx, name)| (idx, name.trim().to_string()))
        .collect();
    debug!("read_wide: {}: variables {:?}", sheet.path, variables);

    let mut builder = Builder::new(InputMode::Microdata);
    for (idx, row) in sheet.rows.iter().enumerate() {
        let year = match cell(row, year_idx).as_year() {
            Some(y) => y,
            None => {
                warn!(
                    "read_wide: {}: line {}: invalid year {:?}, skipping",
                    sheet.path,
                    idx + 2,
                    cell(row, year_idx)
                );
                continue;
            }
        };
        let d = demographics.read(row);
        let weight = weight_idx.and_then(|w| cell(row, w).as_f64());
        for (col_idx, variable) in variables.iter() {
            if let Some(answer) = cell(row, *col_idx).as_answer() {
                builder.add_answer(variable, year, &d, answer, weight);
            }
        }
    }
    Ok(builder.build())
}

// One row per answer (microdata) or per reported percentage (aggregated).
fn read_long(sheet: &Sheet, cfs: &FileSource, mode: InputMode) -> DashResult<ResponseTable> {
    let variable_idx = sheet.column(cfs.variable_column())?;
    let year_idx = sheet.column(cfs.year_column())?;
    let answer_idx = sheet.column(cfs.answer_column())?;
    let (weight_idx, sample_group) = match mode {
        InputMode::Microdata => (sheet.optional_column(cfs.weight_column.as_deref()), None),
        InputMode::Aggregated => (
            Some(sheet.column(cfs.percentage_column())?),
            sheet
                .optional_column(Some(cfs.sample_group_column()))
                .map(|idx| cfs.sample_group_dimension().map(|d| (d, idx)))
                .transpose()?,
        ),
    };
    let demographics = demographic_columns(sheet, cfs);

    let mut builder = Builder::new(mode);
    for (idx, row) in sheet.rows.iter().enumerate() {
        let lineno = idx + 2;
        let variable = match cell(row, variable_idx).as_string() {
            Some(v) => v.trim().to_string(),
            None => {
                warn!("read_long: {}: line {}: missing variable, skipping", sheet.path, lineno);
                continue;
            }
        };
        let year = match cell(row, year_idx).as_year() {
            Some(y) => y,
            None => {
                warn!("read_long: {}: line {}: invalid year, skipping", sheet.path, lineno);
                continue;
            }
        };
        let answer = match cell(row, answer_idx).as_answer() {
            Some(a) => a,
            None => continue,
        };
        let mut d = demographics.read(row);
        if let Some((dim, g_idx)) = sample_group {
            d.set(dim, cell(row, g_idx).as_string());
        }
        let weight = weight_idx.and_then(|w| cell(row, w).as_f64());
        builder.add_answer(&variable, year, &d, answer, weight);
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(header: &[&str], rows: &[&[&str]]) -> Sheet {
        Sheet {
            path: "test.csv".to_string(),
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| Cell::from_text(c)).collect())
                .collect(),
        }
    }

    #[test]
    fn codebook_with_optional_columns() {
        let s = sheet(
            &["variable", "topic", "question_text", "encoding", "chart_title"],
            &[
                &["q1", "Economy", "Is it good?", "1=Yes 2=No", "Economy"],
                &["", "Economy", "Orphan", "", ""],
                &["q2", "Security", "Safe?", "1=Yes", ""],
            ],
        );
        let entries = read_codebook_entries(&s).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].chart_title, "Economy");
        assert_eq!(entries[0].panel_title, "");
        assert_eq!(entries[1].variable, "q2");

        let missing = sheet(&["variable", "topic"], &[]);
        assert!(matches!(
            read_codebook_entries(&missing),
            Err(DashError::MissingColumn { .. })
        ));
    }

    #[test]
    fn wide_layout() {
        let s = sheet(
            &["year", "political_aff", "ethnicity", "wt", "q1", "q2"],
            &[
                &["2023.0", "Democrat", "", "2.0", "1", ""],
                &["bad", "Democrat", "", "1.0", "1", "2"],
                &["2024", "", "White", "", "Don't know", "3"],
            ],
        );
        let mut cfs = FileSource::new("local", "test.csv");
        cfs.weight_column = Some("wt".to_string());
        let table = read_responses(&s, &cfs).unwrap();
        assert_eq!(table.mode, InputMode::Microdata);
        assert_eq!(table.records.len(), 3);
        let r0 = &table.records[0];
        assert_eq!((r0.variable.as_str(), r0.year), ("q1", 2023));
        assert_eq!(r0.weight, Some(2.0));
        assert_eq!(r0.demographics.political_affiliation.as_deref(), Some("Democrat"));
        assert_eq!(r0.demographics.ethnicity, None);
        assert_eq!(table.records[1].answer, AnswerValue::Text("Don't know".to_string()));
        assert_eq!(table.records[2].answer, AnswerValue::Code(3));
        assert_eq!(table.years(), vec![2023, 2024]);
    }

    #[test]
    fn aggregated_layout() {
        let s = sheet(
            &["variable", "year", "sample_group", "answer", "percentage"],
            &[
                &["q1", "2024", "White", "1", "40"],
                &["q1", "2024", "White", "2", "60"],
            ],
        );
        let mut cfs = FileSource::new("local", "test.csv");
        cfs.layout = Some("aggregated".to_string());
        cfs.sample_group_dimension = Some("ethnicity".to_string());
        let table = read_responses(&s, &cfs).unwrap();
        assert_eq!(table.mode, InputMode::Aggregated);
        assert_eq!(table.records[1].weight, Some(60.0));
        assert_eq!(table.records[1].demographics.ethnicity.as_deref(), Some("White"));

        cfs.layout = Some("matrix".to_string());
        assert!(read_responses(&s, &cfs).is_err());
    }
}
