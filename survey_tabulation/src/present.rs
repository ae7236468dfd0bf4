use log::debug;
use std::collections::BTreeSet;

pub use crate::config::*;
use crate::encoding::{apply_encoding, EncodingMap};

pub const YEAR_COLUMN: &str = "Year";
pub const ANSWER_COLUMN: &str = "Answer";
pub const PERCENTAGE_COLUMN: &str = "Percentage";

/// Melts the wide table into one row per (group, answer, year), replacing the
/// answer codes by their labels.
///
/// Cells without any population are skipped.
pub fn to_long(table: &Crosstab, labels: &EncodingMap) -> Vec<TidyRow> {
    let mut res: Vec<TidyRow> = Vec::new();
    for (y_idx, year) in table.years.iter().enumerate() {
        for row in table.rows.iter() {
            if let Some(percentage) = row.percentages.get(y_idx).cloned().flatten() {
                res.push(TidyRow {
                    year: year.to_string(),
                    group: row.group.clone(),
                    answer: apply_encoding(labels, &row.answer.to_string()),
                    percentage,
                });
            }
        }
    }
    debug!("to_long: {} tidy rows", res.len());
    res
}

/// Picks the chart layout from the number of distinct years left in the rows.
pub fn chart_spec(
    rows: &[TidyRow],
    entry: &CodebookEntry,
    dimension: Option<GroupDimension>,
) -> ChartSpec {
    let num_years = rows.iter().map(|r| r.year.as_str()).collect::<BTreeSet<&str>>().len();
    let facet_col = dimension.map(|d| d.label().to_string());
    let (kind, y, color, barmode) = match num_years {
        0 => (ChartKind::Empty, ANSWER_COLUMN, None, None),
        1 => (ChartKind::SingleYear, ANSWER_COLUMN, None, None),
        _ => (
            ChartKind::MultiYear,
            YEAR_COLUMN,
            Some(ANSWER_COLUMN.to_string()),
            Some("stack".to_string()),
        ),
    };
    ChartSpec {
        kind,
        x: PERCENTAGE_COLUMN.to_string(),
        y: y.to_string(),
        color,
        barmode,
        facet_col,
        title: entry.chart_title.clone(),
        subtitle: entry.chart_subtitle.clone(),
        panel_title: entry.panel_title.clone(),
        panel_subtitle: entry.panel_subtitle.clone(),
    }
}
