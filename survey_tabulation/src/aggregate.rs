use log::debug;
use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;

/// How much a single record contributes to its crosstab cell.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Weighting {
    /// Every record counts as one respondent.
    Count,
    /// Microdata records count with their respondent weight (1 if missing).
    RespondentWeight,
    /// Pre-aggregated records contribute their reported percentage.
    ReportedPercentage,
}

impl Weighting {
    pub fn for_selection(mode: InputMode, selection: &Selection) -> Weighting {
        match mode {
            InputMode::Aggregated => Weighting::ReportedPercentage,
            InputMode::Microdata if selection.weighted => Weighting::RespondentWeight,
            InputMode::Microdata => Weighting::Count,
        }
    }

    fn value(&self, r: &ResponseRecord) -> f64 {
        match self {
            Weighting::Count => 1.0,
            Weighting::RespondentWeight => r.weight.unwrap_or(1.0),
            Weighting::ReportedPercentage => r.weight.unwrap_or(0.0),
        }
    }
}

/// Rounds to one decimal place, halves away from zero.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// The key of a column population: the group (if any) and the year.
type PopulationKey = (Option<String>, i32);

/// Cross-tabulates the answers by year and normalizes them into percentages.
///
/// Without a dimension, the percentages of each year sum to 100. With a dimension,
/// they sum to 100 for each (group, year) pair, independently of the other groups.
pub fn crosstab(
    rows: &[&ResponseRecord],
    dimension: Option<GroupDimension>,
    weighting: Weighting,
) -> Crosstab {
    let mut cells: BTreeMap<(Option<String>, AnswerValue), BTreeMap<i32, f64>> = BTreeMap::new();
    let mut totals: BTreeMap<PopulationKey, f64> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();

    for r in rows.iter() {
        let group: Option<String> =
            dimension.and_then(|d| r.demographics.get(d).map(|s| s.to_string()));
        let w = weighting.value(r);
        years.insert(r.year);
        *cells
            .entry((group.clone(), r.answer.clone()))
            .or_default()
            .entry(r.year)
            .or_insert(0.0) += w;
        *totals.entry((group, r.year)).or_insert(0.0) += w;
    }

    let years: Vec<i32> = years.into_iter().collect();
    debug!(
        "crosstab: {} rows, {} cells, years {:?}, populations {:?}",
        rows.len(),
        cells.len(),
        years,
        totals
    );

    let res_rows: Vec<CrosstabRow> = cells
        .into_iter()
        .map(|((group, answer), counts)| {
            let percentages: Vec<Option<f64>> = years
                .iter()
                .map(|y| {
                    let total = totals.get(&(group.clone(), *y)).cloned().unwrap_or(0.0);
                    if total > 0.0 {
                        let count = counts.get(y).cloned().unwrap_or(0.0);
                        Some(round1(count / total * 100.0))
                    } else {
                        None
                    }
                })
                .collect();
            CrosstabRow {
                group,
                answer,
                percentages,
            }
        })
        .collect();

    Crosstab {
        dimension,
        years,
        rows: res_rows,
    }
}
