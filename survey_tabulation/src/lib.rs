mod config;
use log::{debug, info, warn};

pub mod aggregate;
pub mod builder;
pub mod codebook;
pub mod encoding;
pub mod filter;
pub mod manual;
pub mod present;

pub use crate::config::*;

use crate::aggregate::{crosstab, Weighting};
use crate::codebook::Codebook;
use crate::encoding::{parse_encoding, EncodingMap};
use crate::filter::select_rows;
use crate::present::{chart_spec, to_long};

/// Computes the view of one question for the given selection.
///
/// Arguments:
/// * `codebook` the validated datamap
/// * `table` the responses, either microdata or pre-aggregated percentages
/// * `selection` the question, years and breakdown chosen by the analyst
///
/// The only failure is a question that cannot be found in the codebook. A legend
/// that cannot be parsed leaves the answers with their raw codes.
pub fn tabulate(
    codebook: &Codebook,
    table: &ResponseTable,
    selection: &Selection,
) -> Result<SurveyView, PipelineError> {
    info!(
        "tabulate: {:?} on {} records ({:?}), years {:?}, {:?}, exclude unknown: {}",
        selection.question_text,
        table.records.len(),
        table.mode,
        selection.years,
        selection.disaggregate,
        selection.exclude_unknown
    );

    let filtered = select_rows(codebook, table, selection)?;
    let dimension = selection.disaggregate.dimension();
    let weighting = Weighting::for_selection(table.mode, selection);
    let wide = crosstab(&filtered.rows, dimension, weighting);
    if wide.is_empty() {
        info!("tabulate: no responses left for {:?}", filtered.entry.variable);
    }

    let (labels, labels_available) = match parse_encoding(&filtered.entry.encoding) {
        Ok(m) => (m, true),
        Err(e) => {
            warn!(
                "tabulate: no labels available for {:?}: {}",
                filtered.entry.variable, e
            );
            (EncodingMap::new(), false)
        }
    };
    debug!("tabulate: labels {:?}", labels);

    let rows = to_long(&wide, &labels);
    let chart = chart_spec(&rows, filtered.entry, dimension);

    Ok(SurveyView {
        entry: filtered.entry.clone(),
        labels,
        labels_available,
        table: wide,
        rows,
        chart,
        report: filtered.report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::codebook::tests::entry;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn codebook() -> Codebook {
        Codebook::new(
            vec![
                entry("q1", "Economy", "Is the economy doing well?", "1=Agree 2=Disagree 99=Don't know"),
                entry("q2", "Economy", "Do you like it?", "Yes or no"),
            ],
            false,
        )
        .unwrap()
    }

    fn percentages(v: &SurveyView) -> Vec<(String, String, f64)> {
        v.rows
            .iter()
            .map(|r| (r.year.clone(), r.answer.clone(), r.percentage))
            .collect()
    }

    #[test]
    fn yes_no_example() {
        init_logger();
        let mut b = Builder::new(InputMode::Microdata);
        for (year, a) in [(2023, "Yes"), (2023, "Yes"), (2023, "No"), (2024, "Yes"), (2024, "No")] {
            b.add_answer_simple("q2", year, a);
        }
        let table = b.build();
        let mut sel = Selection::new("Do you like it?");
        sel.years = vec![2023, 2024];
        let v = tabulate(&codebook(), &table, &sel).unwrap();
        assert_eq!(
            percentages(&v),
            vec![
                ("2023".to_string(), "No".to_string(), 33.3),
                ("2023".to_string(), "Yes".to_string(), 66.7),
                ("2024".to_string(), "No".to_string(), 50.0),
                ("2024".to_string(), "Yes".to_string(), 50.0),
            ]
        );
        // The legend of q2 is broken: the raw answers are kept.
        assert!(!v.labels_available);
        assert_eq!(v.chart.kind, ChartKind::MultiYear);
    }

    #[test]
    fn codes_are_labelled_and_sentinels_dropped() {
        let mut b = Builder::new(InputMode::Microdata);
        for a in ["1", "2", "99", "1.0"] {
            b.add_answer_simple("q1", 2024, a);
        }
        let table = b.build();
        let sel = Selection::new("Is the economy doing well?");
        let v = tabulate(&codebook(), &table, &sel).unwrap();
        assert!(v.labels_available);
        assert_eq!(v.report.dropped_unknown, 1);
        assert_eq!(
            percentages(&v),
            vec![
                ("2024".to_string(), "Agree".to_string(), 66.7),
                ("2024".to_string(), "Disagree".to_string(), 33.3),
            ]
        );
        assert!(v.rows.iter().all(|r| r.answer != "Don't know"));
        assert_eq!(v.chart.kind, ChartKind::SingleYear);

        let mut with_dk = sel.clone();
        with_dk.exclude_unknown = false;
        let v2 = tabulate(&codebook(), &table, &with_dk).unwrap();
        assert_eq!(v2.rows.len(), 3);
        assert_eq!(v2.rows[2].answer, "Don't know");
        assert_eq!(v2.rows[2].percentage, 25.0);
    }

    #[test]
    fn labelled_sentinels_never_reach_the_answers() {
        let cb = Codebook::new(
            vec![entry("q3", "Economy", "Will it improve?", "1=Yes 2=No 97=Don't know/No answer")],
            false,
        )
        .unwrap();
        let mut b = Builder::new(InputMode::Microdata);
        for a in ["1", "2", "97"] {
            b.add_answer_simple("q3", 2024, a);
        }
        let table = b.build();
        let v = tabulate(&cb, &table, &Selection::new("Will it improve?")).unwrap();
        let answers: Vec<&str> = v.rows.iter().map(|r| r.answer.as_str()).collect();
        assert_eq!(answers, vec!["Yes", "No"]);
        assert_eq!(v.report.dropped_unknown, 1);
    }

    #[test]
    fn zero_years_is_all_years() {
        let mut b = Builder::new(InputMode::Microdata);
        for (year, a) in [(2022, "1"), (2023, "2"), (2024, "1"), (2024, "2")] {
            b.add_answer_simple("q1", year, a);
        }
        let table = b.build();
        let mut sel = Selection::new("Is the economy doing well?");
        let none = tabulate(&codebook(), &table, &sel).unwrap();
        sel.years = table.years();
        let all = tabulate(&codebook(), &table, &sel).unwrap();
        assert_eq!(none.rows, all.rows);
        assert_eq!(none.table, all.table);
    }

    #[test]
    fn empty_result_renders_an_empty_chart() {
        let table = Builder::new(InputMode::Microdata).build();
        let v = tabulate(&codebook(), &table, &Selection::new("Is the economy doing well?")).unwrap();
        assert!(v.table.is_empty());
        assert!(v.rows.is_empty());
        assert_eq!(v.chart.kind, ChartKind::Empty);
    }

    #[test]
    fn unknown_question_is_reported() {
        let table = Builder::new(InputMode::Microdata).build();
        let res = tabulate(&codebook(), &table, &Selection::new("Who?"));
        assert!(matches!(res, Err(PipelineError::UnknownQuestion { .. })));
    }

    #[test]
    fn grouped_view() {
        init_logger();
        let mut b = Builder::new(InputMode::Microdata);
        let dem = Demographics {
            political_affiliation: Some("Democrat".to_string()),
            ethnicity: None,
        };
        let rep = Demographics {
            political_affiliation: Some("Republican".to_string()),
            ethnicity: None,
        };
        b.add_answer("q1", 2024, &dem, AnswerValue::Code(1), None);
        b.add_answer("q1", 2024, &dem, AnswerValue::Code(2), None);
        b.add_answer("q1", 2024, &rep, AnswerValue::Code(2), None);
        b.add_answer("q1", 2024, &Demographics::default(), AnswerValue::Code(1), None);
        let table = b.build();
        let mut sel = Selection::new("Is the economy doing well?");
        sel.disaggregate = DisaggregateMode::By(GroupDimension::PoliticalAffiliation);
        let v = tabulate(&codebook(), &table, &sel).unwrap();
        let got: Vec<(Option<String>, String, f64)> = v
            .rows
            .iter()
            .map(|r| (r.group.clone(), r.answer.clone(), r.percentage))
            .collect();
        assert_eq!(
            got,
            vec![
                (Some("Democrat".to_string()), "Agree".to_string(), 50.0),
                (Some("Democrat".to_string()), "Disagree".to_string(), 50.0),
                (Some("Republican".to_string()), "Disagree".to_string(), 100.0),
            ]
        );
        assert_eq!(v.chart.facet_col.as_deref(), Some("Political Affiliation"));
        assert_eq!(v.report.dropped_missing_group, 1);
    }

    #[test]
    fn aggregated_input() {
        init_logger();
        let mut b = Builder::new(InputMode::Aggregated);
        let total = Demographics::default();
        b.add_answer("q1", 2024, &total, AnswerValue::Code(1), Some(45.0));
        b.add_answer("q1", 2024, &total, AnswerValue::Code(2), Some(45.0));
        b.add_answer("q1", 2024, &total, AnswerValue::Code(99), Some(10.0));
        let table = b.build();
        let v = tabulate(&codebook(), &table, &Selection::new("Is the economy doing well?")).unwrap();
        assert_eq!(
            percentages(&v),
            vec![
                ("2024".to_string(), "Agree".to_string(), 50.0),
                ("2024".to_string(), "Disagree".to_string(), 50.0),
            ]
        );
    }
}
