use log::debug;
use std::collections::HashSet;

use crate::codebook::Codebook;
pub use crate::config::*;
use crate::encoding::{parse_encoding, EncodingMap};

/// The answers meaning "don't know", "refused" or "no answer".
pub const UNKNOWN_ANSWER_LABELS: [&str; 5] = [
    "Don't know/No answer",
    "Don't Know/No Answer",
    "Prefer not to say",
    "No answer",
    "Don't know",
];

/// The numeric codes with the same meaning as `UNKNOWN_ANSWER_LABELS`.
pub const UNKNOWN_ANSWER_CODES: [i64; 2] = [99, 98];

pub fn is_unknown_answer(answer: &AnswerValue) -> bool {
    match answer {
        AnswerValue::Code(c) => UNKNOWN_ANSWER_CODES.contains(c),
        AnswerValue::Text(s) => UNKNOWN_ANSWER_LABELS.contains(&s.as_str()),
    }
}

/// A coded answer whose legend label is one of `UNKNOWN_ANSWER_LABELS`.
pub fn is_unknown_label(answer: &AnswerValue, labels: &EncodingMap) -> bool {
    match answer {
        AnswerValue::Code(c) => labels
            .get(&c.to_string())
            .map_or(false, |l| UNKNOWN_ANSWER_LABELS.contains(&l.as_str())),
        AnswerValue::Text(_) => false,
    }
}

/// The records of one question that survived the filters.
#[derive(PartialEq, Debug, Clone)]
pub struct Filtered<'a> {
    pub entry: &'a CodebookEntry,
    pub rows: Vec<&'a ResponseRecord>,
    pub report: FilterReport,
}

/// Joins the responses to the codebook and narrows them down to the selection.
///
/// An empty result is not an error.
pub fn select_rows<'a>(
    codebook: &'a Codebook,
    table: &'a ResponseTable,
    selection: &Selection,
) -> Result<Filtered<'a>, PipelineError> {
    let entry = codebook.lookup(selection.topic.as_deref(), &selection.question_text)?;
    debug!(
        "select_rows: question {:?} -> variable {:?}",
        selection.question_text, entry.variable
    );

    // A malformed legend only disables the label check.
    let labels = match parse_encoding(&entry.encoding) {
        Ok(m) => m,
        Err(e) => {
            debug!("select_rows: no labels for {:?}: {}", entry.variable, e);
            EncodingMap::new()
        }
    };

    let years: HashSet<i32> = selection.years.iter().cloned().collect();
    let dimension = selection.disaggregate.dimension();
    let mut report = FilterReport {
        input: table.records.len(),
        ..FilterReport::default()
    };

    let mut rows: Vec<&ResponseRecord> = Vec::new();
    for r in table.records.iter() {
        if !codebook.contains(&r.variable) {
            report.unmatched += 1;
            continue;
        }
        if r.variable != entry.variable {
            report.other_variables += 1;
            continue;
        }
        // No year selected means all the years.
        if !years.is_empty() && !years.contains(&r.year) {
            report.dropped_years += 1;
            continue;
        }
        if selection.exclude_unknown
            && (is_unknown_answer(&r.answer) || is_unknown_label(&r.answer, &labels))
        {
            report.dropped_unknown += 1;
            continue;
        }
        if let Some(d) = dimension {
            let missing = match r.demographics.get(d) {
                Some(g) => g.trim().is_empty(),
                None => true,
            };
            if missing {
                report.dropped_missing_group += 1;
                continue;
            }
        }
        rows.push(r);
    }
    report.output = rows.len();
    debug!("select_rows: {:?}", report);

    Ok(Filtered {
        entry,
        rows,
        report,
    })
}
