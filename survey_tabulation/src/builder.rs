pub use crate::config::*;

/// A builder for assembling a response table.
///
/// ```
/// pub use survey_tabulation::builder::Builder;
/// pub use survey_tabulation::InputMode;
///
/// let mut builder = Builder::new(InputMode::Microdata);
/// builder.add_answer_simple("q1", 2024, "1");
/// builder.add_answer_simple("q1", 2024, "Don't know");
/// builder.add_answer_simple("q1", 2024, "");
///
/// let table = builder.build();
/// // Blank answers are not recorded.
/// assert_eq!(table.records.len(), 2);
/// ```
pub struct Builder {
    pub(crate) _mode: InputMode,
    pub(crate) _records: Vec<ResponseRecord>,
}

impl Builder {
    pub fn new(mode: InputMode) -> Builder {
        Builder {
            _mode: mode,
            _records: Vec::new(),
        }
    }

    /// Adds the answer of a respondent without any demographic information.
    pub fn add_answer_simple(&mut self, variable: &str, year: i32, answer: &str) {
        self.add_answer(variable, year, &Demographics::default(), AnswerValue::parse(answer), None)
    }

    /// Adds an answer.
    ///
    /// weight: the respondent weight for microdata, the percentage for pre-aggregated tables.
    /// Blank answers are skipped, the same way an empty cell does not count in a crosstab.
    pub fn add_answer(
        &mut self,
        variable: &str,
        year: i32,
        demographics: &Demographics,
        answer: AnswerValue,
        weight: Option<f64>,
    ) {
        if answer.is_blank() {
            return;
        }
        self.add_record(ResponseRecord {
            variable: variable.to_string(),
            year,
            demographics: demographics.clone(),
            answer,
            weight,
        })
    }

    pub fn add_record(&mut self, record: ResponseRecord) {
        self._records.push(record);
    }

    pub fn build(self) -> ResponseTable {
        ResponseTable::new(self._mode, self._records)
    }
}
