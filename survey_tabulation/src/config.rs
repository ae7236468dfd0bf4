// ********* Input data structures ***********

use std::cmp::Ordering;
use std::error::Error;
use std::fmt::Display;

/// One row of the datamap: the metadata describing a survey variable.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodebookEntry {
    pub variable: String,
    pub topic: String,
    pub question_text: String,
    pub chart_title: String,
    pub chart_subtitle: String,
    pub panel_title: String,
    pub panel_subtitle: String,
    /// The free-text legend of the answer codes, for example `1=Yes 2=No 99=DK`.
    pub encoding: String,
}

/// The value of an answer, as read from the raw data.
///
/// Integer codes and integral floats from spreadsheets are both stored as codes,
/// so that `1` and `1.0` end up in the same crosstab row.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum AnswerValue {
    Code(i64),
    Text(String),
}

impl AnswerValue {
    /// Interprets a textual cell. Integer-looking content becomes a code.
    pub fn parse(s: &str) -> AnswerValue {
        let t = s.trim();
        if let Ok(i) = t.parse::<i64>() {
            return AnswerValue::Code(i);
        }
        match t.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => AnswerValue::Code(f as i64),
            _ => AnswerValue::Text(s.to_string()),
        }
    }

    pub fn from_float(f: f64) -> AnswerValue {
        if f.is_finite() && f.fract() == 0.0 {
            AnswerValue::Code(f as i64)
        } else {
            AnswerValue::Text(f.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, AnswerValue::Text(s) if s.trim().is_empty())
    }
}

impl Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Code(c) => write!(f, "{}", c),
            AnswerValue::Text(s) => write!(f, "{}", s),
        }
    }
}

// Codes sort numerically and come before any text answer.
impl Ord for AnswerValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AnswerValue::Code(a), AnswerValue::Code(b)) => a.cmp(b),
            (AnswerValue::Code(_), AnswerValue::Text(_)) => Ordering::Less,
            (AnswerValue::Text(_), AnswerValue::Code(_)) => Ordering::Greater,
            (AnswerValue::Text(a), AnswerValue::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for AnswerValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The demographic columns a respondent may be broken down by.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Demographics {
    pub political_affiliation: Option<String>,
    pub ethnicity: Option<String>,
}

impl Demographics {
    pub fn get(&self, dimension: GroupDimension) -> Option<&str> {
        match dimension {
            GroupDimension::PoliticalAffiliation => self.political_affiliation.as_deref(),
            GroupDimension::Ethnicity => self.ethnicity.as_deref(),
        }
    }

    pub fn set(&mut self, dimension: GroupDimension, value: Option<String>) {
        match dimension {
            GroupDimension::PoliticalAffiliation => self.political_affiliation = value,
            GroupDimension::Ethnicity => self.ethnicity = value,
        }
    }
}

/// A single answer of a respondent (microdata), or a single reported
/// percentage (pre-aggregated tables).
#[derive(PartialEq, Debug, Clone)]
pub struct ResponseRecord {
    pub variable: String,
    pub year: i32,
    pub demographics: Demographics,
    pub answer: AnswerValue,
    /// The respondent weight for microdata, or the reported percentage for
    /// pre-aggregated inputs.
    pub weight: Option<f64>,
}

/// How the records of a response table should be counted.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputMode {
    /// One record per respondent and variable.
    Microdata,
    /// One record per (variable, year, sample group, answer), already in percent.
    Aggregated,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ResponseTable {
    pub mode: InputMode,
    pub records: Vec<ResponseRecord>,
}

impl ResponseTable {
    pub fn new(mode: InputMode, records: Vec<ResponseRecord>) -> ResponseTable {
        ResponseTable { mode, records }
    }

    /// The distinct years present in the data, in increasing order.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

// ********* Selection **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum GroupDimension {
    PoliticalAffiliation,
    Ethnicity,
}

impl GroupDimension {
    /// The column header used in the tables and charts.
    pub fn label(&self) -> &'static str {
        match self {
            GroupDimension::PoliticalAffiliation => "Political Affiliation",
            GroupDimension::Ethnicity => "Ethnicity",
        }
    }
}

/// Whether (and by what) the results are broken down.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DisaggregateMode {
    None,
    By(GroupDimension),
}

impl DisaggregateMode {
    pub fn dimension(&self) -> Option<GroupDimension> {
        match self {
            DisaggregateMode::None => None,
            DisaggregateMode::By(d) => Some(*d),
        }
    }
}

/// The choices made by the analyst for one view.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    /// If provided, the question must belong to this topic.
    pub topic: Option<String>,
    pub question_text: String,
    /// An empty list selects all the years.
    pub years: Vec<i32>,
    pub disaggregate: DisaggregateMode,
    pub exclude_unknown: bool,
    /// Counts microdata rows by their respondent weight instead of 1.
    pub weighted: bool,
}

impl Selection {
    pub fn new(question_text: &str) -> Selection {
        Selection {
            topic: None,
            question_text: question_text.to_string(),
            years: Vec::new(),
            disaggregate: DisaggregateMode::None,
            exclude_unknown: true,
            weighted: false,
        }
    }
}

// ******** Output data structures *********

/// One row of the wide table: an answer (within a group) and its percentage for each year.
#[derive(PartialEq, Debug, Clone)]
pub struct CrosstabRow {
    pub group: Option<String>,
    pub answer: AnswerValue,
    /// Aligned with `Crosstab::years`. `None` if nobody in the group answered that year.
    pub percentages: Vec<Option<f64>>,
}

/// The aggregated result table.
#[derive(PartialEq, Debug, Clone)]
pub struct Crosstab {
    pub dimension: Option<GroupDimension>,
    pub years: Vec<i32>,
    pub rows: Vec<CrosstabRow>,
}

impl Crosstab {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single observation of the long table, as consumed by the charts.
#[derive(PartialEq, Debug, Clone)]
pub struct TidyRow {
    pub year: String,
    pub group: Option<String>,
    pub answer: String,
    pub percentage: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChartKind {
    /// Nothing to draw.
    Empty,
    /// A single year: one bar per answer.
    SingleYear,
    /// Several years: one stacked bar per year, colored by answer.
    MultiYear,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub barmode: Option<String>,
    pub facet_col: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub panel_title: String,
    pub panel_subtitle: String,
}

/// Row counts at each stage of the filtering.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FilterReport {
    pub input: usize,
    /// Records whose variable is not described in the codebook.
    pub unmatched: usize,
    pub other_variables: usize,
    pub dropped_years: usize,
    pub dropped_unknown: usize,
    pub dropped_missing_group: usize,
    pub output: usize,
}

/// Everything needed to display one question.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyView {
    pub entry: CodebookEntry,
    pub labels: crate::encoding::EncodingMap,
    pub labels_available: bool,
    pub table: Crosstab,
    pub rows: Vec<TidyRow>,
    pub chart: ChartSpec,
    pub report: FilterReport,
}

/// Errors that prevent the pipeline from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PipelineError {
    /// A legend segment without any `=`.
    MalformedSegment { segment: String },
    UnknownQuestion { question: String },
    DuplicateVariable { variable: String },
    AmbiguousQuestion { question: String, variables: Vec<String> },
    EmptyCodebook,
}

impl Error for PipelineError {}

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MalformedSegment { segment } => {
                write!(f, "malformed encoding segment {:?}", segment)
            }
            PipelineError::UnknownQuestion { question } => {
                write!(f, "selection not found: unknown question {:?}", question)
            }
            PipelineError::DuplicateVariable { variable } => {
                write!(f, "variable {:?} is described more than once", variable)
            }
            PipelineError::AmbiguousQuestion {
                question,
                variables,
            } => write!(
                f,
                "question {:?} is shared by variables {:?}",
                question, variables
            ),
            PipelineError::EmptyCodebook => write!(f, "the codebook has no entries"),
        }
    }
}
