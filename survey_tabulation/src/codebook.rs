use log::{debug, warn};
use std::collections::{HashMap, HashSet};

pub use crate::config::*;

/// The datamap: the metadata of all the survey variables, in file order.
///
/// ```
/// use survey_tabulation::codebook::Codebook;
/// use survey_tabulation::CodebookEntry;
/// # use survey_tabulation::PipelineError;
///
/// let entry = CodebookEntry {
///     variable: "q1".to_string(),
///     topic: "Economy".to_string(),
///     question_text: "Is the economy doing well?".to_string(),
///     chart_title: String::new(),
///     chart_subtitle: String::new(),
///     panel_title: String::new(),
///     panel_subtitle: String::new(),
///     encoding: "1=Yes 2=No".to_string(),
/// };
/// let codebook = Codebook::new(vec![entry], false)?;
/// assert_eq!(codebook.topics(), vec!["Economy"]);
/// # Ok::<(), PipelineError>(())
/// ```
#[derive(PartialEq, Debug, Clone)]
pub struct Codebook {
    entries: Vec<CodebookEntry>,
    by_variable: HashMap<String, usize>,
    ambiguous: Vec<(String, Vec<String>)>,
}

impl Codebook {
    /// Validates the entries.
    ///
    /// A variable may only be described once. Question texts should be unique as well:
    /// when `strict_questions` is set, a shared question text is an error, otherwise
    /// it is reported and lookups resolve to the first entry.
    pub fn new(entries: Vec<CodebookEntry>, strict_questions: bool) -> Result<Codebook, PipelineError> {
        if entries.is_empty() {
            return Err(PipelineError::EmptyCodebook);
        }
        let mut by_variable: HashMap<String, usize> = HashMap::new();
        for (idx, e) in entries.iter().enumerate() {
            if by_variable.insert(e.variable.clone(), idx).is_some() {
                return Err(PipelineError::DuplicateVariable {
                    variable: e.variable.clone(),
                });
            }
        }

        let mut by_question: Vec<(String, Vec<String>)> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for e in entries.iter() {
            match seen.get(e.question_text.as_str()) {
                Some(pos) => by_question[*pos].1.push(e.variable.clone()),
                None => {
                    seen.insert(e.question_text.as_str(), by_question.len());
                    by_question.push((e.question_text.clone(), vec![e.variable.clone()]));
                }
            }
        }
        let ambiguous: Vec<(String, Vec<String>)> = by_question
            .into_iter()
            .filter(|(_, vars)| vars.len() > 1)
            .collect();

        if let Some((question, variables)) = ambiguous.first() {
            if strict_questions {
                return Err(PipelineError::AmbiguousQuestion {
                    question: question.clone(),
                    variables: variables.clone(),
                });
            }
            for (q, vars) in ambiguous.iter() {
                warn!(
                    "Codebook: question {:?} is shared by {:?}, the first one will be used",
                    q, vars
                );
            }
        }

        debug!("Codebook: {} entries", entries.len());
        Ok(Codebook {
            entries,
            by_variable,
            ambiguous,
        })
    }

    pub fn entries(&self) -> &[CodebookEntry] {
        &self.entries
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.by_variable.contains_key(variable)
    }

    /// The question texts that map to more than one variable.
    pub fn ambiguous_questions(&self) -> &[(String, Vec<String>)] {
        &self.ambiguous
    }

    /// The distinct topics, in order of first appearance.
    pub fn topics(&self) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.topic.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// The questions of a topic, in file order.
    pub fn questions(&self, topic: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| e.question_text.as_str())
            .collect()
    }

    /// Finds the variable asked with this exact question text.
    ///
    /// First match wins when the question text is shared.
    pub fn lookup(&self, topic: Option<&str>, question_text: &str) -> Result<&CodebookEntry, PipelineError> {
        self.entries
            .iter()
            .find(|e| e.question_text == question_text && topic.map_or(true, |t| e.topic == t))
            .ok_or_else(|| PipelineError::UnknownQuestion {
                question: question_text.to_string(),
            })
    }
}
