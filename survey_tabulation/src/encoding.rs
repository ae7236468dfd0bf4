//! Parsing of the answer legends of the datamap.
//!
//! A legend looks like `1=Agree 2=Disagree 99=Don't know`. Labels may contain spaces,
//! so a new segment starts at any whitespace immediately followed by a digit.
//! A label that contains a space followed by a number (`2=Between 1 and 5`) is
//! therefore cut in two.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::config::PipelineError;

/// Answer code (as displayed) -> answer label.
pub type EncodingMap = BTreeMap<String, String>;

static SEGMENT_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s[0-9]").unwrap());

/// Parses a legend into a code -> label map.
///
/// An empty legend gives an empty map. When a code appears twice, the last
/// label is kept.
///
/// ```
/// use survey_tabulation::encoding::parse_encoding;
///
/// let m = parse_encoding("1=Agree 2=Disagree 99=Don't know").unwrap();
/// assert_eq!(m.get("99").map(|s| s.as_str()), Some("Don't know"));
/// ```
pub fn parse_encoding(legend: &str) -> Result<EncodingMap, PipelineError> {
    let mut res: EncodingMap = EncodingMap::new();
    for segment in split_segments(legend) {
        let (code, label) = segment
            .split_once('=')
            .ok_or_else(|| PipelineError::MalformedSegment {
                segment: segment.to_string(),
            })?;
        if let Some(previous) = res.insert(code.trim().to_string(), label.trim().to_string()) {
            debug!(
                "parse_encoding: code {:?} redefined, dropping label {:?}",
                code.trim(),
                previous
            );
        }
    }
    Ok(res)
}

fn split_segments(legend: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    let mut start = 0;
    for m in SEGMENT_BOUNDARY.find_iter(legend) {
        segments.push(&legend[start..m.start()]);
        // The digit belongs to the next segment.
        start = m.end() - 1;
    }
    segments.push(&legend[start..]);
    segments
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Renders a map in the canonical `code=label code=label` form.
pub fn format_encoding(m: &EncodingMap) -> String {
    m.iter()
        .map(|(code, label)| format!("{}={}", code, label))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Replaces a code by its label, leaving unknown codes untouched.
pub fn apply_encoding(m: &EncodingMap, answer: &str) -> String {
    m.get(answer).cloned().unwrap_or_else(|| answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pairs: &[(&str, &str)]) -> EncodingMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn simple_legend() {
        assert_eq!(
            parse_encoding("1=Agree 2=Disagree 99=Don't know"),
            Ok(m(&[("1", "Agree"), ("2", "Disagree"), ("99", "Don't know")]))
        );
    }

    #[test]
    fn labels_with_spaces_are_trimmed() {
        assert_eq!(
            parse_encoding("  1= Strongly agree   2 = Somewhat agree\t3=Neither agree nor disagree "),
            Ok(m(&[
                ("1", "Strongly agree"),
                ("2", "Somewhat agree"),
                ("3", "Neither agree nor disagree")
            ]))
        );
    }

    #[test]
    fn empty_legend() {
        assert_eq!(parse_encoding(""), Ok(EncodingMap::new()));
        assert_eq!(parse_encoding("   \n "), Ok(EncodingMap::new()));
    }

    #[test]
    fn missing_equal_sign() {
        assert_eq!(
            parse_encoding("Yes or no"),
            Err(PipelineError::MalformedSegment {
                segment: "Yes or no".to_string()
            })
        );
    }

    #[test]
    fn number_inside_label_splits_the_segment() {
        // "1 and 5" becomes its own segment, without any '='.
        assert_eq!(
            parse_encoding("1=Less than 1 2=Between 1 and 5"),
            Err(PipelineError::MalformedSegment {
                segment: "1".to_string()
            })
        );
    }

    #[test]
    fn only_ascii_digits_start_a_segment() {
        let e = parse_encoding("1=Less than \u{FF11} 2=More").unwrap();
        assert_eq!(e, m(&[("1", "Less than \u{FF11}"), ("2", "More")]));
        let e2 = parse_encoding("1=Au moins \u{0663}\u{0663} 2=Plus").unwrap();
        assert_eq!(e2.get("1").map(|s| s.as_str()), Some("Au moins \u{0663}\u{0663}"));
    }

    #[test]
    fn split_only_on_first_equal() {
        assert_eq!(
            parse_encoding("1=a=b 2=c"),
            Ok(m(&[("1", "a=b"), ("2", "c")]))
        );
    }

    #[test]
    fn last_definition_wins() {
        assert_eq!(
            parse_encoding("1=Yes 2=No 1=Maybe"),
            Ok(m(&[("1", "Maybe"), ("2", "No")]))
        );
    }

    #[test]
    fn reparse_is_idempotent() {
        for legend in [
            "1=Agree 2=Disagree 99=Don't know",
            "1=Very likely 2=Somewhat likely 3=Not likely at all 98=Prefer not to say",
            "",
        ] {
            let first = parse_encoding(legend).unwrap();
            let second = parse_encoding(&format_encoding(&first)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn unknown_codes_pass_through() {
        let e = m(&[("1", "Yes")]);
        assert_eq!(apply_encoding(&e, "1"), "Yes");
        assert_eq!(apply_encoding(&e, "3"), "3");
        assert_eq!(apply_encoding(&e, "Republican"), "Republican");
    }
}
