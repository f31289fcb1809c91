//! Generic "Label: value unit" scanner for tests without a named pattern.
//!
//! Three line shapes are recognized:
//! `Ferritin: 120 ng/mL`, `Ferritin 120 ng/mL`, and a label line followed by a
//! `120 ng/mL` line. Named-pattern results always take precedence.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::measurements::{parse_number, MeasurementSet};
use crate::config::{GENERIC_VALUE_MAX, GENERIC_VALUE_MIN};
use crate::models::Observation;
use crate::vocabulary::VocabularyStore;

const MIN_LINE_CHARS: usize = 5;
const MIN_LABEL_CHARS: usize = 2;
const MAX_LABEL_CHARS: usize = 50;

/// Words that mark a line as report furniture rather than a test result.
const STOP_WORDS: &[&str] = &[
    "page", "date", "time", "report", "patient", "doctor", "dr", "lab", "laboratory", "normal",
    "range", "reference", "ref", "value", "result", "test", "name", "id", "age", "sex", "gender",
    "male", "female", "years", "yrs", "old", "mm", "dd", "yyyy", "header", "footer", "of", "total",
    "no", "bed", "ward", "room", "phone", "mobile", "sample", "collected", "received", "reported",
];

/// Units that mean a dosing line, not a measurement.
const DOSE_UNITS: &[&str] = &["mg", "mcg", "ml", "unit", "units", "iu", "tab", "tablet", "tablets"];

static LABEL_COLON_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z][a-z0-9\s\-/()]{2,40}?)\s*[:\-]\s*(\d+[.,]?\d*)\s*([a-z/%°µμ²³]+)?")
        .expect("Invalid fallback regex pattern")
});

static LABEL_VALUE_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z][a-z0-9\s\-/()]{2,40}?)\s+(\d+[.,]?\d*)\s+([a-z/%°µμ²³]+)\s*$")
        .expect("Invalid fallback regex pattern")
});

static VALUE_UNIT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+[.,]?\d*)\s+([a-z/%°µμ²³]+)").expect("Invalid fallback regex pattern")
});

static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9\s\-/()]*$").expect("Invalid fallback regex pattern")
});

/// A trimmed line and the byte offset of its first character in the report.
struct Line<'a> {
    text: &'a str,
    offset: usize,
}

struct Candidate<'a> {
    label: &'a str,
    raw_value: &'a str,
    value_offset: usize,
    unit: Option<&'a str>,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in text.split('\n') {
        let leading = raw.len() - raw.trim_start().len();
        lines.push(Line {
            text: raw.trim(),
            offset: start + leading,
        });
        start += raw.len() + 1;
    }
    lines
}

/// Add generic readings to `set`. Values whose position falls inside a
/// `claimed` span were already read by a named pattern and are skipped.
pub fn scan_generic_lines(
    text: &str,
    vocabulary: &VocabularyStore,
    claimed: &[Range<usize>],
    set: &mut MeasurementSet,
) {
    let lines = split_lines(text);

    for (i, line) in lines.iter().enumerate() {
        if line.text.chars().count() < MIN_LINE_CHARS {
            continue;
        }
        let Some(candidate) = find_candidate(line, lines.get(i + 1)) else {
            continue;
        };
        if claimed
            .iter()
            .any(|span| span.contains(&candidate.value_offset))
        {
            continue;
        }
        if let Some((name, observation)) = accept(&candidate, vocabulary, set) {
            tracing::debug!(test = %name, "Generic measurement captured");
            set.push(&name, observation);
        }
    }
}

fn find_candidate<'a>(line: &Line<'a>, next: Option<&Line<'a>>) -> Option<Candidate<'a>> {
    let caps = LABEL_COLON_VALUE
        .captures(line.text)
        .or_else(|| LABEL_VALUE_UNIT.captures(line.text));

    if let Some(caps) = caps {
        let label = caps.get(1)?;
        let value = caps.get(2)?;
        return Some(Candidate {
            label: label.as_str(),
            raw_value: value.as_str(),
            value_offset: line.offset + value.start(),
            unit: caps.get(3).map(|m| m.as_str()),
        });
    }

    // Label on its own line, reading on the next.
    let next = next?;
    if !LABEL_LINE.is_match(line.text) {
        return None;
    }
    let caps = VALUE_UNIT_LINE.captures(next.text)?;
    let value = caps.get(1)?;
    Some(Candidate {
        label: line.text,
        raw_value: value.as_str(),
        value_offset: next.offset + value.start(),
        unit: caps.get(2).map(|m| m.as_str()),
    })
}

fn accept(
    candidate: &Candidate<'_>,
    vocabulary: &VocabularyStore,
    set: &MeasurementSet,
) -> Option<(String, Observation)> {
    let label = candidate.label.trim();
    if !is_plausible_label(label) {
        return None;
    }
    if candidate
        .unit
        .is_some_and(|u| DOSE_UNITS.contains(&u.to_lowercase().as_str()))
    {
        return None;
    }

    let value = parse_number(candidate.raw_value)?;
    if !(GENERIC_VALUE_MIN..=GENERIC_VALUE_MAX).contains(&value) {
        return None;
    }

    // Known aliases resolve to the reference-range name so evaluation finds them.
    let range = vocabulary.reference_range(label);
    let name = match range {
        Some(range) => range.test_name.clone(),
        None => normalize_test_name(label),
    };
    if set.contains(&name) {
        return None;
    }

    let unit = candidate
        .unit
        .map(str::to_string)
        .or_else(|| range.map(|r| r.unit.clone()))
        .unwrap_or_default();

    Some((name, Observation::scalar(value, unit)))
}

fn is_plausible_label(label: &str) -> bool {
    let len = label.chars().count();
    if !(MIN_LABEL_CHARS..=MAX_LABEL_CHARS).contains(&len) {
        return false;
    }
    if !label.chars().any(char::is_alphabetic) {
        return false;
    }
    // "BP 140/" is the front half of a reading, not a label.
    if !label
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == ')')
    {
        return false;
    }
    !label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| STOP_WORDS.contains(&w.to_lowercase().as_str()))
}

/// Collapse whitespace and title-case each word, keeping all-caps acronyms
/// (`"serum FERRITIN level"` → `"Serum FERRITIN Level"`).
pub fn normalize_test_name(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| {
            if is_acronym(word) {
                word.to_string()
            } else {
                title_case(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_acronym(word: &str) -> bool {
    word.chars().count() > 1
        && word.chars().any(char::is_alphabetic)
        && !word.chars().any(char::is_lowercase)
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut in_letters = false;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if in_letters {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_letters = true;
        } else {
            out.push(ch);
            in_letters = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str, set: &mut MeasurementSet) {
        let vocabulary = VocabularyStore::embedded().unwrap();
        scan_generic_lines(text, &vocabulary, &[], set);
    }

    #[test]
    fn colon_separated_line() {
        let mut set = MeasurementSet::new();
        scan("Ferritin: 120 ng/mL", &mut set);
        assert_eq!(
            set.get("Ferritin").unwrap(),
            &[Observation::scalar(120.0, "ng/mL")]
        );
    }

    #[test]
    fn space_separated_line_needs_a_unit() {
        let mut set = MeasurementSet::new();
        scan("Serum Ferritin 85 ng/mL\nLipase 40", &mut set);
        assert!(set.contains("Serum Ferritin"));
        assert!(!set.contains("Lipase"));
    }

    #[test]
    fn label_and_value_on_separate_lines() {
        let mut set = MeasurementSet::new();
        scan("Amylase\n72 U/L", &mut set);
        assert_eq!(set.get("Amylase").unwrap(), &[Observation::scalar(72.0, "U/L")]);
    }

    #[test]
    fn stop_words_reject_report_furniture() {
        let mut set = MeasurementSet::new();
        scan(
            "Patient Age: 45 years\nPage 1 of 2\nReference Range: 12 mg\nSample No: 4411",
            &mut set,
        );
        assert!(set.is_empty());
    }

    #[test]
    fn values_outside_sanity_bounds_are_skipped() {
        let mut set = MeasurementSet::new();
        scan("Lipoprotein A: 12000 mg/dL", &mut set);
        assert!(set.is_empty());
    }

    #[test]
    fn named_results_take_precedence() {
        let mut set = MeasurementSet::new();
        set.push("Hemoglobin", Observation::scalar(10.5, "g/dL"));
        scan("HEMOGLOBIN: 11.0 g/dL\nHb: 12.0 g/dL", &mut set);
        assert_eq!(set.get("Hemoglobin").unwrap().len(), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn known_alias_resolves_to_range_name() {
        let mut set = MeasurementSet::new();
        scan("Cholesterol: 220", &mut set);
        assert_eq!(
            set.get("Total Cholesterol").unwrap(),
            &[Observation::scalar(220.0, "mg/dL")]
        );
    }

    #[test]
    fn claimed_values_are_skipped() {
        let vocabulary = VocabularyStore::embedded().unwrap();
        let mut set = MeasurementSet::new();
        let text = "Pulse Rate: 72 bpm";
        let value_at = text.find("72").unwrap();
        scan_generic_lines(text, &vocabulary, &[value_at..value_at + 2], &mut set);
        assert!(set.is_empty());
    }

    #[test]
    fn dose_lines_are_not_measurements() {
        let mut set = MeasurementSet::new();
        scan("Injection Insulin 10 units\nMetformin: 500 mg", &mut set);
        assert!(set.is_empty());
    }

    #[test]
    fn half_readings_are_not_labels() {
        let mut set = MeasurementSet::new();
        scan("BP 140/90 mmHg", &mut set);
        assert!(set.is_empty());
    }

    #[test]
    fn test_names_keep_acronyms() {
        assert_eq!(normalize_test_name("RBC  count"), "RBC Count");
        assert_eq!(normalize_test_name("serum ferritin"), "Serum Ferritin");
        assert_eq!(normalize_test_name("anti-tpo"), "Anti-Tpo");
        assert_eq!(normalize_test_name("T3 uptake"), "T3 Uptake");
    }
}
