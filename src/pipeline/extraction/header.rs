//! Patient and report identification lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::enums::Gender;
use crate::models::ReportHeader;

static NAME_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:patient(?:'s)?[ \t]+)?name[ \t]*[:\-][ \t]*([^\n]+)")
        .expect("Invalid name field regex pattern")
});

static TITLED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Miss)\.?[ \t]+[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)*")
        .expect("Invalid titled name regex pattern")
});

/// Where a name field runs into the next field on the same line.
static NAME_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s{2,}|\t|\b(?:age|sex|gender|dob|date|uhid|mrn|id)\b|\d")
        .expect("Invalid name end regex pattern")
});

static AGE_GENDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})[ \t]*(?:y|yrs?|years?)?[ \t]*/[ \t]*(male|female|m|f)\b")
        .expect("Invalid age/gender regex pattern")
});

static AGE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bage[ \t]*[:\-][ \t]*(\d{1,3})\b").expect("Invalid age regex pattern")
});

static GENDER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:sex|gender)[ \t]*[:\-][ \t]*(male|female|m|f)\b")
        .expect("Invalid gender regex pattern")
});

const DATE_VALUE: &str = r"(\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}|\d{1,2}[ \t]+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[ \t,]+\d{4})";

static LABELLED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:report(?:ed)?[ \t]+(?:date|on)|date(?:[ \t]+of[ \t]+report)?)[ \t]*[:\-]?[ \t]*{DATE_VALUE}"
    ))
    .expect("Invalid labelled date regex pattern")
});

static ANY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{DATE_VALUE}\b")).expect("Invalid date regex pattern")
});

static DOCTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bDr\.?[ \t]+([A-Z][A-Za-z]*\.?(?:[ \t]+[A-Z][A-Za-z]*\.?)*)")
        .expect("Invalid doctor regex pattern")
});

pub fn extract_header(text: &str) -> ReportHeader {
    let (mut age, mut gender) = match AGE_GENDER.captures(text) {
        Some(caps) => (capture(&caps, 1), gender_of(&capture(&caps, 2))),
        None => (String::new(), String::new()),
    };
    if age.is_empty() {
        age = AGE_FIELD
            .captures(text)
            .map(|caps| capture(&caps, 1))
            .unwrap_or_default();
    }
    if gender.is_empty() {
        gender = GENDER_FIELD
            .captures(text)
            .map(|caps| gender_of(&capture(&caps, 1)))
            .unwrap_or_default();
    }

    ReportHeader {
        patient_name: patient_name(text),
        age,
        gender,
        report_date: report_date(text),
        doctor: DOCTOR
            .captures(text)
            .map(|caps| format!("Dr. {}", capture(&caps, 1).trim_end_matches('.')))
            .unwrap_or_default(),
    }
}

fn capture(caps: &regex::Captures<'_>, group: usize) -> String {
    caps.get(group)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn gender_of(raw: &str) -> String {
    Gender::parse_lenient(raw)
        .map(|g| g.as_str().to_string())
        .unwrap_or_default()
}

fn patient_name(text: &str) -> String {
    if let Some(caps) = NAME_FIELD.captures(text) {
        let field = capture(&caps, 1);
        let name = match NAME_END.find(&field) {
            Some(m) => &field[..m.start()],
            None => field.as_str(),
        };
        let name = name.trim().trim_end_matches([',', ';', '/', '-', ':']).trim();
        if name.chars().filter(|c| c.is_alphabetic()).count() >= 2 {
            return name.to_string();
        }
    }
    TITLED_NAME
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn report_date(text: &str) -> String {
    LABELLED_DATE
        .captures(text)
        .or_else(|| ANY_DATE.captures(text))
        .map(|caps| capture(&caps, 1))
        .unwrap_or_default()
}
