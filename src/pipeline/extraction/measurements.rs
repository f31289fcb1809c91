//! Named lab and vital-sign patterns.
//!
//! Every pattern captures the value in group 1 and, optionally, the unit in
//! group 2. Blood pressure captures systolic and diastolic instead and is
//! emitted as one composite reading. After the named pass the generic
//! "Label: value unit" scanner in [`super::fallback`] fills in tests that no
//! named pattern covers.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::fallback::scan_generic_lines;
use super::types::ExtractionError;
use crate::models::enums::PipelineStage;
use crate::models::{ExtractionIssue, Observation, ObservedValue};
use crate::vocabulary::VocabularyStore;

/// Test name → readings, in the order each test first appears in the text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSet {
    entries: Vec<(String, Vec<Observation>)>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, observation: Observation) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, observations)) => observations.push(observation),
            None => self.entries.push((name.to_string(), vec![observation])),
        }
    }

    /// Case-insensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&[Observation]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, observations)| observations.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Observation])> {
        self.entries
            .iter()
            .map(|(name, observations)| (name.as_str(), observations.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of readings across all tests.
    pub fn observation_count(&self) -> usize {
        self.entries.iter().map(|(_, o)| o.len()).sum()
    }

    pub fn into_entries(self) -> Vec<(String, Vec<Observation>)> {
        self.entries
    }
}

/// Measurements plus the parse misses that were dropped along the way.
#[derive(Debug, Clone, Default)]
pub struct MeasurementExtraction {
    pub measurements: MeasurementSet,
    pub issues: Vec<ExtractionIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Scalar,
    Pressure,
}

struct MeasurementPattern {
    name: &'static str,
    regex: Regex,
    default_unit: &'static str,
    capture: Capture,
    /// A match directly preceded by one of these words belongs to a different test
    /// (`hs` before `CRP`, `urine` before `Albumin`).
    rejected_after: &'static [&'static str],
}

fn pattern(name: &'static str, regex: &str, default_unit: &'static str) -> MeasurementPattern {
    guarded(name, regex, default_unit, &[])
}

fn guarded(
    name: &'static str,
    regex: &str,
    default_unit: &'static str,
    rejected_after: &'static [&'static str],
) -> MeasurementPattern {
    MeasurementPattern {
        name,
        regex: Regex::new(regex).expect("Invalid measurement regex pattern"),
        default_unit,
        capture: Capture::Scalar,
        rejected_after,
    }
}

fn pressure(name: &'static str, regex: &str, default_unit: &'static str) -> MeasurementPattern {
    MeasurementPattern {
        capture: Capture::Pressure,
        ..pattern(name, regex, default_unit)
    }
}

/// Named patterns, grouped by panel. A test may have several patterns;
/// the same value position is only recorded once per test.
static MEASUREMENT_PATTERNS: LazyLock<Vec<MeasurementPattern>> = LazyLock::new(|| {
    vec![
        // Vitals
        pressure(
            "Blood Pressure",
            r"(?i)\b(\d{2,3})\s*/\s*(\d{2,3})\s*mm\s*hg",
            "mmHg",
        ),
        pattern("Heart Rate", r"(?i)\b(\d{2,3})\s*(bpm)\b", "bpm"),
        pattern(
            "Heart Rate",
            r"(?i)\b(?:heart\s+rate|pulse\s+rate|pulse|hr)\s*[:\-]?\s*(\d{2,3})\b(?:\s*(bpm|beats/min))?",
            "bpm",
        ),
        pattern(
            "Respiratory Rate",
            r"(?i)\b(\d{1,2})\s*(breaths/min)",
            "breaths/min",
        ),
        pattern(
            "Respiratory Rate",
            r"(?i)\b(?:respiratory\s+rate|rr)\s*[:\-]?\s*(\d{1,2})\b(?:\s*(breaths/min))?",
            "breaths/min",
        ),
        pattern(
            "Temperature",
            r"(?i)\b(?:temperature|temp)\s*[:\-]?\s*(\d{2,3}(?:\.\d+)?)\s*(°\s*[cf]|[cf])\b",
            "°C",
        ),
        pattern("SpO2", r"(?i)\b(\d{2,3})\s*%\s*SpO2\b", "%"),
        pattern("SpO2", r"(?i)\bSpO2\s*[:\-]?\s*(\d{2,3})\s*(%)?", "%"),
        pattern(
            "Height",
            r"(?i)\bheight\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(cm|feet|ft|inches|in|m)\b",
            "cm",
        ),
        pattern(
            "Weight",
            r"(?i)\b(\d+(?:\.\d+)?)\s*(kg|lbs|ibs)(?:[^/\w]|$)",
            "kg",
        ),
        pattern(
            "BMI",
            r"(?i)\bBMI\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(kg/m²|kg/m2)?",
            "kg/m²",
        ),
        // Diabetes
        guarded(
            "Glucose",
            r"(?i)\b(?:glucose|sugar|rbs|fbs|ppbs|bs)(?:\s*\(?(?:fasting|random|pp|post[\s-]*prandial)\)?)?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mg%|mmol/l)?",
            "mg/dL",
            &["urine", "urinary"],
        ),
        pattern(
            "HbA1c",
            r"(?i)\b(?:hba1c|a1c|glycated\s+ha?emoglobin|glycohemoglobin)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        // Hematology
        guarded(
            "Hemoglobin",
            r"(?i)\b(?:ha?emoglobin|hgb|hb)(?:\s*\(hb\))?\s*[:\-]?\s*(\d[\d.,]*)\s*(g/dl|gm/dl|gm%|gram%|g%)?",
            "g/dL",
            &["glycated", "glycosylated"],
        ),
        pattern(
            "Total Leukocyte Count",
            r"(?i)\b(?:total\s+leu[ck]ocyte\s+count|(?:total\s+)?wbc(?:\s+count)?|tlc|white\s+blood\s+cells?(?:\s+count)?)\s*[:\-]?\s*(\d[\d,]*(?:\.\d+)?)\s*(cells/cumm|cells/cu\s*mm|/cumm|cumm|/[µμu]l)?",
            "cells/cumm",
        ),
        pattern(
            "Total RBC Count",
            r"(?i)\b(?:total\s+rbc\s+count|rbc\s+count|trbc|rbc|red\s+blood\s+cells?(?:\s+count)?)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(millions?/cumm|mill/cumm|10\^6/[µμu]l)?",
            "million/cumm",
        ),
        pattern(
            "Platelet Count",
            r"(?i)\b(?:platelet\s+count|platelets|plt)\s*[:\-]?\s*(\d[\d,]*(?:\.\d+)?)\s*(lakhs?/cumm|lakhs?|/cumm|10\^3/[µμu]l)?",
            "lakh/cumm",
        ),
        pattern(
            "Hematocrit (HCT)",
            r"(?i)\b(?:ha?ematocrit|hct|pcv)(?:\s*\((?:hct|pcv)\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        pattern("MCV", r"(?i)\bMCV\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(fl)?", "fL"),
        pattern("MCH", r"(?i)\bMCH\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(pg)?", "pg"),
        pattern(
            "MCHC",
            r"(?i)\bMCHC\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(g/dl|%)?",
            "g/dL",
        ),
        pattern(
            "Neutrophils",
            r"(?i)\bneutrophils?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        pattern(
            "Lymphocytes",
            r"(?i)\blymphocytes?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        pattern(
            "Monocytes",
            r"(?i)\bmonocytes?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        pattern(
            "Eosinophils",
            r"(?i)\beosinophils?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        pattern(
            "Basophils",
            r"(?i)\bbasophils?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        // Lipid profile
        pattern(
            "Total Cholesterol",
            r"(?i)\b(?:total\s+cholesterol|serum\s+cholesterol|cholesterol,?\s+total)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "HDL Cholesterol",
            r"(?i)\bHDL(?:[\s-]*(?:cholesterol|c))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "LDL Cholesterol",
            r"(?i)\bLDL(?:[\s-]*(?:cholesterol|c))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "Triglycerides",
            r"(?i)\b(?:triglycerides?|tg)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        // Liver function
        pattern(
            "SGPT (ALT)",
            r"(?i)\b(?:sgpt|alt)(?:\s*\((?:alt|sgpt)\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(u/l|iu/l)?",
            "U/L",
        ),
        pattern(
            "SGOT (AST)",
            r"(?i)\b(?:sgot|ast)(?:\s*\((?:ast|sgot)\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(u/l|iu/l)?",
            "U/L",
        ),
        pattern(
            "ALP",
            r"(?i)\b(?:alp|alkaline\s+phosphatase)(?:\s*\(alp\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(u/l|iu/l)?",
            "U/L",
        ),
        pattern(
            "Bilirubin Total",
            r"(?i)\b(?:bilirubin[\s,\-]*total|total\s+bilirubin|serum\s+bilirubin)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl)?",
            "mg/dL",
        ),
        pattern(
            "Bilirubin Direct",
            r"(?i)\b(?:bilirubin[\s,\-]*direct|direct\s+bilirubin|conjugated\s+bilirubin)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl)?",
            "mg/dL",
        ),
        guarded(
            "Albumin",
            r"(?i)\b(?:serum\s+)?albumin\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(g/dl|g/l)?",
            "g/dL",
            &["urine", "urinary", "micro"],
        ),
        // Kidney function
        guarded(
            "Serum Creatinine",
            r"(?i)\b(?:serum\s+creatinine|s\.\s*creatinine|creatinine|scr)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|[µμu]mol/l)?",
            "mg/dL",
            &["urine", "urinary"],
        ),
        pattern(
            "BUN",
            r"(?i)\b(?:bun|blood\s+urea\s+nitrogen)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl)?",
            "mg/dL",
        ),
        pattern(
            "Urea",
            r"(?i)\b(?:blood\s+urea|serum\s+urea|urea)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "eGFR",
            r"(?i)\be?GFR(?:\s*\([^)]{1,20}\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ml/min/1\.73\s*m²|ml/min/1\.73\s*m2|ml/min)?",
            "mL/min/1.73m²",
        ),
        // Electrolytes
        pattern(
            "Sodium",
            r"(?i)\b(?:serum\s+)?sodium(?:\s*\(na\+?\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mmol/l|meq/l)?",
            "mmol/L",
        ),
        pattern(
            "Potassium",
            r"(?i)\b(?:serum\s+)?potassium(?:\s*\(k\+?\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mmol/l|meq/l)?",
            "mmol/L",
        ),
        pattern(
            "Calcium",
            r"(?i)\b(?:serum\s+)?calcium\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "Phosphate",
            r"(?i)\b(?:inorganic\s+)?(?:phosphate|phosphorus)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "Magnesium",
            r"(?i)\b(?:serum\s+)?magnesium\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|mmol/l)?",
            "mg/dL",
        ),
        pattern(
            "Chloride",
            r"(?i)\b(?:serum\s+)?chloride(?:\s*\(cl-?\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mmol/l|meq/l)?",
            "mmol/L",
        ),
        // Thyroid and hormones
        pattern(
            "TSH",
            r"(?i)\bTSH\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]iu/ml|miu/l|miu/ml)?",
            "µIU/mL",
        ),
        guarded(
            "T3",
            r"(?i)\b(?:total\s+)?T3\b\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/dl|ng/ml|nmol/l)?",
            "ng/dL",
            &["free"],
        ),
        guarded(
            "T4",
            r"(?i)\b(?:total\s+)?T4\b\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]g/dl|mcg/dl|nmol/l)?",
            "µg/dL",
            &["free"],
        ),
        pattern(
            "Insulin",
            r"(?i)\b(?:fasting\s+)?(?:serum\s+)?insulin\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]iu/ml)?",
            "µIU/mL",
        ),
        // Vitamins
        pattern(
            "Vitamin D",
            r"(?i)\b(?:25[\s-]*(?:\(oh\)|oh)[\s-]*vitamin\s*d3?|vitamin\s*d3?|vit\.?\s*d3?)\b(?:\s*\(total\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml|nmol/l)?",
            "ng/mL",
        ),
        pattern(
            "Vitamin B12",
            r"(?i)\b(?:vitamin\s*b[\s-]*12|vit\.?\s*b[\s-]*12|b12|cobalamin)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(pg/ml|pmol/l)?",
            "pg/mL",
        ),
        pattern(
            "Folate",
            r"(?i)\b(?:serum\s+)?(?:folate|folic\s+acid)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml)?",
            "ng/mL",
        ),
        pattern(
            "Vitamin A",
            r"(?i)\bvitamin\s*a\b\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]g/l|[µμu]g/dl)?",
            "µg/L",
        ),
        pattern(
            "Vitamin E",
            r"(?i)\bvitamin\s*e\b\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/l)?",
            "mg/L",
        ),
        pattern(
            "Vitamin K",
            r"(?i)\bvitamin\s*k\b\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml)?",
            "ng/mL",
        ),
        // Cardiac markers
        pattern(
            "Troponin",
            r"(?i)\b(?:hs[\s-]*)?troponin(?:[\s-]*[it])?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml|ng/l|pg/ml)?",
            "ng/mL",
        ),
        pattern(
            "CKMB",
            r"(?i)\bCK[\s-]?MB\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(u/l|iu/l|ng/ml)?",
            "U/L",
        ),
        guarded(
            "Pro-BNP",
            r"(?i)\b(?:pro[\s-]?bnp|bnp)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(pg/ml)?",
            "pg/mL",
            &["nt"],
        ),
        pattern(
            "NT-proBNP",
            r"(?i)\bNT[\s-]*pro[\s-]*BNP\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(pg/ml)?",
            "pg/mL",
        ),
        // Coagulation
        pattern("INR", r"(?i)\bINR\s*[:\-]?\s*(\d+(?:\.\d+)?)", ""),
        // `PT` stays case-sensitive so "Pt" (patient) is not read as prothrombin time.
        pattern(
            "PT",
            r"\b(?:PT|(?i:prothrombin\s+time))(?i:\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(seconds|secs?|s\b)?)",
            "sec",
        ),
        pattern(
            "PTT",
            r"(?i)\b(?:a?PTT|partial\s+thromboplastin\s+time)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(seconds|secs?|s\b)?",
            "sec",
        ),
        pattern(
            "Fibrinogen",
            r"(?i)\bfibrinogen\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl|g/l)?",
            "mg/dL",
        ),
        // Inflammation
        pattern(
            "ESR",
            r"(?i)\bESR\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mm/hr|mm/h|mm)?",
            "mm/hr",
        ),
        guarded(
            "CRP",
            r"(?i)\b(?:crp|c[\s-]*reactive\s+protein)(?:\s*\(crp\))?\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/l|mg/dl)?",
            "mg/L",
            &["hs", "sensitivity", "sensitive"],
        ),
        pattern(
            "hs-CRP",
            r"(?i)\b(?:hs[\s-]*crp|high[\s-]*sensitivity\s+(?:crp|c[\s-]*reactive\s+protein))\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/l)?",
            "mg/L",
        ),
        pattern(
            "Procalcitonin",
            r"(?i)\b(?:procalcitonin|pct)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml)?",
            "ng/mL",
        ),
        pattern(
            "D-Dimer",
            r"(?i)\bD[\s-]*Dimer\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]g/ml|mg/l|ng/ml)?",
            "µg/mL",
        ),
        // Metabolic, iron, renal protein
        pattern(
            "Uric Acid",
            r"(?i)\b(?:serum\s+)?uric\s+acid\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/dl)?",
            "mg/dL",
        ),
        pattern(
            "Serum Iron",
            r"(?i)\bserum\s+iron\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]g/dl)?",
            "µg/dL",
        ),
        pattern(
            "TIBC",
            r"(?i)\b(?:tibc|total\s+iron\s+binding\s+capacity)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]g/dl)?",
            "µg/dL",
        ),
        pattern(
            "Transferrin Saturation",
            r"(?i)\btransferrin\s+saturation\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(%)?",
            "%",
        ),
        pattern(
            "Urine Albumin",
            r"(?i)\b(?:urine\s+albumin|urinary\s+albumin|micro\s*albumin(?:uria)?)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/l|mg/dl)?",
            "mg/L",
        ),
        pattern(
            "Albumin/Creatinine Ratio",
            r"(?i)\b(?:u?acr|albumin\s*[/\-]?\s*creatinine\s+ratio)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(mg/g|mg/mmol)?",
            "mg/g",
        ),
        pattern(
            "Homocysteine",
            r"(?i)\bhomocysteine\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*([µμu]mol/l)?",
            "µmol/L",
        ),
        // Autoimmune and tumour markers
        pattern(
            "Rheumatoid Factor",
            r"(?i)\b(?:rheumatoid\s+factor|rf)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(iu/ml|u/ml)?",
            "IU/mL",
        ),
        pattern(
            "Anti-CCP",
            r"(?i)\banti[\s-]*ccp\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(u/ml|eu/ml)?",
            "U/mL",
        ),
        guarded(
            "PSA",
            r"(?i)\b(?:total\s+)?(?:psa|prostate\s+specific\s+antigen)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml)?",
            "ng/mL",
            &["free"],
        ),
        pattern(
            "CA-125",
            r"(?i)\bCA[\s-]*125\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(u/ml)?",
            "U/mL",
        ),
        pattern(
            "CEA",
            r"(?i)\b(?:cea|carcinoembryonic\s+antigen)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml)?",
            "ng/mL",
        ),
        pattern(
            "AFP",
            r"(?i)\b(?:afp|alpha[\s-]*feto[\s-]*protein)\s*[:\-]?\s*(\d+(?:\.\d+)?)\s*(ng/ml)?",
            "ng/mL",
        ),
    ]
});

/// A dose unit right after a scalar match means a prescription line
/// ("Calcium 500 mg", "Insulin 10 units"), not a lab result.
static DOSE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:mg|mcg|units?|iu|ml)\b\s*(?:[^/%\s]|$)")
        .expect("Invalid dose suffix regex pattern")
});

static NUMERIC_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:\.\d+)?").expect("Invalid numeric fallback regex pattern")
});

/// Parse a captured numeral. Thousands separators are stripped; a capture with
/// stray characters falls back to its first `digits[.digits]` run.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if let Ok(value) = cleaned.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    NUMERIC_FALLBACK
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Run the named patterns, then the generic line scanner.
pub fn extract_measurements(text: &str, vocabulary: &VocabularyStore) -> MeasurementExtraction {
    let mut extraction = MeasurementExtraction::default();
    if text.trim().is_empty() {
        return extraction;
    }

    struct Hit {
        name: &'static str,
        start: usize,
        observation: Observation,
    }

    let mut hits: Vec<Hit> = Vec::new();
    let mut seen: HashSet<(&'static str, usize)> = HashSet::new();
    let mut claimed: Vec<Range<usize>> = Vec::new();

    for pattern in MEASUREMENT_PATTERNS.iter() {
        for caps in pattern.regex.captures_iter(text) {
            let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if is_rejected_context(text, whole.start(), pattern.rejected_after) {
                continue;
            }
            if pattern.capture == Capture::Scalar && DOSE_SUFFIX.is_match(&text[whole.end()..]) {
                continue;
            }
            if !seen.insert((pattern.name, value.start())) {
                continue;
            }
            claimed.push(value.range());

            match read_observation(pattern, &caps) {
                Ok(observation) => hits.push(Hit {
                    name: pattern.name,
                    start: value.start(),
                    observation,
                }),
                Err(err) => {
                    tracing::warn!(test = pattern.name, error = %err, "Dropping unparsable measurement");
                    extraction
                        .issues
                        .push(err.to_issue(PipelineStage::Measurements));
                }
            }
        }
    }

    hits.sort_by_key(|hit| hit.start);
    for hit in hits {
        extraction.measurements.push(hit.name, hit.observation);
    }
    let named = extraction.measurements.len();

    scan_generic_lines(text, vocabulary, &claimed, &mut extraction.measurements);

    tracing::debug!(
        named,
        generic = extraction.measurements.len() - named,
        dropped = extraction.issues.len(),
        "Measurement extraction complete"
    );

    extraction
}

fn read_observation(
    pattern: &MeasurementPattern,
    caps: &Captures<'_>,
) -> Result<Observation, ExtractionError> {
    let number = |group: usize| -> Result<f64, ExtractionError> {
        let raw = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
        parse_number(raw).ok_or_else(|| ExtractionError::UnparsableNumber {
            test: pattern.name.to_string(),
            raw: raw.to_string(),
        })
    };

    match pattern.capture {
        Capture::Pressure => Ok(Observation {
            value: ObservedValue::Pair {
                systolic: number(1)?,
                diastolic: number(2)?,
            },
            unit: pattern.default_unit.to_string(),
        }),
        Capture::Scalar => {
            let value = number(1)?;
            let unit = caps
                .get(2)
                .map(|m| normalize_unit(m.as_str()))
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| implied_unit(pattern, value).to_string());
            Ok(Observation::scalar(value, unit))
        }
    }
}

/// Unitless platelet counts are written either in lakhs (2.5) or per cumm (250000).
fn implied_unit(pattern: &MeasurementPattern, value: f64) -> &'static str {
    if pattern.name == "Platelet Count" && value >= 1000.0 {
        "/cumm"
    } else {
        pattern.default_unit
    }
}

fn normalize_unit(raw: &str) -> String {
    let compact: String = raw.split_whitespace().collect();
    if compact.eq_ignore_ascii_case("ibs") {
        return "lbs".to_string();
    }
    compact
}

/// The alphanumeric word immediately before `start`, ignoring spaces and hyphens.
fn is_rejected_context(text: &str, start: usize, rejected: &[&str]) -> bool {
    if rejected.is_empty() {
        return false;
    }
    let before = text[..start].trim_end_matches(|c: char| c.is_whitespace() || c == '-');
    let Some(word) = before.rsplit(|c: char| !c.is_alphanumeric()).next() else {
        return false;
    };
    let word = word.to_lowercase();
    rejected.iter().any(|r| *r == word)
}
