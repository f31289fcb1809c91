//! Unit reconciliation between an observed reading and its reference range.
//!
//! Spellings are folded to one key first (`gm%` and `g/dL` are the same unit),
//! then a conversion table maps the reading into the range unit. Conversions
//! between molar and mass units depend on the analyte, so those rows are keyed
//! by test name.

struct Conversion {
    /// `None` applies to every test.
    test: Option<&'static str>,
    from: &'static str,
    to: &'static str,
    factor: f64,
}

const fn any(from: &'static str, to: &'static str, factor: f64) -> Conversion {
    Conversion { test: None, from, to, factor }
}

const fn only(test: &'static str, from: &'static str, to: &'static str, factor: f64) -> Conversion {
    Conversion { test: Some(test), from, to, factor }
}

static CONVERSIONS: &[Conversion] = &[
    // Cell counts
    any("/cumm", "lakh/cumm", 1e-5),
    any("thousand/cumm", "lakh/cumm", 0.01),
    any("lakh/cumm", "/cumm", 1e5),
    any("thousand/cumm", "/cumm", 1e3),
    // Mass concentration
    any("g/l", "g/dl", 0.1),
    any("mg/l", "mg/dl", 0.1),
    any("mg/dl", "mg/l", 10.0),
    any("pg/ml", "ng/ml", 0.001),
    any("ng/ml", "ng/dl", 100.0),
    only("MCHC", "%", "g/dl", 1.0),
    // Molar to mass, per analyte
    only("Glucose", "mmol/l", "mg/dl", 18.0),
    only("Total Cholesterol", "mmol/l", "mg/dl", 38.67),
    only("HDL Cholesterol", "mmol/l", "mg/dl", 38.67),
    only("LDL Cholesterol", "mmol/l", "mg/dl", 38.67),
    only("Triglycerides", "mmol/l", "mg/dl", 88.57),
    only("Serum Creatinine", "umol/l", "mg/dl", 1.0 / 88.4),
    only("Urea", "mmol/l", "mg/dl", 6.006),
    only("BUN", "mmol/l", "mg/dl", 2.801),
    only("Calcium", "mmol/l", "mg/dl", 4.008),
    only("Magnesium", "mmol/l", "mg/dl", 2.431),
    only("Phosphate", "mmol/l", "mg/dl", 3.097),
    only("Uric Acid", "umol/l", "mg/dl", 1.0 / 59.48),
    only("Bilirubin Total", "umol/l", "mg/dl", 1.0 / 17.1),
    only("Bilirubin Direct", "umol/l", "mg/dl", 1.0 / 17.1),
    only("Vitamin D", "nmol/l", "ng/ml", 1.0 / 2.496),
    only("Vitamin B12", "pmol/l", "pg/ml", 1.355),
    only("T3", "nmol/l", "ng/dl", 65.1),
    only("T4", "nmol/l", "ug/dl", 1.0 / 12.87),
];

/// Lowercase, no whitespace, `µ`/`μ` as `u`, `²` as `2`, then synonyms collapsed.
fn unit_key(unit: &str) -> String {
    let folded: String = unit
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'µ' | 'μ' => 'u',
            '²' => '2',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    let canonical = match folded.as_str() {
        "mg%" => "mg/dl",
        "gm/dl" | "gm%" | "gram%" | "g%" => "g/dl",
        "cells/cumm" | "cumm" | "/ul" | "cells/ul" => "/cumm",
        "lakh" | "lakhs" | "lakhs/cumm" => "lakh/cumm",
        "millions/cumm" | "mill/cumm" | "10^6/ul" => "million/cumm",
        "10^3/ul" => "thousand/cumm",
        "iu/l" => "u/l",
        "meq/l" => "mmol/l",
        "miu/l" => "uiu/ml",
        "mcg/dl" => "ug/dl",
        "ng/l" => "pg/ml",
        "mm" | "mm/h" => "mm/hr",
        "ml/min" => "ml/min/1.73m2",
        "sec" | "secs" | "s" => "seconds",
        other => other,
    };
    canonical.to_string()
}

/// The reading expressed in `range_unit`, or `None` when the units cannot be reconciled.
/// An empty observed unit is taken to be the range unit.
pub fn to_range_unit(test_name: &str, value: f64, observed_unit: &str, range_unit: &str) -> Option<f64> {
    let from = unit_key(observed_unit);
    let to = unit_key(range_unit);
    if from.is_empty() || from == to {
        return Some(value);
    }

    CONVERSIONS
        .iter()
        .find(|c| c.from == from && c.to == to && c.test.map_or(true, |t| t == test_name))
        .map(|c| value * c.factor)
}
