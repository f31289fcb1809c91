use serde::{Deserialize, Serialize};

use crate::models::enums::Gender;

/// On-disk shape shared by every vocabulary table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedTable<T> {
    pub version: String,
    pub entries: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Reference range for one lab test (loaded from reference_ranges.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub test_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub min: f64,
    pub max: f64,
    pub unit: String,
    #[serde(default)]
    pub gender_specific: bool,
    #[serde(default)]
    pub male_range: Option<Bounds>,
    #[serde(default)]
    pub female_range: Option<Bounds>,
    /// Low values are a deficiency rather than a "good" result (e.g. HDL).
    #[serde(default)]
    pub higher_is_better: bool,
}

impl ReferenceRange {
    pub fn generic(&self) -> Bounds {
        Bounds {
            min: self.min,
            max: self.max,
        }
    }

    /// Resolve the bounds that apply to a patient. The gender sub-range is used
    /// only when the test is gender-specific and a gender was supplied.
    pub fn resolve(&self, gender: Option<Gender>) -> Bounds {
        if !self.gender_specific {
            return self.generic();
        }
        let sub = match gender {
            Some(Gender::Male) => self.male_range,
            Some(Gender::Female) => self.female_range,
            None => None,
        };
        sub.unwrap_or_else(|| self.generic())
    }
}

/// Alias → canonical medication record (loaded from medications.json).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationEntry {
    /// Lowercase surface form: generic name, brand, or common OCR spelling.
    pub alias: String,
    pub generic: String,
    pub purpose: String,
    /// Display name when it differs from `generic` (combination brands).
    #[serde(default)]
    pub canonical: Option<String>,
}

impl MedicationEntry {
    pub fn canonical_name(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.generic)
    }
}

/// One keyword → specialist rule. Rules are ordered; the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistRule {
    pub keyword: String,
    pub specialist: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icd10Entry {
    pub disease: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionAdviceEntry {
    pub condition: String,
    pub advice: Vec<String>,
}

/// Adjacency row: `drug` is known to interact with each of `interacts_with`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub drug: String,
    pub interacts_with: Vec<String>,
}
