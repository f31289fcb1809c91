use serde::{Deserialize, Serialize};

/// A disease or condition mentioned in the report.
/// Deduplicated by `(canonical, section, negated)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseMention {
    pub text: String,
    pub canonical: String,
    pub negated: bool,
    pub uncertain: bool,
    pub historical: bool,
    pub section: Option<String>,
}

/// A non-negated diagnosis with its ICD-10 code when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedDiagnosis {
    pub disease: String,
    pub icd10: Option<String>,
    pub section: Option<String>,
}
