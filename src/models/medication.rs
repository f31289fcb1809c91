use serde::{Deserialize, Serialize};

use super::enums::{InteractionKind, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationMention {
    pub original_text: String,
    pub canonical: String,
    /// Empty when the medication is not in the vocabulary.
    pub generic: String,
    pub purpose: String,
    /// Free-text dose such as `"650mg"`; empty when none was found nearby.
    pub dose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionWarning {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub interaction_type: InteractionKind,
    pub recommendation: String,
}
