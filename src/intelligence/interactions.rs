//! Pairwise drug-interaction screening over the medications of one report.

use crate::models::enums::{InteractionKind, Severity};
use crate::models::{InteractionWarning, MedicationMention};
use crate::vocabulary::{InteractionEntry, VocabularyStore};

/// Names that, together with warfarin, raise the bleeding-risk warning.
const NSAID_FAMILY: &[&str] = &[
    "aspirin",
    "ibuprofen",
    "naproxen",
    "diclofenac",
    "aceclofenac",
    "ketorolac",
];

const ANTICOAGULANT: &str = "warfarin";

/// Lowercase screening names: the generic when known, else the canonical name.
/// Order of first appearance, without repeats.
pub fn interaction_names(medications: &[MedicationMention]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for med in medications {
        let name = if med.generic.is_empty() {
            &med.canonical
        } else {
            &med.generic
        };
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// One moderate warning per interacting pair from the adjacency table, plus a
/// single high-severity warning when warfarin meets an NSAID.
pub fn check_interactions(names: &[String], vocabulary: &VocabularyStore) -> Vec<InteractionWarning> {
    let table = vocabulary.interactions();
    let mut warnings = Vec::new();

    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            if a == b {
                continue;
            }
            if interacts(table, a, b) || interacts(table, b, a) {
                warnings.push(InteractionWarning {
                    drug_a: a.clone(),
                    drug_b: b.clone(),
                    severity: Severity::Moderate,
                    interaction_type: InteractionKind::Potential,
                    recommendation: format!(
                        "Consult doctor about potential interaction between {a} and {b}"
                    ),
                });
            }
        }
    }

    let on_anticoagulant = names.iter().any(|n| n.contains(ANTICOAGULANT));
    let on_nsaid = names
        .iter()
        .any(|n| NSAID_FAMILY.iter().any(|nsaid| n.contains(nsaid)));
    if on_anticoagulant && on_nsaid {
        warnings.push(InteractionWarning {
            drug_a: ANTICOAGULANT.to_string(),
            drug_b: "aspirin/nsaids".to_string(),
            severity: Severity::High,
            interaction_type: InteractionKind::BleedingRisk,
            recommendation: "Warfarin with NSAIDs increases bleeding risk. Monitor closely."
                .to_string(),
        });
    }

    if !warnings.is_empty() {
        tracing::info!(
            medications = names.len(),
            warnings = warnings.len(),
            "Drug interactions flagged"
        );
    }
    warnings
}

/// `drug` is listed in the table and `other` starts with or contains one of its partners.
fn interacts(table: &[InteractionEntry], drug: &str, other: &str) -> bool {
    table
        .iter()
        .filter(|entry| drug == entry.drug || drug.contains(entry.drug.as_str()))
        .flat_map(|entry| entry.interacts_with.iter())
        .any(|partner| other.starts_with(partner.as_str()) || other.contains(partner.as_str()))
}
