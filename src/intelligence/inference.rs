use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::DEFAULT_SPECIALIST;
use crate::models::enums::RangeStatus;
use crate::models::{AbnormalTest, CodedDiagnosis, DiseaseMention};
use crate::vocabulary::VocabularyStore;

// ---------------------------------------------------------------------------
// [1] Diseases suggested by abnormal labs
// ---------------------------------------------------------------------------

/// Test-name keywords + status → suggested disease.
struct LabRule {
    test: Regex,
    status: RangeStatus,
    disease: &'static str,
}

fn lab_rule(test: &str, status: RangeStatus, disease: &'static str) -> LabRule {
    LabRule {
        test: Regex::new(&format!(r"(?i)\b(?:{test})\b")).expect("Invalid lab rule regex pattern"),
        status,
        disease,
    }
}

static LAB_RULES: LazyLock<Vec<LabRule>> = LazyLock::new(|| {
    vec![
        lab_rule("glucose", RangeStatus::High, "Diabetes"),
        lab_rule("glucose", RangeStatus::Low, "Hypoglycemia"),
        lab_rule("hemoglobin", RangeStatus::Low, "Anemia"),
        lab_rule("total cholesterol", RangeStatus::High, "Hypercholesterolemia"),
        lab_rule("ldl cholesterol|ldl", RangeStatus::High, "Cardiovascular Disease Risk"),
        lab_rule("sgpt|alt|sgot|ast|bilirubin", RangeStatus::High, "Liver Disease"),
        lab_rule("creatinine|bun|urea", RangeStatus::High, "Kidney Disease"),
        lab_rule("egfr", RangeStatus::Low, "Kidney Disease"),
        lab_rule("tsh", RangeStatus::High, "Hypothyroidism"),
        lab_rule("tsh", RangeStatus::Low, "Hyperthyroidism"),
        lab_rule("vitamin d", RangeStatus::Low, "Vitamin D Deficiency"),
    ]
});

/// Sorted, deduplicated diseases implied by out-of-range tests.
pub fn suggest_diseases(abnormal: &[AbnormalTest]) -> Vec<String> {
    let suggested: BTreeSet<&str> = abnormal
        .iter()
        .flat_map(|test| {
            LAB_RULES
                .iter()
                .filter(move |rule| rule.status == test.status && rule.test.is_match(&test.test_name))
                .map(|rule| rule.disease)
        })
        .collect();
    suggested.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// [2] Specialist prediction
// ---------------------------------------------------------------------------

/// First specialist rule whose keyword occurs in the text, in table order.
pub fn predict_specialist(text: &str, vocabulary: &VocabularyStore) -> String {
    let lower = text.to_lowercase();
    vocabulary
        .specialist_rules()
        .iter()
        .find(|rule| rule.regex.is_match(&lower))
        .map(|rule| {
            tracing::debug!(keyword = %rule.keyword, specialist = %rule.specialist, "Specialist rule matched");
            rule.specialist.clone()
        })
        .unwrap_or_else(|| DEFAULT_SPECIALIST.to_string())
}

// ---------------------------------------------------------------------------
// [3] ICD-10 coding
// ---------------------------------------------------------------------------

/// One coded diagnosis per affirmed mention, then per lab-suggested disease
/// not already mentioned. Codes are `None` when the table has no entry.
pub fn code_diagnoses(
    mentions: &[DiseaseMention],
    suggested: &[String],
    vocabulary: &VocabularyStore,
) -> Vec<CodedDiagnosis> {
    let mut seen = BTreeSet::new();
    let mut coded = Vec::new();

    let affirmed = mentions
        .iter()
        .filter(|m| !m.negated)
        .map(|m| (m.canonical.as_str(), m.section.clone()));
    let inferred = suggested.iter().map(|d| (d.as_str(), None));

    for (disease, section) in affirmed.chain(inferred) {
        if !seen.insert((disease.to_lowercase(), section.clone())) {
            continue;
        }
        coded.push(CodedDiagnosis {
            disease: disease.to_string(),
            icd10: vocabulary.icd10_code(disease).map(str::to_string),
            section,
        });
    }
    coded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservedValue;

    fn store() -> VocabularyStore {
        VocabularyStore::embedded().unwrap()
    }

    fn abnormal(test_name: &str, status: RangeStatus) -> AbnormalTest {
        AbnormalTest {
            test_name: test_name.into(),
            value: ObservedValue::Scalar(1.0),
            unit: String::new(),
            status,
        }
    }

    fn mention(canonical: &str, negated: bool, section: Option<&str>) -> DiseaseMention {
        DiseaseMention {
            text: canonical.to_lowercase(),
            canonical: canonical.into(),
            negated,
            uncertain: false,
            historical: false,
            section: section.map(str::to_string),
        }
    }

    #[test]
    fn lab_rules_map_status_to_disease() {
        let tests = vec![
            abnormal("Glucose", RangeStatus::High),
            abnormal("TSH", RangeStatus::Low),
            abnormal("Hemoglobin", RangeStatus::Low),
            abnormal("eGFR", RangeStatus::Low),
        ];
        assert_eq!(
            suggest_diseases(&tests),
            vec!["Anemia", "Diabetes", "Hyperthyroidism", "Kidney Disease"]
        );
    }

    #[test]
    fn lab_rules_respect_direction() {
        assert_eq!(suggest_diseases(&[abnormal("Glucose", RangeStatus::Low)]), vec!["Hypoglycemia"]);
        assert_eq!(suggest_diseases(&[abnormal("TSH", RangeStatus::High)]), vec!["Hypothyroidism"]);
        assert!(suggest_diseases(&[abnormal("eGFR", RangeStatus::High)]).is_empty());
        assert!(suggest_diseases(&[abnormal("HDL Cholesterol", RangeStatus::Low)]).is_empty());
    }

    #[test]
    fn lab_rules_match_whole_words() {
        assert_eq!(
            suggest_diseases(&[abnormal("SGPT (ALT)", RangeStatus::High)]),
            vec!["Liver Disease"]
        );
        assert!(suggest_diseases(&[abnormal("Basophils", RangeStatus::High)]).is_empty());
    }

    #[test]
    fn repeated_suggestions_are_deduplicated() {
        let tests = vec![
            abnormal("Serum Creatinine", RangeStatus::High),
            abnormal("Urea", RangeStatus::High),
        ];
        assert_eq!(suggest_diseases(&tests), vec!["Kidney Disease"]);
    }

    #[test]
    fn first_specialist_rule_wins() {
        let store = store();
        assert_eq!(
            predict_specialist("Right breast lesion with hypertension", &store),
            "Oncologist"
        );
        assert_eq!(predict_specialist("Known case of ASTHMA", &store), "Pulmonologist");
    }

    #[test]
    fn specialist_defaults_to_general_physician() {
        let store = store();
        assert_eq!(predict_specialist("", &store), "General Physician");
        assert_eq!(predict_specialist("Routine checkup", &store), "General Physician");
    }

    #[test]
    fn specialist_keywords_start_at_a_word() {
        let store = store();
        assert_eq!(predict_specialist("heartburn after meals", &store), "Gastroenterologist");
        assert_eq!(predict_specialist("sweetheart", &store), "General Physician");
    }

    #[test]
    fn plural_and_derived_keywords_pick_their_specialist() {
        let store = store();
        assert_eq!(
            predict_specialist("Multiple hypoechoic lesions noted in liver", &store),
            "Radiologist"
        );
        assert_eq!(predict_specialist("Two tumours seen", &store), "Oncologist");
        assert_eq!(
            predict_specialist("Cancerous growth in colonic wall", &store),
            "Oncologist"
        );
        assert_eq!(predict_specialist("Colonoscopy advised", &store), "Gastroenterologist");
    }

    #[test]
    fn coding_skips_negated_mentions() {
        let mentions = vec![
            mention("Hypertension", false, Some("diagnosis")),
            mention("Pneumonia", true, None),
            mention("Quixotic Syndrome", false, None),
        ];
        let coded = code_diagnoses(&mentions, &["Diabetes".to_string()], &store());
        let diseases: Vec<_> = coded.iter().map(|c| c.disease.as_str()).collect();
        assert_eq!(diseases, vec!["Hypertension", "Quixotic Syndrome", "Diabetes"]);
        assert_eq!(coded[0].icd10.as_deref(), Some("I10"));
        assert_eq!(coded[0].section.as_deref(), Some("diagnosis"));
        assert!(coded[1].icd10.is_none());
    }

    #[test]
    fn suggested_disease_already_mentioned_is_not_repeated() {
        let mentions = vec![mention("Diabetes", false, None)];
        let coded = code_diagnoses(&mentions, &["Diabetes".to_string()], &store());
        assert_eq!(coded.len(), 1);
    }
}
