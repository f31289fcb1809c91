//! Risk level, prose summary, and priority-ordered recommendation cards.

use crate::models::enums::{RiskLevel, Urgency};
use crate::models::{
    AbnormalTest, ConditionAdvice, EnhancedSummary, MedicationMention, PriorityRecommendation,
};
use crate::vocabulary::VocabularyStore;

/// Conditions that raise the risk level to high and produce the urgent card.
const CRITICAL_KEYWORDS: &[&str] = &[
    "cancer",
    "carcinoma",
    "tumor",
    "malignancy",
    "heart attack",
    "myocardial infarction",
    "stroke",
    "sepsis",
    "tuberculosis",
];

const CHRONIC_KEYWORDS: &[&str] = &[
    "diabetes",
    "hypertension",
    "asthma",
    "copd",
    "ckd",
    "chronic kidney disease",
    "heart failure",
    "hypothyroidism",
];

const MULTIPLE_ABNORMAL_THRESHOLD: usize = 5;
const MEDICATION_REVIEW_THRESHOLD: usize = 3;
const MEDIUM_RISK_DISEASES: usize = 3;
const MEDIUM_RISK_MEDICATIONS: usize = 5;
const MAX_LISTED_NAMES: usize = 3;
const MAX_FREE_TEXT_CARDS: usize = 3;

const FALLBACK_ADVICE: &str = "Consult a specialist for personalized guidance.";

/// Everything the synthesizer reads from one analysis.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub diseases: &'a [String],
    pub medications: &'a [MedicationMention],
    pub abnormal: &'a [AbnormalTest],
    pub total_tests: usize,
    pub recommendations: &'a [String],
}

impl SynthesisInput<'_> {
    fn has_keyword(&self, keywords: &[&str]) -> bool {
        self.diseases.iter().any(|disease| {
            let lower = disease.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
    }

    fn has_critical_condition(&self) -> bool {
        self.has_keyword(CRITICAL_KEYWORDS)
    }

    /// Distinct abnormal test names in extraction order.
    fn abnormal_test_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for test in self.abnormal {
            if !names.contains(&test.test_name.as_str()) {
                names.push(&test.test_name);
            }
        }
        names
    }
}

pub fn assess_risk(input: &SynthesisInput<'_>) -> RiskLevel {
    let abnormal = input.abnormal.len();
    if input.has_critical_condition() {
        RiskLevel::High
    } else if abnormal > MULTIPLE_ABNORMAL_THRESHOLD
        || input.diseases.len() > MEDIUM_RISK_DISEASES
        || input.medications.len() > MEDIUM_RISK_MEDICATIONS
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn card(
    priority: u8,
    title: &str,
    description: String,
    action: &str,
    category: &str,
    urgency: Urgency,
) -> PriorityRecommendation {
    PriorityRecommendation {
        priority,
        title: title.to_string(),
        description,
        action: action.to_string(),
        category: category.to_string(),
        urgency,
    }
}

/// Cards in ascending priority; at most one of each kind except free-text advice.
pub fn priority_recommendations(input: &SynthesisInput<'_>) -> Vec<PriorityRecommendation> {
    let mut cards = Vec::new();
    let abnormal = input.abnormal.len();

    if input.has_critical_condition() {
        cards.push(card(
            1,
            "Seek Immediate Medical Attention",
            "Critical condition detected. Consult a specialist urgently.".to_string(),
            "Visit emergency department or contact specialist immediately",
            "Critical Condition",
            Urgency::High,
        ));
    }

    if abnormal > MULTIPLE_ABNORMAL_THRESHOLD {
        cards.push(card(
            2,
            "Multiple Abnormal Lab Values",
            format!(
                "{abnormal} test results are outside normal range. Comprehensive evaluation recommended."
            ),
            "Schedule appointment with primary care physician for complete assessment",
            "Lab Results",
            Urgency::High,
        ));
    }

    if abnormal > 0 {
        let names = input.abnormal_test_names();
        let listed = names[..names.len().min(MAX_LISTED_NAMES)].join(", ");
        cards.push(card(
            3,
            "Abnormal Lab Values Detected",
            format!("Following tests are outside normal range: {listed}"),
            "Consult with your doctor to discuss these results and next steps",
            "Lab Results",
            Urgency::Medium,
        ));
    }

    if input.medications.len() > MEDICATION_REVIEW_THRESHOLD {
        cards.push(card(
            4,
            "Medication Review Recommended",
            "You are taking multiple medications. Review with healthcare provider.".to_string(),
            "Schedule medication review with pharmacist or doctor",
            "Medication Management",
            Urgency::Medium,
        ));
    }

    if input.has_keyword(CHRONIC_KEYWORDS) {
        cards.push(card(
            5,
            "Chronic Disease Management",
            "Regular monitoring and follow-ups are important for chronic conditions.".to_string(),
            "Schedule regular follow-up appointments with your specialist",
            "Chronic Disease Management",
            Urgency::Medium,
        ));
    }

    for (priority, text) in (6u8..).zip(input.recommendations.iter().take(MAX_FREE_TEXT_CARDS)) {
        cards.push(card(
            priority,
            "General Health Recommendation",
            text.clone(),
            "Follow general health guidelines and lifestyle modifications",
            "General Care",
            Urgency::Low,
        ));
    }

    cards
}

fn listed(names: &[&str]) -> String {
    names[..names.len().min(MAX_LISTED_NAMES)].join(", ")
}

pub fn enhanced_summary(input: &SynthesisInput<'_>) -> EnhancedSummary {
    let abnormal_count = input.abnormal.len();
    let mut highlights = Vec::new();
    let mut parts = Vec::new();

    if !input.diseases.is_empty() {
        let names: Vec<&str> = input.diseases.iter().map(String::as_str).collect();
        let line = format!(
            "Detected {} medical condition(s): {}",
            input.diseases.len(),
            listed(&names)
        );
        highlights.push(line.clone());
        parts.push(line);
    }

    if !input.medications.is_empty() {
        let names: Vec<&str> = input.medications.iter().map(|m| m.canonical.as_str()).collect();
        let line = format!(
            "Identified {} medication(s): {}",
            input.medications.len(),
            listed(&names)
        );
        highlights.push(line.clone());
        parts.push(line);
    }

    if input.total_tests > 0 {
        if abnormal_count > 0 {
            parts.push(format!(
                "Found {abnormal_count} abnormal lab value(s) out of {} tests",
                input.total_tests
            ));
            highlights.push(format!("{abnormal_count} abnormal lab value(s) detected"));
        } else {
            parts.push(format!(
                "All {} lab test(s) are within normal range",
                input.total_tests
            ));
        }
    }

    let summary_text = if parts.is_empty() {
        "Analysis complete.".to_string()
    } else {
        format!("{}.", parts.join(". "))
    };

    EnhancedSummary {
        total_diseases: input.diseases.len(),
        total_medications: input.medications.len(),
        total_measurements: input.total_tests,
        total_recommendations: input.recommendations.len(),
        abnormal_count,
        key_highlights: highlights,
        risk_level: assess_risk(input),
        summary_text,
    }
}

/// Self-care advice per disease; table spellings may use a typographic apostrophe.
pub fn condition_advice(diseases: &[String], vocabulary: &VocabularyStore) -> Vec<ConditionAdvice> {
    diseases
        .iter()
        .map(|disease| {
            let advice = vocabulary
                .advice_for(disease)
                .or_else(|| vocabulary.advice_for(&disease.replace('\'', "\u{2019}")))
                .map(<[String]>::to_vec)
                .unwrap_or_else(|| vec![FALLBACK_ADVICE.to_string()]);
            ConditionAdvice {
                condition: disease.clone(),
                advice,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::RangeStatus;
    use crate::models::ObservedValue;

    fn abnormal(names: &[&str]) -> Vec<AbnormalTest> {
        names
            .iter()
            .map(|n| AbnormalTest {
                test_name: n.to_string(),
                value: ObservedValue::Scalar(1.0),
                unit: String::new(),
                status: RangeStatus::High,
            })
            .collect()
    }

    fn medication(name: &str) -> MedicationMention {
        MedicationMention {
            original_text: name.into(),
            canonical: name.into(),
            generic: name.into(),
            purpose: String::new(),
            dose: String::new(),
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn input<'a>(
        diseases: &'a [String],
        medications: &'a [MedicationMention],
        abnormal: &'a [AbnormalTest],
        recommendations: &'a [String],
    ) -> SynthesisInput<'a> {
        SynthesisInput {
            diseases,
            medications,
            abnormal,
            total_tests: abnormal.len() + 2,
            recommendations,
        }
    }

    #[test]
    fn critical_card_precedes_abnormal_labs() {
        let diseases = strings(&["Breast Cancer"]);
        let labs = abnormal(&["Glucose", "TSH", "Urea", "SGOT (AST)", "Calcium", "Sodium"]);
        let cards = priority_recommendations(&input(&diseases, &[], &labs, &[]));

        let priorities: Vec<u8> = cards.iter().map(|c| c.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert_eq!(cards[0].title, "Seek Immediate Medical Attention");
        assert_eq!(cards[0].urgency, Urgency::High);
        assert_eq!(
            cards[1].description,
            "6 test results are outside normal range. Comprehensive evaluation recommended."
        );
        assert_eq!(
            cards[2].description,
            "Following tests are outside normal range: Glucose, TSH, Urea"
        );
    }

    #[test]
    fn cards_are_sorted_by_priority() {
        let diseases = strings(&["Hypertension"]);
        let meds: Vec<_> = ["a", "b", "c", "d"].iter().map(|n| medication(n)).collect();
        let labs = abnormal(&["Glucose"]);
        let recs = strings(&["Walk daily for thirty minutes", "Reduce salt", "Sleep well", "Drink water"]);
        let cards = priority_recommendations(&input(&diseases, &meds, &labs, &recs));

        let priorities: Vec<u8> = cards.iter().map(|c| c.priority).collect();
        assert_eq!(priorities, vec![3, 4, 5, 6, 7, 8]);
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(cards[3].description, "Walk daily for thirty minutes");
        assert_eq!(cards[5].urgency, Urgency::Low);
    }

    #[test]
    fn nothing_found_means_no_cards() {
        assert!(priority_recommendations(&input(&[], &[], &[], &[])).is_empty());
    }

    #[test]
    fn risk_levels() {
        let critical = strings(&["Stroke"]);
        assert_eq!(assess_risk(&input(&critical, &[], &[], &[])), RiskLevel::High);

        let many = strings(&["Asthma", "Migraine", "Gout", "Acne"]);
        assert_eq!(assess_risk(&input(&many, &[], &[], &[])), RiskLevel::Medium);

        let labs = abnormal(&["A", "B", "C", "D", "E", "F"]);
        assert_eq!(assess_risk(&input(&[], &[], &labs, &[])), RiskLevel::Medium);

        let one = abnormal(&["Glucose"]);
        assert_eq!(assess_risk(&input(&[], &[], &one, &[])), RiskLevel::Low);
        assert_eq!(assess_risk(&input(&[], &[], &[], &[])), RiskLevel::Low);
    }

    #[test]
    fn summary_text_joins_fragments() {
        let diseases = strings(&["Anemia", "Diabetes", "Hypertension", "Migraine"]);
        let meds = vec![medication("Metformin")];
        let labs = abnormal(&["Hemoglobin"]);
        let summary = enhanced_summary(&input(&diseases, &meds, &labs, &[]));

        assert_eq!(
            summary.summary_text,
            "Detected 4 medical condition(s): Anemia, Diabetes, Hypertension. \
             Identified 1 medication(s): Metformin. \
             Found 1 abnormal lab value(s) out of 3 tests."
        );
        assert_eq!(summary.total_diseases, 4);
        assert_eq!(summary.total_measurements, 3);
        assert_eq!(summary.abnormal_count, 1);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_measurements"], 3);
        assert!(json.get("total_tests").is_none());
        assert_eq!(summary.key_highlights.len(), 3);
        assert_eq!(summary.key_highlights[2], "1 abnormal lab value(s) detected");
        assert_eq!(summary.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn summary_for_normal_labs_and_empty_report() {
        let normal = SynthesisInput {
            diseases: &[],
            medications: &[],
            abnormal: &[],
            total_tests: 4,
            recommendations: &[],
        };
        assert_eq!(
            enhanced_summary(&normal).summary_text,
            "All 4 lab test(s) are within normal range."
        );

        let empty = SynthesisInput {
            total_tests: 0,
            ..normal
        };
        let summary = enhanced_summary(&empty);
        assert_eq!(summary.summary_text, "Analysis complete.");
        assert!(summary.key_highlights.is_empty());
        assert_eq!(summary.risk_level, RiskLevel::Low);
    }

    #[test]
    fn condition_advice_falls_back() {
        let store = VocabularyStore::embedded().unwrap();
        let advice = condition_advice(&strings(&["Fever", "Crohn's Disease", "Quixotic Syndrome"]), &store);
        assert_eq!(advice.len(), 3);
        assert!(advice[0].advice.len() > 1);
        assert_ne!(advice[1].advice, vec![FALLBACK_ADVICE.to_string()]);
        assert_eq!(advice[2].advice, vec![FALLBACK_ADVICE.to_string()]);
    }
}
