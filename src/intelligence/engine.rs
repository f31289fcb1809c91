use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{EngineConfig, DEFAULT_SPECIALIST};
use crate::models::enums::{Gender, PipelineStage};
use crate::models::{AnalysisResult, DiseaseMention, ExtractionIssue, ReportHeader};
use crate::pipeline::extraction::{
    extract_diseases, extract_findings, extract_header, extract_measurements,
    extract_medications, extract_recommendations, DiseaseNormalizer, EntityRecognizer,
    ExtractionError, MeasurementExtraction, MedicationNormalizer, RecognizedEntity,
};
use crate::pipeline::normalizer::TextNormalizer;
use crate::vocabulary::VocabularyStore;

use super::inference::{code_diagnoses, predict_specialist, suggest_diseases};
use super::interactions::{check_interactions, interaction_names};
use super::ranges::{MeasurementEvaluation, RangeEvaluator};
use super::synthesis::{condition_advice, enhanced_summary, priority_recommendations, SynthesisInput};
use super::types::AnalysisError;

/// Runs the whole report pipeline over one text.
/// Constructed once and shared by handle; holds no per-report state besides
/// the normalization caches.
pub struct AnalysisEngine {
    vocabulary: Arc<VocabularyStore>,
    text_normalizer: TextNormalizer,
    diseases: DiseaseNormalizer,
    medications: MedicationNormalizer,
    evaluator: RangeEvaluator,
    recognizer: Option<Box<dyn EntityRecognizer + Send + Sync>>,
}

impl AnalysisEngine {
    pub fn new(vocabulary: Arc<VocabularyStore>, config: &EngineConfig) -> Self {
        let thresholds = config.thresholds;
        Self {
            text_normalizer: TextNormalizer::new(thresholds.ocr_terms),
            diseases: DiseaseNormalizer::new(vocabulary.clone(), thresholds.disease),
            medications: MedicationNormalizer::new(vocabulary.clone(), thresholds.medication),
            evaluator: RangeEvaluator::new(vocabulary.clone()),
            vocabulary,
            recognizer: None,
        }
    }

    /// Load the vocabulary named by `config` (embedded tables when no directory is set).
    pub fn from_config(config: &EngineConfig) -> Result<Self, AnalysisError> {
        let vocabulary = match &config.vocabulary_dir {
            Some(dir) => VocabularyStore::load(dir)?,
            None => VocabularyStore::embedded()?,
        };
        let versions = vocabulary.versions();
        tracing::info!(
            ranges = %versions.reference_ranges,
            diseases = %versions.diseases,
            medications = %versions.medications,
            "Vocabulary loaded"
        );
        Ok(Self::new(Arc::new(vocabulary), config))
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn EntityRecognizer + Send + Sync>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn vocabulary(&self) -> &VocabularyStore {
        &self.vocabulary
    }

    pub fn text_normalizer(&self) -> &TextNormalizer {
        &self.text_normalizer
    }

    /// Analyze one report. Never fails: data-quality problems degrade to
    /// partial output recorded in `diagnostics`.
    pub fn analyze(&self, text: &str, gender: Option<&str>) -> AnalysisResult {
        let start = Instant::now();
        if text.trim().is_empty() {
            tracing::debug!("Empty report text, returning empty analysis");
            return empty_result();
        }
        tracing::info!(text_len = text.len(), "Starting report analysis");

        let text = self.text_normalizer.normalize(text);
        let mut diagnostics = Vec::new();
        let recognized = self.recognize(&text, &mut diagnostics);

        let mut measurements = MeasurementExtraction::default();
        let mut mentions: Vec<DiseaseMention> = Vec::new();
        let mut medications = Vec::new();
        let mut findings = String::new();
        let mut recommendations = Vec::new();
        let mut specialization = String::new();
        let mut header = ReportHeader::default();

        rayon::scope(|s| {
            s.spawn(|_| measurements = extract_measurements(&text, &self.vocabulary));
            s.spawn(|_| mentions = extract_diseases(&text, &self.diseases, &recognized));
            s.spawn(|_| medications = extract_medications(&text, &self.medications, &recognized));
            s.spawn(|_| {
                findings = extract_findings(&text);
                recommendations = extract_recommendations(&text);
            });
            s.spawn(|_| {
                specialization = predict_specialist(&text, &self.vocabulary);
                header = extract_header(&text);
            });
        });

        let gender = gender
            .and_then(Gender::parse_lenient)
            .or_else(|| Gender::parse_lenient(&header.gender));

        let MeasurementExtraction {
            measurements,
            issues,
        } = measurements;
        diagnostics.extend(issues);
        let MeasurementEvaluation {
            measurements,
            abnormal,
            total_tests,
        } = self.evaluator.evaluate_all(measurements, gender);

        let suggested = suggest_diseases(&abnormal);
        let diseases = merge_diseases(&mentions, &suggested);
        let coded_diagnoses = code_diagnoses(&mentions, &suggested, &self.vocabulary);
        let drug_interactions =
            check_interactions(&interaction_names(&medications), &self.vocabulary);

        let input = SynthesisInput {
            diseases: &diseases,
            medications: &medications,
            abnormal: &abnormal,
            total_tests,
            recommendations: &recommendations,
        };
        let enhanced_summary = enhanced_summary(&input);
        let priority_recommendations = priority_recommendations(&input);
        let condition_advice = condition_advice(&diseases, &self.vocabulary);

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            tests = total_tests,
            abnormal = abnormal.len(),
            diseases = diseases.len(),
            medications = medications.len(),
            issues = diagnostics.len(),
            "Report analysis complete"
        );

        AnalysisResult {
            header,
            measurements,
            diseases,
            disease_mentions: mentions,
            coded_diagnoses,
            medications,
            specialization,
            findings,
            recommendations,
            enhanced_summary,
            priority_recommendations,
            drug_interactions,
            condition_advice,
            diagnostics,
        }
    }

    fn recognize(
        &self,
        text: &str,
        diagnostics: &mut Vec<ExtractionIssue>,
    ) -> Vec<RecognizedEntity> {
        let Some(recognizer) = &self.recognizer else {
            return Vec::new();
        };
        match recognizer.recognize(text) {
            Ok(entities) => {
                tracing::debug!(entities = entities.len(), "Recognizer returned entities");
                entities
            }
            Err(e) => {
                tracing::warn!(error = %e, "Entity recognizer failed, continuing without it");
                diagnostics.push(ExtractionError::from(e).to_issue(PipelineStage::Recognizer));
                Vec::new()
            }
        }
    }
}

/// Affirmed mentions plus lab-suggested diseases, case-insensitively unique, sorted.
fn merge_diseases(mentions: &[DiseaseMention], suggested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut diseases: Vec<String> = mentions
        .iter()
        .filter(|m| !m.negated)
        .map(|m| &m.canonical)
        .chain(suggested)
        .filter(|name| seen.insert(name.to_lowercase()))
        .cloned()
        .collect();
    diseases.sort();
    diseases
}

fn empty_result() -> AnalysisResult {
    let input = SynthesisInput {
        diseases: &[],
        medications: &[],
        abnormal: &[],
        total_tests: 0,
        recommendations: &[],
    };
    AnalysisResult {
        header: ReportHeader::default(),
        measurements: Default::default(),
        diseases: Vec::new(),
        disease_mentions: Vec::new(),
        coded_diagnoses: Vec::new(),
        medications: Vec::new(),
        specialization: DEFAULT_SPECIALIST.to_string(),
        findings: String::new(),
        recommendations: Vec::new(),
        enhanced_summary: enhanced_summary(&input),
        priority_recommendations: Vec::new(),
        drug_interactions: Vec::new(),
        condition_advice: Vec::new(),
        diagnostics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{EntityCategory, RangeStatus, RiskLevel, Severity};
    use crate::models::ObservedValue;
    use crate::pipeline::extraction::RecognizerError;

    fn engine() -> AnalysisEngine {
        AnalysisEngine::from_config(&EngineConfig::default()).unwrap()
    }

    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn recognize(&self, _text: &str) -> Result<Vec<RecognizedEntity>, RecognizerError> {
            Err(RecognizerError::Unavailable("connection refused".into()))
        }
    }

    struct FixedRecognizer(Vec<RecognizedEntity>);

    impl EntityRecognizer for FixedRecognizer {
        fn recognize(&self, _text: &str) -> Result<Vec<RecognizedEntity>, RecognizerError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalysisEngine>();
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let engine = engine();
        for text in ["", "   \n\t "] {
            let result = engine.analyze(text, None);
            assert!(result.measurements.is_empty());
            assert!(result.diseases.is_empty());
            assert!(result.disease_mentions.is_empty());
            assert!(result.medications.is_empty());
            assert!(result.recommendations.is_empty());
            assert!(result.priority_recommendations.is_empty());
            assert!(result.drug_interactions.is_empty());
            assert!(result.findings.is_empty());
            assert_eq!(result.specialization, "General Physician");
            assert_eq!(result.enhanced_summary.risk_level, RiskLevel::Low);
            assert_eq!(result.abnormal_count(), 0);
        }
    }

    #[test]
    fn low_hemoglobin_is_flagged() {
        let result = engine().analyze("Hemoglobin: 10.5 g/dL", None);
        let readings = &result.measurements["Hemoglobin"];
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, ObservedValue::Scalar(10.5));
        assert_eq!(readings[0].unit, "g/dL");
        assert_eq!(readings[0].status, RangeStatus::Low);
        assert!(readings[0].is_abnormal);
        assert_eq!(result.abnormal_count(), 1);
        assert!(result.diseases.contains(&"Anemia".to_string()));
    }

    #[test]
    fn readings_in_alternate_units_are_not_misflagged() {
        let result = engine().analyze("Platelet Count: 2.5 lakhs/cumm\nGlucose: 5.5 mmol/L", None);

        let platelets = &result.measurements["Platelet Count"][0];
        assert_eq!(platelets.status, RangeStatus::Normal);
        assert_eq!(platelets.normal_range, "1.5-4.5 lakh/cumm");

        let glucose = &result.measurements["Glucose"][0];
        assert_eq!(glucose.value, ObservedValue::Scalar(5.5));
        assert_eq!(glucose.unit, "mmol/L");
        assert_eq!(glucose.status, RangeStatus::Normal);

        assert_eq!(result.abnormal_count(), 0);
        assert!(!result.diseases.contains(&"Hypoglycemia".to_string()));
    }

    #[test]
    fn caller_gender_selects_range() {
        let engine = engine();
        let female = engine.analyze("Hemoglobin: 13.0 g/dL", Some("female"));
        assert_eq!(female.measurements["Hemoglobin"][0].status, RangeStatus::Normal);
        let male = engine.analyze("Hemoglobin: 13.0 g/dL", Some("M"));
        assert_eq!(male.measurements["Hemoglobin"][0].status, RangeStatus::Low);
    }

    #[test]
    fn header_gender_is_used_when_caller_gives_none() {
        let result = engine().analyze("Mrs. Lata Devi 62/F\nHemoglobin: 13.0 g/dL", None);
        assert_eq!(result.header.gender, "female");
        assert_eq!(result.measurements["Hemoglobin"][0].status, RangeStatus::Normal);
    }

    #[test]
    fn full_report_flows_through_every_stage() {
        let text = "Patient Name: Ravi Kumar    Age: 45 Years\n\
                    Sex: Male\n\
                    Hemoglobin: 10.5 g/dL\n\
                    Glucose: 250 mg/dL\n\
                    \n\
                    Diagnosis: Type 2 Diabetes with hypertension. No pneumonia.\n\
                    \n\
                    Medications: Warfarin 5 mg daily, Ibuprofen 400 mg as needed\n\
                    \n\
                    IMPRESSION: Poorly controlled diabetes with anemia.\n";
        let result = engine().analyze(text, None);

        assert_eq!(result.header.patient_name, "Ravi Kumar");
        assert_eq!(result.measurements["Glucose"][0].status, RangeStatus::High);
        assert!(result.diseases.contains(&"Type 2 Diabetes".to_string()));
        assert!(result.diseases.contains(&"Hypertension".to_string()));
        assert!(result.diseases.contains(&"Diabetes".to_string()));
        assert!(!result.diseases.iter().any(|d| d == "Pneumonia"));
        assert!(result
            .disease_mentions
            .iter()
            .any(|m| m.canonical == "Pneumonia" && m.negated));
        assert!(result.diseases.windows(2).all(|w| w[0] <= w[1]));

        let canonical: Vec<_> = result.medications.iter().map(|m| m.canonical.as_str()).collect();
        assert!(canonical.contains(&"Warfarin"));
        assert!(canonical.contains(&"Ibuprofen"));
        assert!(result
            .drug_interactions
            .iter()
            .any(|w| w.severity == Severity::High));

        assert!(result.findings.starts_with("Poorly controlled diabetes"));
        assert!(result.enhanced_summary.abnormal_count >= 2);
        assert!(result
            .priority_recommendations
            .windows(2)
            .all(|w| w[0].priority <= w[1].priority));
        assert_eq!(result.condition_advice.len(), result.diseases.len());
        assert!(result
            .coded_diagnoses
            .iter()
            .any(|c| c.disease == "Hypertension" && c.icd10.as_deref() == Some("I10")));
    }

    #[test]
    fn recognizer_failure_is_a_diagnostic() {
        let engine = engine().with_recognizer(Box::new(FailingRecognizer));
        let result = engine.analyze("Hemoglobin: 10.5 g/dL with known hypertension", None);
        assert_eq!(result.measurements.len(), 1);
        assert!(result.diseases.contains(&"Hypertension".to_string()));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].stage, PipelineStage::Recognizer);
        assert!(result.diagnostics[0].detail.contains("connection refused"));
    }

    #[test]
    fn recognizer_spans_are_normalized() {
        let engine = engine().with_recognizer(Box::new(FixedRecognizer(vec![RecognizedEntity {
            text: "sickle cell disease".into(),
            category: EntityCategory::Condition,
        }])));
        let result = engine.analyze("Patient with sickle cell disease on follow-up", None);
        assert_eq!(
            result.diseases.iter().filter(|d| d.as_str() == "Sickle Cell Disease").count(),
            1
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn missing_vocabulary_dir_fails_construction() {
        let config = EngineConfig {
            vocabulary_dir: Some("/nonexistent/medlens/vocabulary".into()),
            ..EngineConfig::default()
        };
        assert!(matches!(
            AnalysisEngine::from_config(&config),
            Err(AnalysisError::Vocabulary(_))
        ));
    }

    #[test]
    fn merge_is_case_insensitive_and_sorted() {
        let mention = |canonical: &str, negated| DiseaseMention {
            text: canonical.to_lowercase(),
            canonical: canonical.into(),
            negated,
            uncertain: false,
            historical: false,
            section: None,
        };
        let merged = merge_diseases(
            &[mention("Diabetes", false), mention("Asthma", true)],
            &["diabetes".to_string(), "Anemia".to_string()],
        );
        assert_eq!(merged, vec!["Anemia", "Diabetes"]);
    }
}
