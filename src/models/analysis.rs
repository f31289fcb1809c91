use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::diagnosis::{CodedDiagnosis, DiseaseMention};
use super::enums::{PipelineStage, RiskLevel, Urgency};
use super::lab::EvaluatedObservation;
use super::medication::{InteractionWarning, MedicationMention};

/// Patient/report identification lines found at the top of a report.
/// Fields are empty strings when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub patient_name: String,
    pub age: String,
    pub gender: String,
    pub report_date: String,
    pub doctor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedSummary {
    pub total_diseases: usize,
    pub total_medications: usize,
    pub total_measurements: usize,
    pub total_recommendations: usize,
    pub abnormal_count: usize,
    pub key_highlights: Vec<String>,
    pub risk_level: RiskLevel,
    pub summary_text: String,
}

/// A recommendation card. Lower `priority` sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRecommendation {
    pub priority: u8,
    pub title: String,
    pub description: String,
    pub action: String,
    pub category: String,
    pub urgency: Urgency,
}

/// Self-care guidance attached to a detected condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionAdvice {
    pub condition: String,
    pub advice: Vec<String>,
}

/// A data-quality problem that was degraded around instead of failing the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    pub stage: PipelineStage,
    pub detail: String,
}

/// Everything extracted and inferred from one report.
/// Built once by the engine; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub header: ReportHeader,
    pub measurements: BTreeMap<String, Vec<EvaluatedObservation>>,
    /// Sorted, deduplicated canonical names (mentioned + inferred from labs).
    pub diseases: Vec<String>,
    pub disease_mentions: Vec<DiseaseMention>,
    pub coded_diagnoses: Vec<CodedDiagnosis>,
    pub medications: Vec<MedicationMention>,
    pub specialization: String,
    pub findings: String,
    pub recommendations: Vec<String>,
    pub enhanced_summary: EnhancedSummary,
    pub priority_recommendations: Vec<PriorityRecommendation>,
    pub drug_interactions: Vec<InteractionWarning>,
    pub condition_advice: Vec<ConditionAdvice>,
    pub diagnostics: Vec<ExtractionIssue>,
}

impl AnalysisResult {
    pub fn abnormal_count(&self) -> usize {
        self.enhanced_summary.abnormal_count
    }
}
