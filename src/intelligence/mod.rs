pub mod engine;
pub mod inference;
pub mod interactions;
pub mod ranges;
pub mod synthesis;
pub mod types;
mod units;

pub use engine::AnalysisEngine;
pub use inference::{code_diagnoses, predict_specialist, suggest_diseases};
pub use interactions::{check_interactions, interaction_names};
pub use ranges::{MeasurementEvaluation, RangeEvaluator};
pub use synthesis::{assess_risk, condition_advice, enhanced_summary, priority_recommendations, SynthesisInput};
pub use types::AnalysisError;
