use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::enums::{Gender, RangeStatus};
use crate::models::{AbnormalTest, EvaluatedObservation, Observation, RangeEvaluation};
use crate::pipeline::extraction::MeasurementSet;
use crate::vocabulary::VocabularyStore;

use super::units::to_range_unit;

/// Every observation of a report checked against its reference range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementEvaluation {
    pub measurements: BTreeMap<String, Vec<EvaluatedObservation>>,
    /// Out-of-range readings in extraction order.
    pub abnormal: Vec<AbnormalTest>,
    /// Observation count across all tests.
    pub total_tests: usize,
}

/// Classifies readings as Low / Normal / High against the vocabulary ranges.
/// Bounds are inclusive; unknown tests are `Unknown` and never abnormal.
#[derive(Debug, Clone)]
pub struct RangeEvaluator {
    vocabulary: Arc<VocabularyStore>,
}

impl RangeEvaluator {
    pub fn new(vocabulary: Arc<VocabularyStore>) -> Self {
        Self { vocabulary }
    }

    /// A bare value, taken to be in the range's own unit.
    pub fn evaluate(&self, test_name: &str, value: f64, gender: Option<Gender>) -> RangeEvaluation {
        self.evaluate_in_unit(test_name, value, "", gender)
    }

    /// Readings in another unit are converted first; irreconcilable units are `Unknown`.
    pub fn evaluate_in_unit(
        &self,
        test_name: &str,
        value: f64,
        observed_unit: &str,
        gender: Option<Gender>,
    ) -> RangeEvaluation {
        let Some(range) = self.vocabulary.reference_range(test_name) else {
            return RangeEvaluation::unknown();
        };
        let Some(value) = to_range_unit(&range.test_name, value, observed_unit, &range.unit)
            .filter(|v| v.is_finite())
        else {
            tracing::debug!(
                test = %range.test_name,
                observed_unit,
                range_unit = %range.unit,
                "Reading unit does not match reference range"
            );
            return RangeEvaluation::unknown();
        };

        let bounds = range.resolve(gender);
        let unit = range.unit.as_str();
        let normal_range = format!("{}-{} {}", bounds.min, bounds.max, unit)
            .trim()
            .to_string();

        let (status, delta) = if value < bounds.min {
            (RangeStatus::Low, format!("↓ {:.1} {}", bounds.min - value, unit))
        } else if value > bounds.max {
            (RangeStatus::High, format!("↑ {:.1} {}", value - bounds.max, unit))
        } else {
            (RangeStatus::Normal, "→ Stable".to_string())
        };

        RangeEvaluation {
            status,
            normal_range,
            delta: delta.trim().to_string(),
            is_abnormal: status.is_abnormal(),
            deficiency: range.higher_is_better && status == RangeStatus::Low,
        }
    }

    /// Composite readings (blood pressure) have no scalar range and stay `Unknown`.
    pub fn evaluate_observation(
        &self,
        test_name: &str,
        observation: &Observation,
        gender: Option<Gender>,
    ) -> RangeEvaluation {
        match observation.value.as_scalar() {
            Some(value) => self.evaluate_in_unit(test_name, value, &observation.unit, gender),
            None => RangeEvaluation::unknown(),
        }
    }

    pub fn evaluate_all(&self, set: MeasurementSet, gender: Option<Gender>) -> MeasurementEvaluation {
        let mut result = MeasurementEvaluation::default();

        for (name, observations) in set.into_entries() {
            let mut evaluated = Vec::with_capacity(observations.len());
            for observation in observations {
                let evaluation = self.evaluate_observation(&name, &observation, gender);
                if evaluation.is_abnormal {
                    result.abnormal.push(AbnormalTest {
                        test_name: name.clone(),
                        value: observation.value,
                        unit: observation.unit.clone(),
                        status: evaluation.status,
                    });
                }
                evaluated.push(EvaluatedObservation::new(observation, evaluation));
            }
            result.total_tests += evaluated.len();
            if !evaluated.is_empty() {
                result.measurements.insert(name, evaluated);
            }
        }

        tracing::debug!(
            tests = result.total_tests,
            abnormal = result.abnormal.len(),
            "Measurements evaluated"
        );
        result
    }
}
