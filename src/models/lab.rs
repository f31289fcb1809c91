use serde::{Deserialize, Serialize};

use super::enums::RangeStatus;

/// A numeric reading as it appeared in the report.
/// Blood pressure stays one composite reading rather than two scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservedValue {
    Scalar(f64),
    Pair { systolic: f64, diastolic: f64 },
}

impl ObservedValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Pair { .. } => None,
        }
    }
}

impl std::fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Pair {
                systolic,
                diastolic,
            } => write!(f, "{systolic}/{diastolic}"),
        }
    }
}

/// One `{value, unit}` reading for a named test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub value: ObservedValue,
    pub unit: String,
}

impl Observation {
    pub fn scalar(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value: ObservedValue::Scalar(value),
            unit: unit.into(),
        }
    }
}

/// Outcome of checking one reading against its reference range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeEvaluation {
    pub status: RangeStatus,
    /// `"{min}-{max} {unit}"`, or `"N/A"` when the test has no range.
    pub normal_range: String,
    /// `"↓ 1.5 g/dL"`, `"↑ 30.0 mg/dL"`, `"→ Stable"`, or `"N/A"`.
    pub delta: String,
    pub is_abnormal: bool,
    /// Set for higher-is-better tests that fall below range.
    pub deficiency: bool,
}

impl RangeEvaluation {
    pub fn unknown() -> Self {
        Self {
            status: RangeStatus::Unknown,
            normal_range: "N/A".into(),
            delta: "N/A".into(),
            is_abnormal: false,
            deficiency: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedObservation {
    pub value: ObservedValue,
    pub unit: String,
    pub status: RangeStatus,
    pub normal_range: String,
    pub delta: String,
    pub is_abnormal: bool,
    pub deficiency: bool,
}

impl EvaluatedObservation {
    pub fn new(observation: Observation, evaluation: RangeEvaluation) -> Self {
        Self {
            value: observation.value,
            unit: observation.unit,
            status: evaluation.status,
            normal_range: evaluation.normal_range,
            delta: evaluation.delta,
            is_abnormal: evaluation.is_abnormal,
            deficiency: evaluation.deficiency,
        }
    }
}

/// Flattened view of an out-of-range reading, consumed by inference and synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbnormalTest {
    pub test_name: String,
    pub value: ObservedValue,
    pub unit: String,
    pub status: RangeStatus,
}
