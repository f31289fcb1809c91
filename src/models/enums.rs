use serde::{Deserialize, Serialize};

use crate::vocabulary::VocabularyError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = VocabularyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(VocabularyError::UnknownEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(RangeStatus {
    Normal => "normal",
    High => "high",
    Low => "low",
    Unknown => "unknown",
});

impl RangeStatus {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::High | Self::Low)
    }
}

str_enum!(Severity {
    Low => "low",
    Moderate => "moderate",
    High => "high",
});

str_enum!(InteractionKind {
    Potential => "potential",
    BleedingRisk => "bleeding_risk",
});

str_enum!(Urgency {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(RiskLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
});

impl Gender {
    /// Lenient parse for caller-supplied gender: `m`/`male`/`f`/`female`, any case.
    /// Anything else means "not supplied".
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "m" | "male" => Some(Self::Male),
            "f" | "female" => Some(Self::Female),
            _ => None,
        }
    }
}

str_enum!(EntityCategory {
    Condition => "condition",
    Medication => "medication",
    TestOrProcedure => "test_or_procedure",
    ProtectedHealthInfo => "protected_health_info",
    TimeExpression => "time_expression",
});

str_enum!(PipelineStage {
    Normalization => "normalization",
    Measurements => "measurements",
    Diseases => "diseases",
    Medications => "medications",
    Sections => "sections",
    Recognizer => "recognizer",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_as_str() {
        for status in [
            RangeStatus::Normal,
            RangeStatus::High,
            RangeStatus::Low,
            RangeStatus::Unknown,
        ] {
            assert_eq!(RangeStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert_eq!(
            InteractionKind::from_str("bleeding_risk").unwrap(),
            InteractionKind::BleedingRisk
        );
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = Severity::from_str("critical").unwrap_err();
        assert!(err.to_string().contains("Severity"));
        assert!(err.to_string().contains("critical"));
    }

    #[test]
    fn serde_matches_as_str() {
        let json = serde_json::to_string(&InteractionKind::BleedingRisk).unwrap();
        assert_eq!(json, "\"bleeding_risk\"");
        let parsed: Urgency = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Urgency::Medium);
    }

    #[test]
    fn gender_parse_accepts_short_and_long_forms() {
        assert_eq!(Gender::parse_lenient("M"), Some(Gender::Male));
        assert_eq!(Gender::parse_lenient(" female "), Some(Gender::Female));
        assert_eq!(Gender::parse_lenient("f"), Some(Gender::Female));
        assert_eq!(Gender::parse_lenient("other"), None);
        assert_eq!(Gender::parse_lenient(""), None);
    }

    #[test]
    fn only_high_and_low_are_abnormal() {
        assert!(RangeStatus::High.is_abnormal());
        assert!(RangeStatus::Low.is_abnormal());
        assert!(!RangeStatus::Normal.is_abnormal());
        assert!(!RangeStatus::Unknown.is_abnormal());
    }
}
