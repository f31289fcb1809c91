use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MedLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum fuzzy similarity (0-100) for a noisy term to be replaced by a vocabulary entry.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 85.0;

/// Sanity bounds for values picked up by the generic "Label value unit" scanner.
pub const GENERIC_VALUE_MIN: f64 = 0.0;
pub const GENERIC_VALUE_MAX: f64 = 10_000.0;

/// How far after a medication name a dose fragment may appear.
pub const DOSE_LOOKAHEAD_CHARS: usize = 50;

/// Reports shorter than this (trimmed) are rejected before analysis.
pub const MIN_REPORT_CHARS: usize = 50;

/// Specialist suggested when no keyword rule matches.
pub const DEFAULT_SPECIALIST: &str = "General Physician";

/// Environment variables read by [`EngineConfig::from_env`].
pub const ENV_VOCABULARY_DIR: &str = "MEDLENS_VOCABULARY_DIR";
pub const ENV_DISEASE_THRESHOLD: &str = "MEDLENS_DISEASE_THRESHOLD";
pub const ENV_MEDICATION_THRESHOLD: &str = "MEDLENS_MEDICATION_THRESHOLD";
pub const ENV_OCR_THRESHOLD: &str = "MEDLENS_OCR_THRESHOLD";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medlens_lib=info,warn"
}

/// Fuzzy-match thresholds, one per vocabulary.
/// Tuned independently because OCR-term cleanup tolerates less noise than disease lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub disease: f64,
    pub medication: f64,
    pub ocr_terms: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            disease: DEFAULT_MATCH_THRESHOLD,
            medication: DEFAULT_MATCH_THRESHOLD,
            ocr_terms: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Engine construction settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub thresholds: MatchThresholds,
    /// Directory holding override vocabulary tables. `None` uses the embedded tables.
    pub vocabulary_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Build a config from `MEDLENS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_VOCABULARY_DIR).filter(|d| !d.trim().is_empty()) {
            config.vocabulary_dir = Some(PathBuf::from(dir));
        }

        let thresholds = &mut config.thresholds;
        for (key, slot) in [
            (ENV_DISEASE_THRESHOLD, &mut thresholds.disease),
            (ENV_MEDICATION_THRESHOLD, &mut thresholds.medication),
            (ENV_OCR_THRESHOLD, &mut thresholds.ocr_terms),
        ] {
            let Some(raw) = lookup(key) else { continue };
            match parse_threshold(&raw) {
                Some(value) => *slot = value,
                None => {
                    tracing::warn!(key, value = %raw, "Ignoring invalid match threshold");
                }
            }
        }

        config
    }
}

fn parse_threshold(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=100.0).contains(v))
}
