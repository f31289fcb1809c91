//! Versioned clinical vocabularies: reference ranges, diseases, medications,
//! specialist rules, ICD-10 codes, condition advice, and drug interactions.
//!
//! Tables ship embedded in the binary and can be overridden from a directory
//! holding files with the same names.

pub mod store;
pub mod types;

pub use store::{CompiledSpecialistRule, TableVersions, VocabularyStore};
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("Vocabulary load failed ({0}): {1}")]
    Load(String, String),

    #[error("Vocabulary parse failed ({0}): {1}")]
    Parse(String, String),

    #[error("Invalid reference range for {test}: min {min} > max {max}")]
    InvalidRange { test: String, min: f64, max: f64 },

    #[error("Gender-specific flag disagrees with sub-ranges for {0}")]
    InconsistentRange(String),

    #[error("Invalid specialist pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid enum value for {field}: {value}")]
    UnknownEnum { field: String, value: String },
}
