use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::{EntityCategory, PipelineStage};
use crate::models::ExtractionIssue;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unparsable value '{raw}' for {test}")]
    UnparsableNumber { test: String, raw: String },

    #[error("Entity recognizer failed: {0}")]
    Recognizer(#[from] RecognizerError),
}

impl ExtractionError {
    /// Diagnostic record for a failure that was degraded around.
    pub fn to_issue(&self, stage: PipelineStage) -> ExtractionIssue {
        ExtractionIssue {
            stage,
            detail: self.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("Recognizer unavailable: {0}")]
    Unavailable(String),

    #[error("Recognizer returned malformed output: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("OCR processing failed: {0}")]
    Processing(String),
}

/// A typed span from an upstream clinical-entity recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedEntity {
    pub text: String,
    pub category: EntityCategory,
}

/// Upstream structured clinical-entity recognizer (allows mocking for tests).
pub trait EntityRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<RecognizedEntity>, RecognizerError>;
}

/// Producer of report text from an uploaded file.
pub trait OcrTextSource {
    fn extract_text(&self, path: &Path) -> Result<String, OcrError>;
}
