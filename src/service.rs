//! Async entry points: OCR collaborator, report validation, and the response envelope.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MIN_REPORT_CHARS;
use crate::intelligence::AnalysisEngine;
use crate::models::AnalysisResult;
use crate::pipeline::extraction::{OcrError, OcrTextSource};

static REPORT_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)report|patient|diagnosis|findings|test|result")
        .expect("Invalid report keyword regex pattern")
});

static PAGE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("Invalid page break regex pattern"));

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("No OCR source configured")]
    OcrUnavailable,

    #[error("Report text is empty")]
    EmptyText,

    #[error("Report text too short: {length} characters (minimum {minimum})")]
    TooShort { length: usize, minimum: usize },

    #[error("Text does not look like a medical report")]
    NotMedicalReport,

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

/// Reject text that is empty, too short, or carries no report vocabulary at all.
pub fn validate_report_content(text: &str) -> Result<(), ServiceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::EmptyText);
    }
    let length = trimmed.chars().count();
    if length < MIN_REPORT_CHARS {
        return Err(ServiceError::TooShort {
            length,
            minimum: MIN_REPORT_CHARS,
        });
    }
    if !REPORT_KEYWORDS.is_match(trimmed) {
        return Err(ServiceError::NotMedicalReport);
    }
    Ok(())
}

/// Blank-line separated blocks with content.
fn count_pages(text: &str) -> usize {
    PAGE_BREAK
        .split(text)
        .filter(|block| !block.trim().is_empty())
        .count()
}

/// Response envelope for one analyzed report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAnalysis {
    pub report_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub text_length: usize,
    pub pages: usize,
    pub analysis: AnalysisResult,
}

pub struct ReportService {
    engine: Arc<AnalysisEngine>,
    ocr: Option<Arc<dyn OcrTextSource + Send + Sync>>,
}

impl ReportService {
    pub fn new(engine: Arc<AnalysisEngine>) -> Self {
        Self { engine, ocr: None }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrTextSource + Send + Sync>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub async fn analyze_text(
        &self,
        text: String,
        gender: Option<String>,
    ) -> Result<ReportAnalysis, ServiceError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || analyze_validated(&engine, &text, gender.as_deref()))
            .await
            .map_err(|e| ServiceError::TaskFailed(e.to_string()))?
    }

    /// OCR the file, then analyze its text. OCR and analysis both run off the async runtime.
    pub async fn analyze_file(
        &self,
        path: PathBuf,
        gender: Option<String>,
    ) -> Result<ReportAnalysis, ServiceError> {
        let ocr = self.ocr.clone().ok_or(ServiceError::OcrUnavailable)?;
        let engine = self.engine.clone();

        tokio::task::spawn_blocking(move || {
            let text = ocr.extract_text(&path).map_err(|e| {
                tracing::warn!(error = %e, "OCR text extraction failed");
                ServiceError::from(e)
            })?;
            tracing::debug!(text_len = text.len(), "OCR text extracted");
            analyze_validated(&engine, &text, gender.as_deref())
        })
        .await
        .map_err(|e| ServiceError::TaskFailed(e.to_string()))?
    }
}

fn analyze_validated(
    engine: &AnalysisEngine,
    text: &str,
    gender: Option<&str>,
) -> Result<ReportAnalysis, ServiceError> {
    validate_report_content(text)?;
    let report_id = Uuid::new_v4();
    tracing::info!(%report_id, text_len = text.len(), "Analyzing report");

    Ok(ReportAnalysis {
        report_id,
        analyzed_at: Utc::now(),
        text_length: text.len(),
        pages: count_pages(text),
        analysis: engine.analyze(text, gender),
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::EngineConfig;
    use crate::models::enums::RangeStatus;

    const REPORT: &str = "Patient report\n\
                          Hemoglobin: 10.5 g/dL\n\
                          \n\
                          Glucose: 90 mg/dL\n\
                          Advice: follow up with your physician in two weeks.";

    struct FixedOcr(&'static str);

    impl OcrTextSource for FixedOcr {
        fn extract_text(&self, _path: &Path) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenOcr;

    impl OcrTextSource for BrokenOcr {
        fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
            Err(OcrError::UnsupportedFormat(path.display().to_string()))
        }
    }

    fn service() -> ReportService {
        let engine = AnalysisEngine::from_config(&EngineConfig::default()).unwrap();
        ReportService::new(Arc::new(engine))
    }

    #[test]
    fn validation_rules() {
        assert!(matches!(validate_report_content("  \n "), Err(ServiceError::EmptyText)));
        assert!(matches!(
            validate_report_content("Patient ok"),
            Err(ServiceError::TooShort { length: 10, minimum: 50 })
        ));
        assert!(matches!(
            validate_report_content(&"lorem ipsum dolor sit amet ".repeat(3)),
            Err(ServiceError::NotMedicalReport)
        ));
        assert!(validate_report_content(REPORT).is_ok());
    }

    #[test]
    fn pages_are_blank_line_blocks() {
        assert_eq!(count_pages(REPORT), 2);
        assert_eq!(count_pages("one block"), 1);
        assert_eq!(count_pages("\n\n  \n"), 0);
    }

    #[tokio::test]
    async fn analyze_text_wraps_result() {
        let report = service()
            .analyze_text(REPORT.to_string(), Some("male".into()))
            .await
            .unwrap();
        assert_eq!(report.text_length, REPORT.len());
        assert_eq!(report.pages, 2);
        assert_eq!(
            report.analysis.measurements["Hemoglobin"][0].status,
            RangeStatus::Low
        );
        assert_eq!(report.analysis.measurements["Glucose"][0].status, RangeStatus::Normal);
    }

    #[tokio::test]
    async fn analyze_text_rejects_short_input() {
        let err = service().analyze_text("test".into(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::TooShort { .. }));
    }

    #[tokio::test]
    async fn analyze_file_runs_ocr_first() {
        let service = service().with_ocr(Arc::new(FixedOcr(REPORT)));
        let report = service
            .analyze_file(PathBuf::from("scan.pdf"), None)
            .await
            .unwrap();
        assert!(report.analysis.measurements.contains_key("Hemoglobin"));
    }

    #[tokio::test]
    async fn ocr_failure_is_reported() {
        let service = service().with_ocr(Arc::new(BrokenOcr));
        let err = service
            .analyze_file(PathBuf::from("scan.tiff"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ocr(OcrError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn analyze_file_without_ocr_source() {
        let err = service()
            .analyze_file(PathBuf::from("scan.pdf"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::OcrUnavailable));
    }

    #[test]
    fn envelope_serializes() {
        let engine = AnalysisEngine::from_config(&EngineConfig::default()).unwrap();
        let report = analyze_validated(&engine, REPORT, None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["report_id"].is_string());
        assert!(json["analysis"]["measurements"]["Hemoglobin"].is_array());
    }
}
