pub mod config;
pub mod intelligence;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod vocabulary;

use tracing_subscriber::EnvFilter;

pub use config::EngineConfig;
pub use intelligence::{AnalysisEngine, AnalysisError};
pub use models::AnalysisResult;
pub use pipeline::extraction::{EntityRecognizer, OcrTextSource};
pub use service::{validate_report_content, ReportAnalysis, ReportService, ServiceError};
pub use vocabulary::{VocabularyError, VocabularyStore};

/// Install the fmt subscriber. Reads `RUST_LOG`, else the crate default filter.
/// A subscriber installed earlier by the host application is left in place.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
