use thiserror::Error;

use crate::vocabulary::VocabularyError;

/// Engine construction failures. Analysis itself never fails; it degrades.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),
}
