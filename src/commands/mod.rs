//! One handler per CLI subcommand.

pub mod cleanup;
pub mod download;
pub mod status;
pub mod storage;
pub mod submit;

use crate::services::cleanup::CleanupError;
use crate::services::gemini::GeminiError;
use crate::services::retrieval::RetrievalError;
use crate::services::scanner::ScanError;
use crate::services::submitter::SubmitError;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    #[error(transparent)]
    Remote(#[from] GeminiError),

    #[error("Refusing to {0} without --yes")]
    NotConfirmed(String),
}
