//! Concurrent upload of input images with a wait-for-ready poll per file.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::sleep;

use crate::models::file::{FileState, RemoteFile, RemoteHandle};
use crate::services::backend::FileStore;
use crate::services::gemini::GeminiError;
use crate::services::scanner::InputImage;

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Uploads in flight at once
    pub concurrency: usize,
    /// Sleep between readiness polls
    pub poll_interval: Duration,
    /// Give up on a file still processing after this many polls
    pub max_polls: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            concurrency: 10,
            poll_interval: Duration::from_secs(1),
            max_polls: 300,
        }
    }
}

/// Result of uploading one input. Failures are values, not early returns,
/// so one bad file never cancels its siblings.
#[derive(Debug)]
pub struct UploadOutcome {
    pub input: InputImage,
    pub result: Result<RemoteHandle, UploadError>,
}

/// Upload every input with at most `policy.concurrency` in flight. Outcomes
/// are returned in completion order.
pub async fn upload_all<B: FileStore>(
    backend: &B,
    inputs: Vec<InputImage>,
    policy: &UploadPolicy,
) -> Vec<UploadOutcome> {
    let total = inputs.len();
    let mut outcomes = Vec::with_capacity(total);

    let mut uploads = stream::iter(inputs)
        .map(|input| async move {
            let result = upload_one(backend, &input, policy).await;
            UploadOutcome { input, result }
        })
        .buffer_unordered(policy.concurrency.max(1));

    while let Some(outcome) = uploads.next().await {
        let done = outcomes.len() + 1;
        match &outcome.result {
            Ok(_) => tracing::info!(progress = %format!("{done}/{total}"), key = %outcome.input.key, "Ready"),
            Err(e) => tracing::warn!(
                progress = %format!("{done}/{total}"),
                key = %outcome.input.key,
                error = %e,
                "Upload failed"
            ),
        }
        outcomes.push(outcome);
    }

    outcomes
}

async fn upload_one<B: FileStore>(
    backend: &B,
    input: &InputImage,
    policy: &UploadPolicy,
) -> Result<RemoteHandle, UploadError> {
    let file = backend.upload_file(&input.path, input.mime_type()).await?;
    let file = wait_until_ready(backend, file, policy).await?;

    file.handle().ok_or(UploadError::MissingUri)
}

/// Poll a freshly uploaded file until it leaves `PROCESSING`.
pub async fn wait_until_ready<B: FileStore>(
    backend: &B,
    mut file: RemoteFile,
    policy: &UploadPolicy,
) -> Result<RemoteFile, UploadError> {
    let mut polls = 0u32;

    while file.state == FileState::Processing {
        if polls >= policy.max_polls {
            return Err(UploadError::StillProcessing { polls });
        }
        sleep(policy.poll_interval).await;
        file = backend.get_file(&file.name).await?;
        polls += 1;
    }

    match file.state {
        FileState::Active => Ok(file),
        other => Err(UploadError::FailedState(other.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload request failed: {0}")]
    Remote(#[from] GeminiError),

    #[error("Failed state: {0}")]
    FailedState(String),

    #[error("Still processing after {polls} polls")]
    StillProcessing { polls: u32 },

    #[error("Active file has no URI")]
    MissingUri,
}
