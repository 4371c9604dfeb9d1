use chrono::{Local, Utc};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::models::batch::{BatchRecord, RequestTemplate};
use crate::models::submission::{auto_label, job_dir, job_folder_name, SubmissionRecord};
use crate::services::backend::{BatchJobs, FileStore};
use crate::services::gemini::GeminiError;
use crate::services::request_builder::{self, BuildError};

pub const REQUEST_DOCUMENT_NAME: &str = "batch_input_images.jsonl";
const REQUEST_DOCUMENT_MIME: &str = "application/jsonl";

/// What the submitter produced: the persisted record and where it lives.
#[derive(Debug)]
pub struct Submission {
    pub record: SubmissionRecord,
    pub job_dir: PathBuf,
}

/// Build the request document, hand it to the service and persist the
/// submission record under `output_root`.
pub async fn submit_batch<B: FileStore + BatchJobs>(
    backend: &B,
    records: &[BatchRecord],
    template: &RequestTemplate,
    label: Option<&str>,
    output_root: &Path,
) -> Result<Submission, SubmitError> {
    if records.is_empty() {
        return Err(SubmitError::NothingToSubmit);
    }

    let lines = request_builder::build_request_lines(records, template)?;

    std::fs::create_dir_all(output_root)?;
    let document_path = output_root.join(REQUEST_DOCUMENT_NAME);
    request_builder::write_request_document(&lines, BufWriter::new(File::create(&document_path)?))?;
    tracing::info!(path = %document_path.display(), requests = lines.len(), "Wrote request document");

    let document = backend
        .upload_file(&document_path, REQUEST_DOCUMENT_MIME)
        .await?;
    tracing::info!(file = %document.name, "Uploaded request document");

    let user_label = label.map(str::trim).filter(|l| !l.is_empty());
    let display_name = user_label
        .map(str::to_string)
        .unwrap_or_else(|| auto_label(Local::now()));

    let job = backend
        .create_batch(&template.model, &document.name, &display_name)
        .await?;
    tracing::info!(job_id = %job.name, display_name = %display_name, state = %job.state, "Batch job created");

    // Same rule the retrieval side uses, so both land in one folder.
    let dir = job_dir(output_root, &job_folder_name(&job.name, user_label));

    let record = SubmissionRecord {
        job_id: job.name.clone(),
        display_name,
        model: template.model.clone(),
        prompt: template.instruction.clone(),
        config: template.generation_config.clone(),
        created_at: Utc::now(),
        status: job.state.to_string(),
    };
    record.save(&dir)?;
    tracing::info!(path = %SubmissionRecord::path(&dir).display(), "Saved submission details");

    Ok(Submission {
        record,
        job_dir: dir,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("No uploaded inputs to submit")]
    NothingToSubmit,

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Remote call failed: {0}")]
    Remote(#[from] GeminiError),

    #[error("Failed to write submission files: {0}")]
    Io(#[from] std::io::Error),
}
