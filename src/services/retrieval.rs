//! Retrieval of finished batch jobs: pick jobs, skip those already done,
//! download, extract, clean up.

use std::path::{Path, PathBuf};
use tracing::Instrument;

use crate::models::job::{BatchJob, JobState};
use crate::models::submission::{job_dir, job_folder_name, SubmissionRecord};
use crate::services::backend::{BatchJobs, FileStore};
use crate::services::downloader;
use crate::services::extractor::{self, ExtractionReport, ExtractionTarget};
use crate::services::gemini::GeminiError;
use crate::services::recovery::RecoveryStore;

/// Extensions that count as "already has output" for the skip rule.
const OUTPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub temp_dir: PathBuf,
    pub chunk_bytes: usize,
}

#[derive(Debug)]
pub enum RetrievalOutcome {
    /// Output folder already held images; nothing was downloaded
    Skipped { existing_images: usize },
    /// The job reports no response file
    NoResultFile,
    Completed(ExtractionReport),
    Failed(String),
}

#[derive(Debug)]
pub struct JobRetrieval {
    pub job_name: String,
    pub job_dir: PathBuf,
    pub outcome: RetrievalOutcome,
}

/// Number of recognised image files directly inside `dir` (0 if missing).
pub fn existing_output_count(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_ascii_lowercase();
                    OUTPUT_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
        })
        .count()
}

/// Succeeded jobs matching `target` (all succeeded jobs when `None`).
///
/// A target matches by full id, short id, exact display name, or through the
/// job id saved in a local submission record for that label.
pub fn select_jobs(jobs: Vec<BatchJob>, target: Option<&str>, output_root: &Path) -> Vec<BatchJob> {
    let recorded_id = target
        .and_then(|t| SubmissionRecord::find(output_root, t))
        .map(|r| r.job_id);

    jobs.into_iter()
        .filter(|j| j.state == JobState::Succeeded)
        .filter(|j| match target {
            None => true,
            Some(t) => j.matches_target(t) || recorded_id.as_deref() == Some(j.name.as_str()),
        })
        .collect()
}

/// Retrieve every selected job. Listing failure is fatal; anything that goes
/// wrong inside one job is recorded in its outcome and the rest continue.
pub async fn retrieve_all<B, S>(
    backend: &B,
    store: &S,
    settings: &RetrievalSettings,
    target: Option<&str>,
) -> Result<Vec<JobRetrieval>, RetrievalError>
where
    B: FileStore + BatchJobs,
    S: RecoveryStore + ?Sized,
{
    let jobs = select_jobs(backend.list_batches().await?, target, &settings.output_root);

    match (jobs.is_empty(), target) {
        (true, Some(t)) => tracing::warn!(target = %t, "No completed job found matching target"),
        (true, None) => tracing::info!("No completed batch jobs found"),
        (false, _) => tracing::info!(jobs = jobs.len(), "Found completed job(s), processing"),
    }

    let mut results = Vec::with_capacity(jobs.len());
    for job in &jobs {
        results.push(retrieve_job(backend, store, settings, job).await);
    }

    Ok(results)
}

pub async fn retrieve_job<B, S>(
    backend: &B,
    store: &S,
    settings: &RetrievalSettings,
    job: &BatchJob,
) -> JobRetrieval
where
    B: FileStore,
    S: RecoveryStore + ?Sized,
{
    let folder = job_folder_name(&job.name, job.display_name.as_deref());
    let dir = job_dir(&settings.output_root, &folder);
    let span = tracing::info_span!("job", id = %job.name, folder = %folder);

    let outcome = async {
        let outcome = run_job(backend, store, settings, job, &dir).await;
        match &outcome {
            RetrievalOutcome::Skipped { existing_images } => {
                tracing::info!(existing_images, "Skipping: output folder already has images")
            }
            RetrievalOutcome::NoResultFile => tracing::warn!("No output file found"),
            RetrievalOutcome::Completed(report) => {
                tracing::info!(saved = report.images_saved, failed = report.records_failed, "Job processed")
            }
            RetrievalOutcome::Failed(reason) => tracing::error!(reason = %reason, "Job retrieval failed"),
        }
        outcome
    }
    .instrument(span)
    .await;

    JobRetrieval {
        job_name: job.name.clone(),
        job_dir: dir,
        outcome,
    }
}

async fn run_job<B, S>(
    backend: &B,
    store: &S,
    settings: &RetrievalSettings,
    job: &BatchJob,
    dir: &Path,
) -> RetrievalOutcome
where
    B: FileStore,
    S: RecoveryStore + ?Sized,
{
    let existing_images = existing_output_count(dir);
    if existing_images > 0 {
        return RetrievalOutcome::Skipped { existing_images };
    }

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        return RetrievalOutcome::Failed(format!("cannot create {}: {e}", dir.display()));
    }

    let Some(result_file) = job.result_file.as_deref() else {
        return RetrievalOutcome::NoResultFile;
    };

    let temp = match downloader::download_results(
        backend,
        store,
        result_file,
        &settings.temp_dir,
        settings.chunk_bytes,
    )
    .await
    {
        Ok(temp) => temp,
        Err(e) => return RetrievalOutcome::Failed(e.to_string()),
    };

    let path = temp.path().to_path_buf();
    let target = ExtractionTarget {
        input_root: settings.input_root.clone(),
        job_dir: dir.to_path_buf(),
    };
    let extracted = tokio::task::spawn_blocking(in_current_span(move || {
        extractor::extract_file(&path, &target)
    }))
    .await;

    // The temp file is owned until extraction has finished with it.
    if let Err(e) = temp.discard() {
        tracing::error!(error = %e, "Failed to clean up temp result file");
    }

    match extracted {
        Ok(Ok(report)) => RetrievalOutcome::Completed(report),
        Ok(Err(e)) => RetrievalOutcome::Failed(e.to_string()),
        Err(e) => RetrievalOutcome::Failed(format!("extraction task failed: {e}")),
    }
}

/// Wrap `work` so it logs under the caller's span and subscriber when it
/// runs on another thread.
fn in_current_span<T: 'static>(
    work: impl FnOnce() -> T + Send + 'static,
) -> impl FnOnce() -> T + Send + 'static {
    let span = tracing::Span::current();
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    move || tracing::dispatcher::with_default(&dispatch, || span.in_scope(work))
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Failed to list batch jobs: {0}")]
    List(#[from] GeminiError),
}
