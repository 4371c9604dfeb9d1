//! Cancellation of running jobs and deletion of remote jobs and files.
//!
//! Sweeps never stop at the first failure: every item is attempted, each
//! failure is logged and counted.

use crate::models::job::BatchJob;
use crate::services::backend::{BatchJobs, FileStore};
use crate::services::gemini::GeminiError;

/// Which job records a delete sweep touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    All,
    /// Full id, short id or exact display name
    Matching(String),
}

impl From<&str> for DeleteScope {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            s if s.eq_ignore_ascii_case("all") => DeleteScope::All,
            s => DeleteScope::Matching(s.to_string()),
        }
    }
}

impl DeleteScope {
    pub fn includes(&self, job: &BatchJob) -> bool {
        match self {
            DeleteScope::All => true,
            DeleteScope::Matching(target) => job.matches_target(target),
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub succeeded: Vec<String>,
    /// Resource name and the reason it failed
    pub failed: Vec<(String, String)>,
}

impl SweepReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    fn record(&mut self, name: &str, result: Result<(), CleanupError>, action: &str) {
        match result {
            Ok(()) => {
                tracing::info!(name = %name, "{action} succeeded");
                self.succeeded.push(name.to_string());
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "{action} failed");
                self.failed.push((name.to_string(), e.to_string()));
            }
        }
    }
}

/// Request cancellation of a job the service may still change.
pub async fn cancel_job<B: BatchJobs>(backend: &B, job: &BatchJob) -> Result<(), CleanupError> {
    if !job.state.is_active() {
        return Err(CleanupError::AlreadyTerminal {
            name: job.name.clone(),
            state: job.state.to_string(),
        });
    }
    backend.cancel_batch(&job.name).await?;
    Ok(())
}

pub async fn delete_job<B: BatchJobs>(backend: &B, name: &str) -> Result<(), CleanupError> {
    backend.delete_batch(name).await?;
    Ok(())
}

pub async fn delete_file<B: FileStore>(backend: &B, name: &str) -> Result<(), CleanupError> {
    backend.delete_file(name).await?;
    Ok(())
}

/// Cancel every active job.
pub async fn cancel_active<B: BatchJobs>(backend: &B) -> Result<SweepReport, CleanupError> {
    let jobs = backend.list_batches().await?;
    let mut report = SweepReport::default();

    for job in jobs.iter().filter(|j| j.state.is_active()) {
        tracing::info!(name = %job.name, state = %job.state, "Cancelling job");
        report.record(&job.name, cancel_job(backend, job).await, "Cancel");
    }

    if report.attempted() == 0 {
        tracing::info!("No active jobs found to stop");
    }
    Ok(report)
}

/// Delete job records in `scope`.
pub async fn delete_jobs<B: BatchJobs>(
    backend: &B,
    scope: &DeleteScope,
) -> Result<SweepReport, CleanupError> {
    let jobs = backend.list_batches().await?;
    let mut report = SweepReport::default();

    for job in jobs.iter().filter(|j| scope.includes(j)) {
        tracing::info!(name = %job.name, state = %job.state, "Deleting job record");
        report.record(&job.name, delete_job(backend, &job.name).await, "Delete job");
    }

    if let (0, DeleteScope::Matching(target)) = (report.attempted(), scope) {
        tracing::warn!(target = %target, "No job found matching target");
    }
    Ok(report)
}

/// Delete every uploaded file.
pub async fn delete_all_files<B: FileStore>(backend: &B) -> Result<SweepReport, CleanupError> {
    let files = backend.list_files().await?;
    let mut report = SweepReport::default();

    if files.is_empty() {
        tracing::info!("No files found to delete");
    }
    for file in &files {
        tracing::info!(
            name = %file.name,
            display_name = %file.display_name.as_deref().unwrap_or("-"),
            "Deleting file"
        );
        report.record(&file.name, delete_file(backend, &file.name).await, "Delete file");
    }

    Ok(report)
}

#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Job {name} is already {state}")]
    AlreadyTerminal { name: String, state: String },

    #[error(transparent)]
    Remote(#[from] GeminiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobState;

    fn job(name: &str, display: Option<&str>) -> BatchJob {
        BatchJob {
            name: format!("batches/{name}"),
            display_name: display.map(str::to_string),
            state: JobState::Succeeded,
            create_time: None,
            result_file: None,
            error: None,
        }
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!(DeleteScope::from("all"), DeleteScope::All);
        assert_eq!(DeleteScope::from(" ALL "), DeleteScope::All);
        assert_eq!(DeleteScope::from("reef"), DeleteScope::Matching("reef".to_string()));
    }

    #[test]
    fn test_scope_matching() {
        let scope = DeleteScope::from("reef");
        assert!(scope.includes(&job("x1", Some("reef"))));
        assert!(scope.includes(&job("reef", None)));
        assert!(!scope.includes(&job("x2", Some("reef-2"))));
        assert!(DeleteScope::All.includes(&job("x3", None)));
    }
}
