//! In-memory stand-in for the Gemini service.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use image_batch_pipeline::models::file::{FileState, RemoteFile};
use image_batch_pipeline::models::job::{BatchJob, JobState};
use image_batch_pipeline::services::backend::{BatchJobs, FileStore};
use image_batch_pipeline::services::gemini::GeminiError;

#[derive(Default)]
pub struct FakeState {
    /// Files known to the service, keyed by resource name
    pub files: Vec<RemoteFile>,
    /// Readiness polls left before a processing file becomes active
    pub pending_polls: HashMap<String, u32>,
    pub jobs: Vec<BatchJob>,
    /// Response documents by file name
    pub downloads: HashMap<String, Vec<u8>>,

    /// Polls each new upload stays in PROCESSING
    pub processing_polls: u32,
    /// Uploads (by local file name) rejected outright
    pub rejected_uploads: HashSet<String>,
    /// Uploads (by local file name) that end up FAILED after processing
    pub failing_uploads: HashSet<String>,
    /// When set, downloads write this many bytes then fail
    pub broken_download_after: Option<usize>,
    /// Resource names whose cancel/delete calls fail
    pub failing_deletes: HashSet<String>,

    pub upload_calls: Vec<String>,
    pub get_file_calls: usize,
    pub download_calls: Vec<String>,
    pub created_batches: Vec<(String, String, String)>,
    pub cancelled: Vec<String>,
    pub deleted_jobs: Vec<String>,
    pub deleted_files: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_job(self, job: BatchJob) -> Self {
        self.state().jobs.push(job);
        self
    }

    pub fn with_download(self, file_name: &str, body: impl Into<Vec<u8>>) -> Self {
        self.state().downloads.insert(file_name.to_string(), body.into());
        self
    }
}

pub fn job(id: &str, display: Option<&str>, state: JobState, result_file: Option<&str>) -> BatchJob {
    BatchJob {
        name: format!("batches/{id}"),
        display_name: display.map(str::to_string),
        state,
        create_time: None,
        result_file: result_file.map(str::to_string),
        error: None,
    }
}

pub fn remote_file(name: &str, display: &str, state: FileState) -> RemoteFile {
    RemoteFile {
        name: name.to_string(),
        display_name: Some(display.to_string()),
        mime_type: Some("image/png".to_string()),
        size_bytes: Some(1024),
        create_time: None,
        expiration_time: None,
        uri: Some(format!("https://fake.test/v1beta/{name}")),
        state,
    }
}

fn api_error(status: u16, message: &str) -> GeminiError {
    GeminiError::Api {
        status,
        message: message.to_string(),
    }
}

impl FileStore for FakeBackend {
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, GeminiError> {
        let local_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut state = self.state();
        state.upload_calls.push(local_name.clone());
        if state.rejected_uploads.contains(&local_name) {
            return Err(api_error(400, "upload rejected"));
        }

        let name = format!("files/f{}", state.upload_calls.len());
        let polls = state.processing_polls;
        let mut file = remote_file(&name, &local_name, FileState::Processing);
        file.mime_type = Some(mime_type.to_string());
        if polls == 0 {
            file.state = if state.failing_uploads.contains(&local_name) {
                FileState::Failed
            } else {
                FileState::Active
            };
        }

        state.pending_polls.insert(name, polls);
        state.files.push(file.clone());
        Ok(file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, GeminiError> {
        let mut state = self.state();
        state.get_file_calls += 1;

        let remaining = state.pending_polls.get(name).copied().unwrap_or(0).saturating_sub(1);
        state.pending_polls.insert(name.to_string(), remaining);

        let failing = state.failing_uploads.clone();
        let file = state
            .files
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| api_error(404, "file not found"))?;

        if remaining == 0 && file.state == FileState::Processing {
            let local = file.display_name.clone().unwrap_or_default();
            file.state = if failing.contains(&local) {
                FileState::Failed
            } else {
                FileState::Active
            };
        }
        Ok(file.clone())
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, GeminiError> {
        Ok(self.state().files.clone())
    }

    async fn delete_file(&self, name: &str) -> Result<(), GeminiError> {
        let mut state = self.state();
        if state.failing_deletes.contains(name) {
            return Err(api_error(500, "delete failed"));
        }
        state.files.retain(|f| f.name != name);
        state.deleted_files.push(name.to_string());
        Ok(())
    }

    async fn download_file<W>(&self, name: &str, sink: &mut W) -> Result<u64, GeminiError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (body, broken_after) = {
            let mut state = self.state();
            state.download_calls.push(name.to_string());
            let body = state
                .downloads
                .get(name)
                .cloned()
                .ok_or_else(|| api_error(404, "file not found"))?;
            (body, state.broken_download_after)
        };

        if let Some(limit) = broken_after {
            sink.write_all(&body[..limit.min(body.len())]).await?;
            return Err(api_error(503, "connection reset"));
        }

        // Small chunks so the caller's buffering is exercised
        for chunk in body.chunks(7) {
            sink.write_all(chunk).await?;
        }
        Ok(body.len() as u64)
    }
}

impl BatchJobs for FakeBackend {
    async fn create_batch(
        &self,
        model: &str,
        input_file: &str,
        display_name: &str,
    ) -> Result<BatchJob, GeminiError> {
        let mut state = self.state();
        state
            .created_batches
            .push((model.to_string(), input_file.to_string(), display_name.to_string()));

        let created = job(
            &format!("b{}", state.created_batches.len()),
            Some(display_name),
            JobState::Pending,
            None,
        );
        state.jobs.push(created.clone());
        Ok(created)
    }

    async fn list_batches(&self) -> Result<Vec<BatchJob>, GeminiError> {
        Ok(self.state().jobs.clone())
    }

    async fn cancel_batch(&self, name: &str) -> Result<(), GeminiError> {
        let mut state = self.state();
        if state.failing_deletes.contains(name) {
            return Err(api_error(500, "cancel failed"));
        }
        state.cancelled.push(name.to_string());
        Ok(())
    }

    async fn delete_batch(&self, name: &str) -> Result<(), GeminiError> {
        let mut state = self.state();
        if state.failing_deletes.contains(name) {
            return Err(api_error(500, "delete failed"));
        }
        state.jobs.retain(|j| j.name != name);
        state.deleted_jobs.push(name.to_string());
        Ok(())
    }
}
