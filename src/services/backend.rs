//! Seams between the pipeline and the remote service.
//!
//! The Gemini client implements both traits; tests plug in an in-memory fake.

use std::future::Future;
use std::path::Path;
use tokio::io::AsyncWrite;

use crate::models::{file::RemoteFile, job::BatchJob};
use crate::services::gemini::GeminiError;

/// Remote file storage.
pub trait FileStore: Send + Sync {
    /// Upload a local file. The returned resource may still be processing.
    fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> impl Future<Output = Result<RemoteFile, GeminiError>> + Send;

    fn get_file(&self, name: &str) -> impl Future<Output = Result<RemoteFile, GeminiError>> + Send;

    fn list_files(&self) -> impl Future<Output = Result<Vec<RemoteFile>, GeminiError>> + Send;

    fn delete_file(&self, name: &str) -> impl Future<Output = Result<(), GeminiError>> + Send;

    /// Stream the file's bytes into `sink`, returning the byte count.
    fn download_file<W>(
        &self,
        name: &str,
        sink: &mut W,
    ) -> impl Future<Output = Result<u64, GeminiError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// Remote batch job queue.
pub trait BatchJobs: Send + Sync {
    fn create_batch(
        &self,
        model: &str,
        input_file: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<BatchJob, GeminiError>> + Send;

    fn list_batches(&self) -> impl Future<Output = Result<Vec<BatchJob>, GeminiError>> + Send;

    fn cancel_batch(&self, name: &str) -> impl Future<Output = Result<(), GeminiError>> + Send;

    fn delete_batch(&self, name: &str) -> impl Future<Output = Result<(), GeminiError>> + Send;
}
