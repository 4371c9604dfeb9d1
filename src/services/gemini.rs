//! Gemini REST client (files and batches endpoints).

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::models::file::{FileEnvelopeWire, FileListWire, RemoteFile};
use crate::models::job::{BatchJob, BatchListWire, BatchOperationWire};
use crate::services::backend::{BatchJobs, FileStore};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
const PAGE_SIZE: u32 = 100;

/// Client for the Gemini files and batch APIs.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    download_timeout: Duration,
}

#[derive(Deserialize)]
struct ApiErrorWire {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        download_timeout: Duration,
    ) -> Result<Self, GeminiError> {
        let http = Client::builder()
            .user_agent(concat!("image-batch-pipeline/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            download_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    /// Turn a non-2xx response into `GeminiError::Api`, keeping the
    /// service's own message when it sent one.
    async fn ensure_success(response: Response) -> Result<Response, GeminiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorWire>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);

        Err(GeminiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn batch_endpoint(model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("v1beta/models/{model}:batchGenerateContent")
    }
}

impl FileStore for GeminiClient {
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, GeminiError> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // Resumable protocol: open a session, then send the bytes in one go.
        let start = self
            .authed(self.http.post(self.url("upload/v1beta/files")))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = Self::ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(GeminiError::MissingUploadUrl)?
            .to_string();

        let finish = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let envelope: FileEnvelopeWire = Self::ensure_success(finish).await?.json().await?;

        Ok(envelope.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, GeminiError> {
        let response = self
            .authed(self.http.get(self.url(&format!("v1beta/{name}"))))
            .send()
            .await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, GeminiError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .authed(self.http.get(self.url("v1beta/files")))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: FileListWire = Self::ensure_success(request.send().await?)
                .await?
                .json()
                .await?;
            files.extend(page.files);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    async fn delete_file(&self, name: &str) -> Result<(), GeminiError> {
        let response = self
            .authed(self.http.delete(self.url(&format!("v1beta/{name}"))))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn download_file<W>(&self, name: &str, sink: &mut W) -> Result<u64, GeminiError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let response = self
            .authed(
                self.http
                    .get(self.url(&format!("download/v1beta/{name}:download")))
                    .query(&[("alt", "media")]),
            )
            .timeout(self.download_timeout)
            .send()
            .await?;
        let mut response = Self::ensure_success(response).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        Ok(written)
    }
}

impl BatchJobs for GeminiClient {
    async fn create_batch(
        &self,
        model: &str,
        input_file: &str,
        display_name: &str,
    ) -> Result<BatchJob, GeminiError> {
        let body = serde_json::json!({
            "batch": {
                "display_name": display_name,
                "input_config": { "file_name": input_file }
            }
        });

        let response = self
            .authed(self.http.post(self.url(&Self::batch_endpoint(model))))
            .json(&body)
            .send()
            .await?;
        let operation: BatchOperationWire = Self::ensure_success(response).await?.json().await?;

        Ok(operation.into())
    }

    async fn list_batches(&self) -> Result<Vec<BatchJob>, GeminiError> {
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .authed(self.http.get(self.url("v1beta/batches")))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: BatchListWire = Self::ensure_success(request.send().await?)
                .await?
                .json()
                .await?;
            jobs.extend(page.operations.into_iter().map(BatchJob::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(jobs)
    }

    async fn cancel_batch(&self, name: &str) -> Result<(), GeminiError> {
        let response = self
            .authed(self.http.post(self.url(&format!("v1beta/{name}:cancel"))))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete_batch(&self, name: &str) -> Result<(), GeminiError> {
        let response = self
            .authed(self.http.delete(self.url(&format!("v1beta/{name}"))))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Upload session did not return an upload URL")]
    MissingUploadUrl,

    #[error("Local I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
