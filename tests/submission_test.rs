mod helpers;

use std::time::Duration;

use helpers::FakeBackend;
use image_batch_pipeline::models::batch::{BatchRecord, GenerationConfig, ImageSize, RequestTemplate};
use image_batch_pipeline::models::file::{FileState, RemoteHandle};
use image_batch_pipeline::models::submission::{job_dir, job_folder_name, SubmissionRecord};
use image_batch_pipeline::services::scanner::scan_inputs;
use image_batch_pipeline::services::submitter::{submit_batch, SubmitError, REQUEST_DOCUMENT_NAME};
use image_batch_pipeline::services::uploader::{upload_all, wait_until_ready, UploadError, UploadPolicy};

fn fast_policy() -> UploadPolicy {
    UploadPolicy {
        concurrency: 3,
        poll_interval: Duration::from_millis(1),
        max_polls: 5,
    }
}

fn input_folder(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"pixels").unwrap();
    }
    dir
}

fn template(candidates: u8) -> RequestTemplate {
    RequestTemplate {
        model: "models/gemini-test-image".to_string(),
        instruction: "Fix the colors.".to_string(),
        generation_config: GenerationConfig::new(candidates, ImageSize::TwoK),
    }
}

fn record(key: &str) -> BatchRecord {
    BatchRecord {
        correlation_key: key.to_string(),
        handle: RemoteHandle {
            uri: format!("https://fake.test/v1beta/files/{key}"),
            mime_type: "image/png".to_string(),
        },
    }
}

#[tokio::test]
async fn test_upload_failures_are_isolated() {
    let dir = input_folder(&["a.png", "b.jpg", "c.webp", "d.png"]);
    let backend = FakeBackend::new();
    {
        let mut state = backend.state();
        state.processing_polls = 2;
        state.rejected_uploads.insert("b.jpg".to_string());
        state.failing_uploads.insert("c.webp".to_string());
    }

    let inputs = scan_inputs(dir.path()).unwrap();
    let mut outcomes = upload_all(&backend, inputs, &fast_policy()).await;
    outcomes.sort_by(|a, b| a.input.key.cmp(&b.input.key));

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(outcomes[1].result, Err(UploadError::Remote(_))));
    assert!(matches!(&outcomes[2].result, Err(UploadError::FailedState(s)) if s == "FAILED"));
    assert!(outcomes[3].result.is_ok());

    let handle = outcomes[0].result.as_ref().unwrap();
    assert_eq!(handle.mime_type, "image/png");
    assert!(handle.uri.starts_with("https://fake.test/"));

    // Every input was attempted exactly once
    assert_eq!(backend.state().upload_calls.len(), 4);
}

#[tokio::test]
async fn test_readiness_poll_is_bounded() {
    let dir = input_folder(&["slow.png"]);
    let backend = FakeBackend::new();
    backend.state().processing_polls = 100;

    let inputs = scan_inputs(dir.path()).unwrap();
    let outcomes = upload_all(&backend, inputs, &fast_policy()).await;

    assert!(matches!(
        outcomes[0].result,
        Err(UploadError::StillProcessing { polls: 5 })
    ));
    assert_eq!(backend.state().get_file_calls, 5);
}

#[tokio::test]
async fn test_wait_until_ready_returns_immediately_for_active_files() {
    let backend = FakeBackend::new();
    let file = helpers::remote_file("files/x", "x.png", FileState::Active);

    let ready = wait_until_ready(&backend, file, &fast_policy()).await.unwrap();
    assert_eq!(ready.state, FileState::Active);
    assert_eq!(backend.state().get_file_calls, 0);
}

#[tokio::test]
async fn test_submit_with_label_writes_record_in_named_folder() {
    let output = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new();

    let submission = submit_batch(
        &backend,
        &[record("a.png"), record("b.png")],
        &template(2),
        Some("Reef Dive #3"),
        output.path(),
    )
    .await
    .unwrap();

    assert_eq!(submission.job_dir, output.path().join("job_Reef_Dive_3"));
    assert_eq!(submission.record.job_id, "batches/b1");
    assert_eq!(submission.record.display_name, "Reef Dive #3");

    let saved = SubmissionRecord::load(&submission.job_dir).unwrap();
    assert_eq!(saved.job_id, "batches/b1");
    assert_eq!(saved.config.candidate_count, 2);
    assert_eq!(saved.status, "JOB_STATE_PENDING");
    assert!(SubmissionRecord::find(output.path(), "Reef Dive #3").is_some());

    let doc = std::fs::read_to_string(output.path().join(REQUEST_DOCUMENT_NAME)).unwrap();
    let lines: Vec<serde_json::Value> = doc.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["custom_id"], "a.png");
    assert_eq!(lines[1]["request"]["generation_config"]["candidate_count"], 2);

    let state = backend.state();
    assert_eq!(state.upload_calls, vec![REQUEST_DOCUMENT_NAME.to_string()]);
    let (model, input_file, display) = &state.created_batches[0];
    assert_eq!(model, "models/gemini-test-image");
    assert_eq!(input_file, "files/f1");
    assert_eq!(display, "Reef Dive #3");
}

#[tokio::test]
async fn test_submit_without_label_uses_job_id_folder() {
    let output = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new();

    let submission = submit_batch(&backend, &[record("a.png")], &template(1), None, output.path())
        .await
        .unwrap();

    assert!(submission.record.display_name.starts_with("image_enhance_"));
    assert_eq!(submission.job_dir, output.path().join("job_b1"));
}

#[tokio::test]
async fn test_label_with_auto_prefix_lands_where_retrieval_looks() {
    let output = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new();

    let submission = submit_batch(
        &backend,
        &[record("a.png")],
        &template(1),
        Some("image_enhance_custom"),
        output.path(),
    )
    .await
    .unwrap();

    assert_eq!(submission.job_dir, output.path().join("job_b1"));
    let retrieval_folder = job_folder_name(
        &submission.record.job_id,
        Some(submission.record.display_name.as_str()),
    );
    assert_eq!(job_dir(output.path(), &retrieval_folder), submission.job_dir);
}

#[tokio::test]
async fn test_submit_rejects_empty_and_duplicate_batches() {
    let output = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new();

    let empty = submit_batch(&backend, &[], &template(1), None, output.path()).await;
    assert!(matches!(empty, Err(SubmitError::NothingToSubmit)));

    let duplicate = submit_batch(
        &backend,
        &[record("a.png"), record("a.png")],
        &template(1),
        None,
        output.path(),
    )
    .await;
    assert!(matches!(duplicate, Err(SubmitError::Build(_))));

    let invalid = submit_batch(&backend, &[record("a.png")], &template(7), None, output.path()).await;
    assert!(matches!(invalid, Err(SubmitError::Build(_))));

    assert!(backend.state().created_batches.is_empty());
}
