use crate::app_state::AppState;
use crate::cli::SubmitArgs;
use crate::commands::CommandError;
use crate::models::batch::{BatchRecord, GenerationConfig, RequestTemplate};
use crate::services::scanner::scan_inputs;
use crate::services::submitter::submit_batch;
use crate::services::uploader::{upload_all, UploadPolicy};

/// `submit`: scan, upload, build the request document and create the job.
pub async fn run(state: &AppState, args: SubmitArgs) -> Result<(), CommandError> {
    let config = &state.config;

    let inputs = scan_inputs(&config.input_dir)?;
    if inputs.is_empty() {
        tracing::warn!(dir = %config.input_dir.display(), "No images found");
        return Ok(());
    }
    tracing::info!(images = inputs.len(), dir = %config.input_dir.display(), "Found input images");

    let policy = UploadPolicy {
        concurrency: config.upload_concurrency,
        poll_interval: config.upload_poll_interval(),
        max_polls: config.upload_max_polls,
    };
    let outcomes = upload_all(state.gemini.as_ref(), inputs, &policy).await;

    let mut records = Vec::with_capacity(outcomes.len());
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome.result {
            Ok(handle) => records.push(BatchRecord {
                correlation_key: outcome.input.key,
                handle,
            }),
            Err(_) => failed += 1,
        }
    }
    // Completion order is nondeterministic; the document is not.
    records.sort_by(|a, b| a.correlation_key.cmp(&b.correlation_key));

    if failed > 0 {
        tracing::warn!(failed, ready = records.len(), "Some uploads failed, submitting the rest");
    }

    let template = RequestTemplate {
        model: config.model.clone(),
        instruction: config.prompt().to_string(),
        generation_config: GenerationConfig::new(args.candidates, args.image_size),
    };

    let submission = submit_batch(
        state.gemini.as_ref(),
        &records,
        &template,
        args.name.as_deref(),
        &config.output_dir,
    )
    .await?;

    println!("Batch job created: {}", submission.record.job_id);
    println!("Display name: {}", submission.record.display_name);
    println!("Details saved to {}", submission.job_dir.display());
    Ok(())
}
