use crate::app_state::AppState;
use crate::cli::DownloadArgs;
use crate::commands::CommandError;
use crate::services::retrieval::{retrieve_all, RetrievalOutcome, RetrievalSettings};

/// `download`: fetch and extract results for succeeded jobs.
pub async fn run(state: &AppState, args: DownloadArgs) -> Result<(), CommandError> {
    let config = &state.config;
    let settings = RetrievalSettings {
        input_root: config.input_dir.clone(),
        output_root: config.output_dir.clone(),
        temp_dir: config.temp_dir(),
        chunk_bytes: config.download_chunk_bytes,
    };

    let results = retrieve_all(
        state.gemini.as_ref(),
        state.recovery.as_ref(),
        &settings,
        args.target.as_deref(),
    )
    .await?;

    for result in &results {
        let summary = match &result.outcome {
            RetrievalOutcome::Skipped { existing_images } => {
                format!("skipped ({existing_images} images already present)")
            }
            RetrievalOutcome::NoResultFile => "no result file".to_string(),
            RetrievalOutcome::Completed(report) => format!(
                "{} images saved, {} failed, {} quarantined",
                report.images_saved, report.records_failed, report.quarantined
            ),
            RetrievalOutcome::Failed(reason) => format!("failed: {reason}"),
        };
        println!("{} -> {}: {summary}", result.job_name, result.job_dir.display());
    }

    Ok(())
}
