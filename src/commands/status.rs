use crate::app_state::AppState;
use crate::cli::StatusArgs;
use crate::commands::CommandError;
use crate::services::backend::BatchJobs;
use crate::services::classifier::{classify, render_report};

pub async fn run(state: &AppState, args: StatusArgs) -> Result<(), CommandError> {
    let jobs = state.gemini.list_batches().await?;
    if jobs.is_empty() {
        println!("No batch jobs found.");
        return Ok(());
    }

    print!("{}", render_report(&classify(jobs), args.history));
    Ok(())
}
