use crate::app_state::AppState;
use crate::cli::CleanupArgs;
use crate::commands::CommandError;
use crate::services::cleanup::{cancel_active, delete_all_files, delete_jobs, DeleteScope, SweepReport};

/// `cleanup`: every requested sweep runs even if an earlier one had failures.
pub async fn run(state: &AppState, args: CleanupArgs) -> Result<(), CommandError> {
    if !args.has_work() {
        println!("Nothing to do. Pass --cancel-active, --delete-jobs or --delete-files.");
        return Ok(());
    }
    if !args.yes {
        return Err(CommandError::NotConfirmed(describe(&args)));
    }

    let backend = state.gemini.as_ref();

    if args.cancel_active {
        print_report("Cancel", &cancel_active(backend).await?);
    }
    if let Some(raw) = args.delete_jobs.as_deref() {
        print_report("Delete job", &delete_jobs(backend, &DeleteScope::from(raw)).await?);
    }
    if args.delete_files {
        print_report("Delete file", &delete_all_files(backend).await?);
    }

    Ok(())
}

fn describe(args: &CleanupArgs) -> String {
    let mut actions = Vec::new();
    if args.cancel_active {
        actions.push("cancel active jobs".to_string());
    }
    if let Some(target) = &args.delete_jobs {
        actions.push(format!("delete jobs ({target})"));
    }
    if args.delete_files {
        actions.push("delete uploaded files".to_string());
    }
    actions.join(" and ")
}

fn print_report(action: &str, report: &SweepReport) {
    println!("{action}: {} ok, {} failed", report.succeeded.len(), report.failed.len());
    for (name, reason) in &report.failed {
        println!("  {name}: {reason}");
    }
}
