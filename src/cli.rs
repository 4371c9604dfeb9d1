use clap::{Args, Parser, Subcommand};

use crate::models::batch::ImageSize;

#[derive(Parser)]
#[command(name = "image-batch", version)]
#[command(about = "Submit image batches to the Gemini Batch API and retrieve the results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload every input image and create a batch job
    Submit(SubmitArgs),

    /// Show active jobs and recent history
    Status(StatusArgs),

    /// Download and extract results of succeeded jobs
    Download(DownloadArgs),

    /// List uploaded files and storage use
    Storage,

    /// Cancel jobs, delete job records or uploaded files
    Cleanup(CleanupArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Display name for the job (also names its output folder)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output variants per image
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub candidates: u8,

    /// Output resolution (1K/2K/4K)
    #[arg(long, default_value = "1K")]
    pub image_size: ImageSize,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Completed jobs to show
    #[arg(long, default_value_t = 5)]
    pub history: usize,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Job id, short id or display name (default: every succeeded job)
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Cancel every running or pending job
    #[arg(long)]
    pub cancel_active: bool,

    /// Delete job records: `all` or a job id / display name
    #[arg(long, value_name = "all|TARGET")]
    pub delete_jobs: Option<String>,

    /// Delete every uploaded file
    #[arg(long)]
    pub delete_files: bool,

    /// Confirm the requested operations
    #[arg(short, long)]
    pub yes: bool,
}

impl CleanupArgs {
    pub fn has_work(&self) -> bool {
        self.cancel_active || self.delete_jobs.is_some() || self.delete_files
    }
}
