use std::cmp::Ordering;
use std::fmt::Write;

use crate::models::job::BatchJob;

/// Jobs split by whether the remote service may still change them.
#[derive(Debug, Default)]
pub struct JobPartition {
    /// Listing order preserved
    pub active: Vec<BatchJob>,
    /// Newest first; jobs without a create time last
    pub completed: Vec<BatchJob>,
}

pub fn classify(jobs: Vec<BatchJob>) -> JobPartition {
    let (active, mut completed): (Vec<_>, Vec<_>) =
        jobs.into_iter().partition(|j| j.state.is_active());

    // sort_by is stable, so ties keep listing order
    completed.sort_by(|a, b| match (a.create_time, b.create_time) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    JobPartition { active, completed }
}

/// Plain-text status report: summary, every active job, then the most
/// recent `history` completed jobs.
pub fn render_report(partition: &JobPartition, history: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Summary: {} active, {} completed/failed.",
        partition.active.len(),
        partition.completed.len()
    );

    if partition.active.is_empty() {
        let _ = writeln!(out, "\nNo active (running/pending) jobs.");
    } else {
        let _ = writeln!(out, "\n=== ACTIVE JOBS ===");
        for job in &partition.active {
            write_job(&mut out, job);
        }
    }

    if !partition.completed.is_empty() && history > 0 {
        let _ = writeln!(out, "\n=== RECENT HISTORY (Last {history}) ===");
        for job in partition.completed.iter().take(history) {
            write_job(&mut out, job);
        }
    }

    out
}

fn write_job(out: &mut String, job: &BatchJob) {
    let _ = writeln!(out, "Job ID: {}", job.name);
    if let Some(name) = &job.display_name {
        let _ = writeln!(out, "Name: {name}");
    }
    let _ = writeln!(out, "Status: {}", job.state);
    match job.create_time {
        Some(t) => {
            let _ = writeln!(out, "Created: {}", t.to_rfc3339());
        }
        None => {
            let _ = writeln!(out, "Created: unknown");
        }
    }
    if let Some(error) = &job.error {
        let _ = writeln!(out, "Error: {error}");
    }
    let _ = writeln!(out, "{}", "-".repeat(30));
}
