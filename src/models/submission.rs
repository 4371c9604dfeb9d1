use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::batch::GenerationConfig;

pub const SUBMISSION_FILE_NAME: &str = "submission_details.json";

/// Prefix of display labels generated when the operator gives none.
pub const AUTO_LABEL_PREFIX: &str = "image_enhance_";

/// Local record tying a human-chosen label to the opaque remote job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub job_id: String,
    pub display_name: String,
    pub model: String,
    pub prompt: String,
    pub config: GenerationConfig,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

impl SubmissionRecord {
    pub fn path(job_dir: &Path) -> PathBuf {
        job_dir.join(SUBMISSION_FILE_NAME)
    }

    pub fn save(&self, job_dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(job_dir)?;
        let writer = BufWriter::new(File::create(Self::path(job_dir))?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load(job_dir: &Path) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(Self::path(job_dir))?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Look up the record saved for `label` under `output_root`, if any.
    pub fn find(output_root: &Path, label: &str) -> Option<Self> {
        let slug = sanitize_label(label);
        if slug.is_empty() {
            return None;
        }
        Self::load(&job_dir(output_root, &slug)).ok()
    }
}

/// Display label used when the operator supplies none.
pub fn auto_label(now: DateTime<Local>) -> String {
    format!("{AUTO_LABEL_PREFIX}{}", now.format("%Y%m%d_%H%M%S"))
}

/// Filesystem-safe slug: alphanumerics, space, `.`, `_` and `-` survive,
/// then the result is trimmed and spaces become underscores.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// Folder slug for a job: its display name when an operator chose one,
/// otherwise the short job id.
pub fn job_folder_name(job_id: &str, display_name: Option<&str>) -> String {
    let short_id = job_id.rsplit('/').next().unwrap_or(job_id);
    let chosen = display_name
        .filter(|d| !d.is_empty() && !d.starts_with(AUTO_LABEL_PREFIX))
        .map(sanitize_label)
        .filter(|s| !s.is_empty());

    chosen.unwrap_or_else(|| sanitize_label(short_id))
}

pub fn job_dir(output_root: &Path, folder_name: &str) -> PathBuf {
    output_root.join(format!("job_{folder_name}"))
}
