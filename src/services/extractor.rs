//! Line-at-a-time extraction of output images from a batch response file.
//!
//! Only one record is held in memory at a time. Nothing a single record does
//! can stop the stream: malformed lines are skipped, failed records are
//! quarantined, and the loop moves on.

use base64::Engine;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

use crate::models::response::{GenerateResponse, ResultLine, SafetyRating};

/// Subfolder of a job's output holding copies of inputs that produced nothing.
pub const QUARANTINE_DIR: &str = "unprocessed";

/// Records between progress log lines.
pub const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Parsed records
    pub records: usize,
    pub images_saved: usize,
    /// Records that produced no image at all
    pub records_failed: usize,
    pub quarantined: usize,
    pub malformed_lines: usize,
    /// Candidates with no usable image payload
    pub candidates_without_image: usize,
}

/// Paths one extraction run works against.
#[derive(Debug, Clone)]
pub struct ExtractionTarget {
    /// Where the original inputs live, for quarantine copies
    pub input_root: PathBuf,
    /// `generated_images/job_<name>`
    pub job_dir: PathBuf,
}

pub fn extract_file(path: &Path, target: &ExtractionTarget) -> Result<ExtractionReport, ExtractError> {
    extract_results(BufReader::new(File::open(path)?), target)
}

/// Process every line of `reader`. Only a read failure on the stream itself
/// is returned as an error.
pub fn extract_results<R: BufRead>(
    mut reader: R,
    target: &ExtractionTarget,
) -> Result<ExtractionReport, ExtractError> {
    let mut extractor = Extractor {
        target,
        report: ExtractionReport::default(),
    };

    // Raw bytes rather than `lines()`: invalid UTF-8 is one malformed
    // record, not a fatal read error.
    let mut line = Vec::new();
    let mut index = 0usize;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        extractor.process_line(index, &line);
        index += 1;
    }

    let report = extractor.report;
    tracing::info!(
        job_dir = %target.job_dir.display(),
        records = report.records,
        failed = report.records_failed,
        quarantined = report.quarantined,
        malformed = report.malformed_lines,
        "Saved {} images",
        report.images_saved
    );

    Ok(report)
}

struct Extractor<'a> {
    target: &'a ExtractionTarget,
    report: ExtractionReport,
}

impl Extractor<'_> {
    fn process_line(&mut self, index: usize, raw: &[u8]) {
        let raw = raw.trim_ascii();
        if raw.is_empty() {
            return;
        }

        let line: ResultLine = match serde_json::from_slice(raw) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Failed to parse result line");
                self.report.malformed_lines += 1;
                return;
            }
        };

        self.report.records += 1;
        if self.report.records % PROGRESS_EVERY == 0 {
            tracing::info!(
                records = self.report.records,
                saved = self.report.images_saved,
                "Processing results"
            );
        }

        let key = line
            .custom_id
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| format!("unknown_{index}"));

        let Some(relative) = safe_relative_path(&key) else {
            tracing::warn!(key = %key, "Correlation key is not a safe relative path, skipping");
            self.report.records_failed += 1;
            return;
        };

        if let Some(error) = line.error {
            tracing::warn!(key = %key, reason = %error.describe(), "Request failed");
            self.fail_record(&key, &relative);
            return;
        }

        let response = line.response.unwrap_or_default();
        if response.candidates.iter().all(|c| c.parts().is_empty()) {
            tracing::warn!(key = %key, reason = %describe_empty_response(&response), "No image returned");
            self.fail_record(&key, &relative);
            return;
        }

        let multiple = response.candidates.len() > 1;
        let mut saved_any = false;

        for (i, candidate) in response.candidates.iter().enumerate() {
            let number = i + 1;
            let Some(payload) = candidate.image_payload() else {
                tracing::warn!(key = %key, candidate = number, "No image found in candidate");
                self.report.candidates_without_image += 1;
                continue;
            };

            let bytes = match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
                Ok(bytes) if !bytes.is_empty() => bytes,
                Ok(_) => {
                    tracing::warn!(key = %key, candidate = number, "No image found in candidate");
                    self.report.candidates_without_image += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(key = %key, candidate = number, error = %e, "Image payload is not valid base64");
                    self.report.candidates_without_image += 1;
                    continue;
                }
            };

            let destination = self
                .target
                .job_dir
                .join(artifact_path(&relative, number, multiple));
            match write_artifact(&destination, &bytes) {
                Ok(()) => {
                    tracing::debug!(key = %key, path = %destination.display(), "Saved");
                    self.report.images_saved += 1;
                    saved_any = true;
                }
                Err(e) => {
                    tracing::error!(key = %key, path = %destination.display(), error = %e, "Failed to save image");
                    self.report.candidates_without_image += 1;
                }
            }
        }

        if !saved_any {
            self.fail_record(&key, &relative);
        }
    }

    fn fail_record(&mut self, key: &str, relative: &Path) {
        self.report.records_failed += 1;

        let source = self.target.input_root.join(relative);
        if !source.is_file() {
            tracing::warn!(key = %key, path = %source.display(), "Original input not found, nothing to quarantine");
            return;
        }

        let destination = self.target.job_dir.join(QUARANTINE_DIR).join(relative);
        let copied = destination
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::copy(&source, &destination));

        match copied {
            Ok(_) => {
                tracing::info!(key = %key, path = %destination.display(), "Quarantined original input");
                self.report.quarantined += 1;
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to quarantine original input");
            }
        }
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

/// Correlation keys come from the remote service; only plain relative paths
/// are allowed to touch the filesystem.
fn safe_relative_path(key: &str) -> Option<PathBuf> {
    let path = Path::new(key);
    let plain = path.components().all(|c| matches!(c, Component::Normal(_)));
    (plain && path.components().next().is_some()).then(|| path.to_path_buf())
}

/// Output path (relative to the job folder) for candidate `number` (1-based).
/// Single-candidate records keep the key as is; otherwise `_c<number>` goes
/// before the extension.
pub fn artifact_path(relative: &Path, number: usize, multiple: bool) -> PathBuf {
    if !multiple {
        return relative.to_path_buf();
    }

    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match relative.extension() {
        Some(ext) => format!("{stem}_c{number}.{}", ext.to_string_lossy()),
        None => format!("{stem}_c{number}"),
    };
    relative.with_file_name(name)
}

/// Best-effort explanation for a response with no usable content.
fn describe_empty_response(response: &GenerateResponse) -> String {
    let mut reasons = Vec::new();

    if response.candidates.is_empty() {
        reasons.push("no candidates returned".to_string());
    } else {
        reasons.push("no content parts returned".to_string());
    }

    for (i, candidate) in response.candidates.iter().enumerate() {
        if let Some(finish) = &candidate.finish_reason {
            reasons.push(format!("candidate {} finish reason: {finish}", i + 1));
        }
        if let Some(safety) = describe_safety(&candidate.safety_ratings) {
            reasons.push(format!("candidate {} safety: {safety}", i + 1));
        }
    }

    if let Some(feedback) = &response.prompt_feedback {
        if let Some(block) = &feedback.block_reason {
            reasons.push(format!("prompt blocked: {block}"));
        }
        if let Some(safety) = describe_safety(&feedback.safety_ratings) {
            reasons.push(format!("prompt safety: {safety}"));
        }
    }

    reasons.join("; ")
}

/// Blocked categories if any were blocked, otherwise every rating.
fn describe_safety(ratings: &[SafetyRating]) -> Option<String> {
    let format = |r: &SafetyRating| {
        let category = r
            .category
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        match &r.probability {
            Some(p) => format!("{category}={p}"),
            None => category,
        }
    };

    let blocked: Vec<String> = ratings
        .iter()
        .filter(|r| r.blocked == Some(true))
        .map(format)
        .collect();
    if !blocked.is_empty() {
        return Some(format!("blocked {}", blocked.join(", ")));
    }

    (!ratings.is_empty()).then(|| ratings.iter().map(format).collect::<Vec<_>>().join(", "))
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read result file: {0}")]
    Io(#[from] std::io::Error),
}
