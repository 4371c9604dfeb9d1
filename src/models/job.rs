use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Lifecycle state of a batch job as reported by the remote service.
///
/// The service has used both `JOB_STATE_*` and `BATCH_STATE_*` spellings;
/// either parses, and the `JOB_STATE_*` form is what gets displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum JobState {
    #[strum(to_string = "JOB_STATE_UNSPECIFIED", serialize = "BATCH_STATE_UNSPECIFIED")]
    Unspecified,
    #[strum(to_string = "JOB_STATE_PENDING", serialize = "BATCH_STATE_PENDING")]
    Pending,
    #[strum(to_string = "JOB_STATE_QUEUED", serialize = "BATCH_STATE_QUEUED")]
    Queued,
    #[strum(to_string = "JOB_STATE_RUNNING", serialize = "BATCH_STATE_RUNNING")]
    Running,
    #[strum(to_string = "JOB_STATE_UPDATING", serialize = "BATCH_STATE_UPDATING")]
    Updating,
    #[strum(to_string = "JOB_STATE_PAUSED", serialize = "BATCH_STATE_PAUSED")]
    Paused,
    #[strum(to_string = "JOB_STATE_CANCELLING", serialize = "BATCH_STATE_CANCELLING")]
    Cancelling,
    #[strum(to_string = "JOB_STATE_SUCCEEDED", serialize = "BATCH_STATE_SUCCEEDED")]
    Succeeded,
    #[strum(
        to_string = "JOB_STATE_PARTIALLY_SUCCEEDED",
        serialize = "BATCH_STATE_PARTIALLY_SUCCEEDED"
    )]
    PartiallySucceeded,
    #[strum(to_string = "JOB_STATE_FAILED", serialize = "BATCH_STATE_FAILED")]
    Failed,
    #[strum(to_string = "JOB_STATE_CANCELLED", serialize = "BATCH_STATE_CANCELLED")]
    Cancelled,
    #[strum(to_string = "JOB_STATE_EXPIRED", serialize = "BATCH_STATE_EXPIRED")]
    Expired,
}

impl JobState {
    /// Lenient parse: anything unrecognised is `Unspecified`.
    pub fn parse(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or(Self::Unspecified)
    }

    /// Non-terminal states. Paused, updating and cancelling jobs can still
    /// change, so they count as active.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Queued
                | Self::Running
                | Self::Updating
                | Self::Paused
                | Self::Cancelling
        )
    }
}

/// A batch job as observed locally. Read-only: only the remote service
/// moves a job between states.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Full resource name, e.g. `batches/abc123`
    pub name: String,
    pub display_name: Option<String>,
    pub state: JobState,
    pub create_time: Option<DateTime<Utc>>,
    /// Name of the response file once the job has produced one
    pub result_file: Option<String>,
    pub error: Option<String>,
}

impl BatchJob {
    /// Last path segment of the resource name (`batches/abc123` -> `abc123`).
    pub fn short_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Whether `target` names this job by full id, short id or display name.
    pub fn matches_target(&self, target: &str) -> bool {
        if self.name == target || self.name.ends_with(&format!("/{target}")) {
            return true;
        }
        self.display_name.as_deref() == Some(target)
    }
}

/// Long-running operation envelope returned by the batches endpoints.
#[derive(Debug, Deserialize)]
pub struct BatchOperationWire {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<BatchMetadataWire>,
    #[serde(default)]
    pub response: Option<BatchOutputWire>,
    #[serde(default)]
    pub error: Option<StatusWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadataWire {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub output: Option<BatchOutputWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutputWire {
    #[serde(default)]
    pub responses_file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusWire {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchListWire {
    #[serde(default)]
    pub operations: Vec<BatchOperationWire>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl From<BatchOperationWire> for BatchJob {
    fn from(op: BatchOperationWire) -> Self {
        let metadata = op.metadata;
        let state = metadata
            .as_ref()
            .and_then(|m| m.state.as_deref())
            .map(JobState::parse)
            .unwrap_or(JobState::Unspecified);
        let result_file = metadata
            .as_ref()
            .and_then(|m| m.output.as_ref())
            .and_then(|o| o.responses_file.clone())
            .or_else(|| op.response.and_then(|r| r.responses_file));
        let error = op.error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{message} (code {code})"),
            (None, Some(message)) => message,
            (Some(code), None) => format!("code {code}"),
            (None, None) => "unknown error".to_string(),
        });

        let (display_name, create_time) = match metadata {
            Some(m) => (m.display_name.filter(|d| !d.is_empty()), m.create_time),
            None => (None, None),
        };

        Self {
            name: op.name,
            display_name,
            state,
            create_time,
            result_file,
            error,
        }
    }
}
