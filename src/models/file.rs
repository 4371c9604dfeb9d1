use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use strum::{Display, EnumString};

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    #[strum(serialize = "STATE_UNSPECIFIED")]
    Unspecified,
    Processing,
    Active,
    Failed,
}

/// File resource as returned by the files endpoints. Every field the service
/// may leave out is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default, deserialize_with = "lenient_state")]
    pub state: FileState,
}

impl RemoteFile {
    /// Handle usable in a request line, available once the file is active.
    pub fn handle(&self) -> Option<RemoteHandle> {
        if self.state != FileState::Active {
            return None;
        }
        Some(RemoteHandle {
            uri: self.uri.clone()?,
            mime_type: self
                .mime_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }
}

/// Stable reference to an uploaded input, consumed by the request builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHandle {
    pub uri: String,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct FileEnvelopeWire {
    pub file: RemoteFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListWire {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

// int64 fields arrive as JSON strings
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        _ => None,
    })
}

fn lenient_state<'de, D>(deserializer: D) -> Result<FileState, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .and_then(|s| FileState::from_str(&s).ok())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_resource_parses() {
        let raw = r#"{
            "name": "files/abc",
            "displayName": "a.png",
            "mimeType": "image/png",
            "sizeBytes": "2048",
            "expirationTime": "2025-11-04T10:00:00Z",
            "uri": "https://example.test/v1beta/files/abc",
            "state": "ACTIVE"
        }"#;
        let file: RemoteFile = serde_json::from_str(raw).unwrap();

        assert_eq!(file.size_bytes, Some(2048));
        assert_eq!(file.state, FileState::Active);
        let handle = file.handle().unwrap();
        assert_eq!(handle.mime_type, "image/png");
        assert_eq!(handle.uri, "https://example.test/v1beta/files/abc");
    }

    #[test]
    fn test_processing_file_has_no_handle() {
        let raw = r#"{"name": "files/abc", "uri": "u", "state": "PROCESSING"}"#;
        let file: RemoteFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.state, FileState::Processing);
        assert!(file.handle().is_none());
    }

    #[test]
    fn test_unknown_or_missing_state() {
        let file: RemoteFile = serde_json::from_str(r#"{"name": "files/x"}"#).unwrap();
        assert_eq!(file.state, FileState::Unspecified);
        let file: RemoteFile =
            serde_json::from_str(r#"{"name": "files/x", "state": "ARCHIVED"}"#).unwrap();
        assert_eq!(file.state, FileState::Unspecified);
    }
}
