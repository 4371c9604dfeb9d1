//! Schema of one line of a batch response document.
//!
//! Upstream casing is inconsistent (`inline_data` vs `inlineData`,
//! `finish_reason` vs `finishReason`, ...). Both spellings are folded into a
//! single field here so nothing downstream has to check for either.

use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Default, Deserialize)]
pub struct ResultLine {
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub error: Option<RecordError>,
    #[serde(default)]
    pub response: Option<GenerateResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RecordError {
    pub fn describe(&self) -> String {
        match (&self.message, self.code) {
            (Some(message), _) => message.clone(),
            (None, Some(code)) => format!("error code {code}"),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finishReason")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, alias = "safetyRatings")]
    pub safety_ratings: Vec<SafetyRating>,
}

impl Candidate {
    pub fn parts(&self) -> &[Part] {
        self.content.as_ref().map(|c| c.parts.as_slice()).unwrap_or_default()
    }

    /// Base64 payload of the first part carrying non-empty inline data.
    pub fn image_payload(&self) -> Option<&str> {
        self.parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .find(|data| !data.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "inlineData")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InlineData {
    #[serde(default, alias = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SafetyRating {
    #[serde(default)]
    pub category: Option<Label>,
    #[serde(default)]
    pub probability: Option<Label>,
    #[serde(default)]
    pub blocked: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptFeedback {
    #[serde(default, alias = "blockReason")]
    pub block_reason: Option<Label>,
    #[serde(default, alias = "safetyRatings")]
    pub safety_ratings: Vec<SafetyRating>,
}

/// Enum-valued field that may arrive as a name or as its numeric code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Code(i64),
    Name(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Code(code) => write!(f, "{code}"),
            Label::Name(name) => f.write_str(name),
        }
    }
}

/// Why generation stopped for a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Unspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
    Unknown(String),
}

impl FinishReason {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Unspecified,
            1 => Self::Stop,
            2 => Self::MaxTokens,
            3 => Self::Safety,
            4 => Self::Recitation,
            5 => Self::Other,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "FINISH_REASON_UNSPECIFIED" => Self::Unspecified,
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "OTHER" => Self::Other,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("unspecified"),
            Self::Stop => f.write_str("stop"),
            Self::MaxTokens => f.write_str("max tokens"),
            Self::Safety => f.write_str("safety"),
            Self::Recitation => f.write_str("recitation"),
            Self::Other => f.write_str("other"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Label::deserialize(deserializer)? {
            Label::Code(code) => Self::from_code(code),
            Label::Name(name) => Self::from_name(&name),
        })
    }
}
