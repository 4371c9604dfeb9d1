use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::file::RemoteHandle;

/// Output resolution requested from the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    #[strum(serialize = "1K")]
    OneK,
    #[serde(rename = "2K")]
    #[strum(serialize = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    #[strum(serialize = "4K")]
    FourK,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: ImageSize,
}

/// Generation parameters shared by every line of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationConfig {
    #[garde(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    #[garde(range(min = 1, max = 4))]
    pub candidate_count: u8,

    #[garde(skip)]
    pub image_config: ImageConfig,
}

impl GenerationConfig {
    pub fn new(candidate_count: u8, image_size: ImageSize) -> Self {
        Self {
            temperature: 0.0,
            candidate_count,
            image_config: ImageConfig {
                aspect_ratio: "1:1".to_string(),
                image_size,
            },
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(1, ImageSize::OneK)
    }
}

/// Fixed part of every request line.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub model: String,
    pub instruction: String,
    pub generation_config: GenerationConfig,
}

/// One input ready to be submitted: the correlation key and the uploaded
/// file it points at.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub correlation_key: String,
    pub handle: RemoteHandle,
}

/// One line of the request document.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLine {
    pub custom_id: String,
    pub request: GenerateRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: Vec<RequestContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Text { text: String },
    File { file_data: FileData },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileData {
    pub file_uri: String,
    pub mime_type: String,
}
