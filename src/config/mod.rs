use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Instruction sent with every image unless `PROMPT` overrides it.
pub const DEFAULT_PROMPT: &str = concat!(
    "Perform a deep color-correction on this underwater image. ",
    "Apply aggressive color recovery to restore the warm reddish and orange spectrums lost to water depth, ",
    "specifically neutralizing the dominant cyan/green cast. ",
    "The seabed (only where present) must be corrected to a natural, earthy brown 'dirt' color. ",
    "Remove all volumetric haze to make the water appear crystal-clear, ",
    "but strictly maintain the original background scenery and environment. ",
    "Do not alter, add, or remove any objects or structural elements in the foreground or background. ",
    "Ensure 1:1 compositional integrity while sharpening details and removing low-light noise. ",
    "The result should look like a professional photograph captured with high-powered red-spectrum strobe lighting."
);

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Gemini API key
    pub gemini_api_key: String,

    /// API root, overridable for tests and proxies
    #[serde(default = "default_base_url")]
    pub gemini_base_url: String,

    /// Image model used for every request line and the batch itself
    #[serde(default = "default_model")]
    pub model: String,

    /// Folder scanned for input images
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Root of the per-job output folders
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where in-flight result files are staged. Defaults to `output_dir`.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Crash-recovery marker naming the live temp file
    #[serde(default = "default_marker_path")]
    pub recovery_marker_path: PathBuf,

    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    #[serde(default = "default_upload_poll_interval_ms")]
    pub upload_poll_interval_ms: u64,

    #[serde(default = "default_upload_max_polls")]
    pub upload_max_polls: u32,

    /// Overall timeout for a single result download
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Write buffer size for result downloads (bounds peak memory)
    #[serde(default = "default_download_chunk_bytes")]
    pub download_chunk_bytes: usize,

    #[serde(default)]
    pub prompt: Option<String>,

    /// Emit logs as JSON lines instead of the human formatter
    #[serde(default)]
    pub log_json: bool,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "models/gemini-3-pro-image-preview".to_string()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input_images")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated_images")
}

fn default_marker_path() -> PathBuf {
    PathBuf::from(".download_in_progress")
}

fn default_upload_concurrency() -> usize {
    10
}

fn default_upload_poll_interval_ms() -> u64 {
    1000
}

fn default_upload_max_polls() -> u32 {
    300
}

fn default_download_timeout_secs() -> u64 {
    3600
}

fn default_download_chunk_bytes() -> usize {
    1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.clone())
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
    }

    pub fn upload_poll_interval(&self) -> Duration {
        Duration::from_millis(self.upload_poll_interval_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
