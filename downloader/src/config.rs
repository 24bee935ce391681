/// Client configuration loaded from the environment (and `.env`).
use std::path::PathBuf;
use std::time::Duration;

use tubegrab_shared::errors::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_FALLBACK_FILENAME: &str = "video.mp4";

/// How the `/download` response body is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    /// Read chunk by chunk, reporting progress after each one.
    Streamed,
    /// Read the whole body at once; no intermediate progress.
    Buffered,
}

impl BodyStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "streamed" | "stream" => Some(BodyStrategy::Streamed),
            "buffered" | "buffer" => Some(BodyStrategy::Buffered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// Directory the save-as action writes into.
    pub download_dir: PathBuf,
    /// Connect plus wait for response headers. Never bounds a body that is still arriving.
    pub request_timeout: Duration,
    /// Longest silence allowed between two body chunks.
    pub chunk_timeout: Duration,
    pub error_dismiss: Duration,
    pub progress_hide: Duration,
    pub fallback_filename: String,
    pub body_strategy: BodyStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir: PathBuf::from("./downloads"),
            request_timeout: Duration::from_secs(300),
            chunk_timeout: Duration::from_secs(45),
            error_dismiss: Duration::from_secs(5),
            progress_hide: Duration::from_secs(3),
            fallback_filename: DEFAULT_FALLBACK_FILENAME.to_string(),
            body_strategy: BodyStrategy::Streamed,
        }
    }
}

impl ClientConfig {
    /// Read `TUBEGRAB_*` variables, falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let config = Self {
            base_url: lookup("TUBEGRAB_BASE_URL").unwrap_or(defaults.base_url),
            download_dir: lookup("TUBEGRAB_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            request_timeout: secs("TUBEGRAB_TIMEOUT_SECS", defaults.request_timeout),
            chunk_timeout: secs("TUBEGRAB_CHUNK_TIMEOUT_SECS", defaults.chunk_timeout),
            error_dismiss: secs("TUBEGRAB_ERROR_DISMISS_SECS", defaults.error_dismiss),
            progress_hide: secs("TUBEGRAB_PROGRESS_HIDE_SECS", defaults.progress_hide),
            fallback_filename: lookup("TUBEGRAB_FALLBACK_FILENAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.fallback_filename),
            body_strategy: lookup("TUBEGRAB_BODY_STRATEGY")
                .and_then(|v| BodyStrategy::from_name(&v))
                .unwrap_or(defaults.body_strategy),
        };

        let base_url = config.base_url.clone();
        config.with_base_url(base_url)
    }

    /// Set and check the backend origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "Base URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }
        self.base_url = base_url;
        Ok(self)
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_body_strategy(mut self, strategy: BodyStrategy) -> Self {
        self.body_strategy = strategy;
        self
    }

    pub fn with_request_timeout(mut self, after: Duration) -> Self {
        self.request_timeout = after;
        self
    }

    pub fn with_chunk_timeout(mut self, after: Duration) -> Self {
        self.chunk_timeout = after;
        self
    }

    pub fn with_error_dismiss(mut self, after: Duration) -> Self {
        self.error_dismiss = after;
        self
    }

    pub fn with_progress_hide(mut self, after: Duration) -> Self {
        self.progress_hide = after;
        self
    }

    /// Absolute endpoint URL for a backend path such as `/get_info`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
