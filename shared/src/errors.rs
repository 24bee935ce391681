/// Error taxonomy shared by the Tubegrab client and its front-ends.
use thiserror::Error;

/// Banner text for a metadata failure the backend did not describe.
pub const GENERIC_INFO_ERROR: &str = "Failed to fetch video info";

/// Banner text for a download failure the backend did not describe.
pub const GENERIC_DOWNLOAD_ERROR: &str = "Download failed";

/// Banner text for transport and decode failures.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Input problems caught before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty url")]
    EmptyUrl,

    #[error("invalid url")]
    InvalidUrl,

    #[error("no format selected")]
    NoFormatSelected,
}

impl ValidationError {
    /// Text shown to the user, who is expected to fix the input.
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::EmptyUrl => "Please enter a YouTube URL",
            ValidationError::InvalidUrl => "Please enter a valid YouTube URL",
            ValidationError::NoFormatSelected => "Please select a format to download",
        }
    }
}

/// User-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user must fix the input.
    Validation,
    /// Transport or decode failure; retrying may help.
    Network,
    /// The backend reported a failure.
    Server,
    /// The received file could not be written locally.
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Server => write!(f, "server"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Top-level error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) | ClientError::Config(_) => ErrorKind::Validation,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Server(_) | ClientError::Download(_) => ErrorKind::Server,
            ClientError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message for the error banner. Backend messages pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(v) => v.user_message().to_string(),
            ClientError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ClientError::Server(msg) if msg.is_empty() => GENERIC_INFO_ERROR.to_string(),
            ClientError::Server(msg) => msg.clone(),
            ClientError::Download(msg) if msg.is_empty() => GENERIC_DOWNLOAD_ERROR.to_string(),
            ClientError::Download(msg) => msg.clone(),
            ClientError::Storage(msg) => format!("Could not save file: {}", msg),
            ClientError::Config(msg) => msg.clone(),
        }
    }

    /// Whether re-triggering the same action may succeed without changes.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Storage(_))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::EmptyUrl.to_string(), "empty url");
        assert_eq!(ValidationError::InvalidUrl.to_string(), "invalid url");
        assert_eq!(ValidationError::NoFormatSelected.to_string(), "no format selected");
        assert_eq!(
            ClientError::from(ValidationError::InvalidUrl).user_message(),
            "Please enter a valid YouTube URL"
        );
    }

    #[test]
    fn test_server_message_passthrough() {
        let err = ClientError::Server("private video".into());
        assert_eq!(err.user_message(), "private video");
        assert_eq!(err.kind(), ErrorKind::Server);
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_generic_fallbacks() {
        assert_eq!(ClientError::Server(String::new()).user_message(), GENERIC_INFO_ERROR);
        assert_eq!(ClientError::Download(String::new()).user_message(), GENERIC_DOWNLOAD_ERROR);
        assert_eq!(ClientError::Network("reset".into()).user_message(), NETWORK_ERROR_MESSAGE);
    }

    #[test]
    fn test_download_maps_to_server_kind() {
        assert_eq!(ClientError::Download("gone".into()).kind(), ErrorKind::Server);
        assert!(ClientError::Network("timeout".into()).is_retriable());
    }
}
