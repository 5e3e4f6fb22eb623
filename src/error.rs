//! Error types for the watermark-eraser crate.

use crate::file::ValidationError;

/// A typed failure reported by one of the collaborators.
///
/// Each call site maps transport, HTTP status and save failures into one of
/// these variants, so callers never need to inspect message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// No signed-in session was available when the call was about to be made.
    #[error("no authenticated session")]
    SessionMissing,

    /// The collaborator rejected the credentials (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// The credentials are valid but lack permission (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Too many requests (HTTP 429).
    #[error("rate limited")]
    RateLimited,

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The save target could not store the downloaded file.
    #[error("could not save file: {0}")]
    Save(String),
}

impl ServiceError {
    /// Classify an HTTP status code into a typed error.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            429 => Self::RateLimited,
            _ => Self::Status {
                status,
                message: message.into(),
            },
        }
    }
}

/// Errors that can occur while running the upload workflow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The selected file was rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Processing was attempted without a signed-in user.
    #[error("you must be signed in to remove watermarks")]
    AuthRequired,

    /// Persisting the original image in object storage failed.
    #[error("upload failed: {0}")]
    Upload(#[source] ServiceError),

    /// The AI image-modification call failed.
    #[error("watermark removal request failed: {0}")]
    Transform(#[source] ServiceError),

    /// The AI service answered without a usable image URL.
    #[error("invalid response from AI service: {0}")]
    InvalidResponse(String),

    /// Fetching or saving the processed image failed.
    #[error("download failed: {0}")]
    Download(#[source] ServiceError),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fallback for failures that fit no other category.
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl Error {
    /// Short title for the notification surfacing this error.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid file",
            Self::AuthRequired => "Sign in required",
            Self::Upload(_) => "Upload failed",
            Self::Transform(_) | Self::InvalidResponse(_) => "Processing failed",
            Self::Download(_) => "Download failed",
            Self::Config(_) => "Configuration error",
            Self::Io(_) | Self::Unknown(_) => "Something went wrong",
        }
    }

    /// Human-readable message for the user, refined by the typed cause.
    #[must_use]
    pub fn user_message(&self) -> String {
        let service = match self {
            Self::Upload(e) | Self::Transform(e) | Self::Download(e) => Some(e),
            _ => None,
        };

        match service {
            Some(ServiceError::SessionMissing) => {
                "Please sign in before processing images.".to_string()
            }
            Some(ServiceError::Unauthorized) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Some(ServiceError::Forbidden) => {
                "Your account is not allowed to use this service.".to_string()
            }
            Some(ServiceError::RateLimited) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Some(ServiceError::Transport(_)) => {
                "Network error. Check your connection and try again.".to_string()
            }
            Some(ServiceError::Save(reason)) => format!("Could not save the file: {reason}"),
            _ => self.to_string(),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
