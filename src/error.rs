//! Error types for NoteMind
//!
//! This module defines the error taxonomy used throughout the client,
//! using `thiserror` for ergonomic error handling.
//!
//! Three families matter to the core:
//!
//! - [`ValidationError`]: required local input is missing. Detected before
//!   any network call and never reported as a network failure.
//! - [`NotemindError::Transport`]: the request never produced a response.
//! - [`NotemindError::Application`]: a response arrived but signalled failure,
//!   either through an HTTP error status or a `status` field other than
//!   `"success"`.

use thiserror::Error;

/// Missing or conflicting local input, detected before any request is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The upload batch contained no files
    #[error("Please select files to upload")]
    MissingFiles,

    /// The upload subject label was empty or whitespace
    #[error("Please enter a subject name")]
    MissingSubject,

    /// A chat message was sent before a topic was chosen
    #[error("Please select a subject first")]
    NoTopicSelected,

    /// The chat message was empty or whitespace
    #[error("Please enter a message")]
    EmptyMessage,

    /// A chat message was sent while another one is still awaiting its answer
    #[error("Please wait for the current response before sending another message")]
    RequestInFlight,
}

/// Main error type for NoteMind operations
#[derive(Error, Debug)]
pub enum NotemindError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local input validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The request failed without producing a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but reported a failure
    #[error("{}", application_message(.detail, .http_status))]
    Application {
        /// Server-supplied explanation, when the body carried one
        detail: Option<String>,
        /// HTTP status code, when the failure was signalled at the HTTP level
        http_status: Option<u16>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors outside of a request (e.g. client construction)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn application_message(detail: &Option<String>, http_status: &Option<u16>) -> String {
    match (detail.as_deref(), http_status) {
        (Some(detail), _) => detail.to_string(),
        (None, Some(status)) => format!("Server returned HTTP {}", status),
        (None, None) => "Server reported an unsuccessful response".to_string(),
    }
}

impl NotemindError {
    /// Server-supplied detail text, if the failure carried one
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Application { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Returns true when the failure happened before any response arrived
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_) | Self::Http(_))
    }

    /// Best available user-facing text for this failure
    ///
    /// Prefers the server `detail`, then the error's own message, and only
    /// falls back to `generic` when neither says anything useful.
    ///
    /// # Examples
    ///
    /// ```
    /// use notemind::error::NotemindError;
    ///
    /// let err = NotemindError::Application {
    ///     detail: Some("too large".to_string()),
    ///     http_status: None,
    /// };
    /// assert_eq!(err.user_message("Upload failed"), "too large");
    ///
    /// let err = NotemindError::Application { detail: None, http_status: None };
    /// assert_eq!(err.user_message("Upload failed"), "Upload failed");
    /// ```
    pub fn user_message(&self, generic: &str) -> String {
        if let Some(detail) = self.detail().filter(|d| !d.trim().is_empty()) {
            return detail.to_string();
        }
        match self {
            Self::Application {
                http_status: Some(_),
                ..
            } => self.to_string(),
            Self::Application { .. } => generic.to_string(),
            Self::Transport(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for NoteMind operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation in the
/// configuration and command layers.
pub type Result<T> = anyhow::Result<T>;
