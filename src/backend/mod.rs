//! Knowledge service backend abstraction
//!
//! This module defines the [`KnowledgeBackend`] trait, the seam between the
//! client core and the remote ingestion / question-answering service.
//! Concrete implementations live in submodules:
//!
//! - [`http::HttpBackend`]: multipart HTTP client built on `reqwest`.
//! - `fake::FakeBackend`: scripted in-process fake used in unit tests
//!   (cfg(test) only).
//!
//! # Design
//!
//! Backends report two things separately. A request that never produced a
//! response, or that came back with an HTTP error status, is an `Err`. A
//! response that arrived is returned as-is, including its `status` field,
//! and the caller decides what a non-`"success"` status means with
//! [`ensure_success`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::error::NotemindError;

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpBackend;

/// Result type for backend calls; keeps the typed error for classification
pub type BackendResult<T> = std::result::Result<T, NotemindError>;

/// `status` value the service uses for a successful response
pub const STATUS_SUCCESS: &str = "success";

/// A local document selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    path: PathBuf,
    name: String,
}

impl UploadFile {
    /// Create a handle for a file on disk
    ///
    /// # Examples
    ///
    /// ```
    /// use notemind::backend::UploadFile;
    ///
    /// let file = UploadFile::new("notes/lecture-01.PDF");
    /// assert_eq!(file.name(), "lecture-01.PDF");
    /// assert_eq!(file.extension().as_deref(), Some("pdf"));
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent to the service
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Returns true if the extension is one of `accepted` (case-insensitive)
    pub fn has_accepted_extension(&self, accepted: &[String]) -> bool {
        self.extension()
            .map(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false)
    }
}

/// One per-file ingestion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub file: UploadFile,
    pub subject: String,
    pub handwritten: bool,
}

/// Upload progress as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes handed to the transport so far
    pub loaded: u64,
    /// Total bytes of the request body; 0 when unknown
    pub total: u64,
}

impl TransferProgress {
    /// Fraction of the transfer completed, clamped to `[0, 1]`
    ///
    /// An unknown total counts as one byte, like a browser upload event.
    ///
    /// # Examples
    ///
    /// ```
    /// use notemind::backend::TransferProgress;
    ///
    /// assert_eq!(TransferProgress { loaded: 50, total: 200 }.fraction(), 0.25);
    /// assert_eq!(TransferProgress { loaded: 0, total: 0 }.fraction(), 0.0);
    /// assert_eq!(TransferProgress { loaded: 7, total: 0 }.fraction(), 1.0);
    /// ```
    pub fn fraction(&self) -> f64 {
        let total = self.total.max(1) as f64;
        (self.loaded as f64 / total).clamp(0.0, 1.0)
    }
}

/// Channel on which a backend reports [`TransferProgress`] ticks
pub type ProgressSender = mpsc::UnboundedSender<TransferProgress>;

/// Common shape of every service response
pub trait StatusEnvelope {
    fn status(&self) -> &str;
    fn detail(&self) -> Option<&str>;

    fn is_success(&self) -> bool {
        self.status() == STATUS_SUCCESS
    }
}

/// Response from `GET /subjects`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectsResponse {
    pub status: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Response from `POST /ingest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    #[serde(default)]
    pub subject: Option<String>,
    /// Server summary of what was ingested
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Response from `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub status: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

macro_rules! impl_status_envelope {
    ($($ty:ty),+) => {
        $(impl StatusEnvelope for $ty {
            fn status(&self) -> &str {
                &self.status
            }

            fn detail(&self) -> Option<&str> {
                self.detail.as_deref()
            }
        })+
    };
}

impl_status_envelope!(SubjectsResponse, IngestResponse, ChatResponse);

/// Turn a response whose `status` is not `"success"` into an application error
///
/// # Examples
///
/// ```
/// use notemind::backend::{ensure_success, IngestResponse};
///
/// let rejected = IngestResponse {
///     status: "error".to_string(),
///     subject: None,
///     message: None,
///     detail: Some("too large".to_string()),
/// };
/// let err = ensure_success(rejected).unwrap_err();
/// assert_eq!(err.detail(), Some("too large"));
/// ```
pub fn ensure_success<T: StatusEnvelope>(response: T) -> BackendResult<T> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(NotemindError::Application {
            detail: response.detail().map(str::to_string),
            http_status: None,
        })
    }
}

/// Client-side view of the knowledge service
///
/// Implementations must not retry and must not check the `status` field of a
/// response that arrived; both decisions belong to the caller.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    /// List the subjects that have ingested documents
    async fn list_subjects(&self) -> BackendResult<SubjectsResponse>;

    /// Upload one document, reporting progress ticks on `progress`
    ///
    /// Progress may be reported zero or more times before the call resolves.
    async fn ingest(
        &self,
        request: IngestRequest,
        progress: ProgressSender,
    ) -> BackendResult<IngestResponse>;

    /// Ask a question scoped to `subject`
    async fn chat(&self, subject: &str, query: &str) -> BackendResult<ChatResponse>;
}
