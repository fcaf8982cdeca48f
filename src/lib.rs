//! NoteMind - study notes knowledge base client library
//!
//! This library provides the client core for NoteMind: uploading documents
//! into subjects, asking questions about them, and surfacing the outcome of
//! every operation as short-lived notifications.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `notifications`: Time-limited notification store with change listeners
//! - `upload`: Sequential multi-file upload with aggregate progress
//! - `chat`: Subject-scoped chat session and its message history
//! - `subjects`: Cached list of subjects known to the server
//! - `backend`: Knowledge service abstraction and its HTTP implementation
//! - `render`: Terminal rendering of notifications
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use notemind::{ChatSession, Config, HttpBackend, NotificationBus};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let backend = Arc::new(HttpBackend::new(&config.api, &config.upload)?);
//!     let mut session = ChatSession::new(backend, NotificationBus::new());
//!     session.select_topic("Physics");
//!     session.send("What is angular momentum?").await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notifications;
pub mod render;
pub mod subjects;
pub mod upload;

// Re-export commonly used types
pub use backend::{HttpBackend, KnowledgeBackend, UploadFile};
pub use chat::{ChatSession, SendOutcome};
pub use config::Config;
pub use error::{NotemindError, Result, ValidationError};
pub use notifications::{Notification, NotificationBus, NotificationSpec, Severity};
pub use subjects::SubjectDirectory;
pub use upload::{UploadOrchestrator, UploadOutcome, UploadState};
