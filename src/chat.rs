//! Subject-scoped chat session
//!
//! A [`ChatSession`] owns the conversation shown to the user. Each exchange
//! moves through `Idle -> Pending -> Idle`: the user's message is appended as
//! soon as it is sent, and exactly one assistant message (the answer or a
//! fixed fallback) is appended when the request settles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::backend::{ensure_success, BackendResult, KnowledgeBackend};
use crate::config::FALLBACK_MESSAGE;
use crate::error::{NotemindError, ValidationError};
use crate::notifications::{NotificationBus, NotificationSpec, COPY_CONFIRMATION_TTL};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "you"),
            Self::Assistant => write!(f, "notemind"),
        }
    }
}

/// Stable, time-ordered message identifier (UUIDv7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageId(Uuid);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Where the session is in its current exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    /// A request for `user_message` has been issued and not yet settled
    Pending { user_message: MessageId },
}

/// Result of one [`ChatSession::send`] call
#[derive(Debug)]
pub enum SendOutcome {
    /// The service answered; `reply` is the assistant message
    Answered { reply: MessageId },
    /// The exchange failed and the fallback message was appended
    Failed {
        reply: MessageId,
        error: NotemindError,
    },
    /// Input was refused locally; history is unchanged
    Rejected(ValidationError),
}

impl SendOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// Conversation with the knowledge service about one subject at a time
pub struct ChatSession {
    backend: Arc<dyn KnowledgeBackend>,
    bus: NotificationBus,
    topic: String,
    history: Vec<ChatMessage>,
    state: ExchangeState,
    fallback_message: String,
    copy_ttl: Duration,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("topic", &self.topic)
            .field("history", &self.history.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Create a session with no topic and an empty history
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use notemind::backend::HttpBackend;
    /// use notemind::chat::ChatSession;
    /// use notemind::config::Config;
    /// use notemind::notifications::NotificationBus;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> notemind::error::Result<()> {
    /// let config = Config::default();
    /// let backend = Arc::new(HttpBackend::new(&config.api, &config.upload)?);
    /// let mut session = ChatSession::new(backend, NotificationBus::new());
    ///
    /// session.select_topic("Physics");
    /// let outcome = session.send("What is inertia?").await;
    /// assert!(outcome.is_answered());
    /// assert_eq!(session.history().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(backend: Arc<dyn KnowledgeBackend>, bus: NotificationBus) -> Self {
        Self {
            backend,
            bus,
            topic: String::new(),
            history: Vec::new(),
            state: ExchangeState::Idle,
            fallback_message: FALLBACK_MESSAGE.to_string(),
            copy_ttl: COPY_CONFIRMATION_TTL,
        }
    }

    /// Text appended in place of an answer when an exchange fails
    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    /// Lifetime of the "Copied!" confirmation
    pub fn with_copy_ttl(mut self, ttl: Duration) -> Self {
        self.copy_ttl = ttl;
        self
    }

    /// Currently selected subject; empty when none is selected
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Switch subjects. History is kept.
    pub fn select_topic(&mut self, topic: &str) {
        let topic = topic.trim();
        if topic != self.topic {
            tracing::info!("Chat subject set to '{}'", topic);
            self.topic = topic.to_string();
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ExchangeState::Pending { .. })
    }

    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.history.iter().find(|m| m.id == id)
    }

    /// Send one message and wait for the exchange to settle
    ///
    /// Refuses, without touching history, when a request is already pending,
    /// no topic is selected, or `text` is blank. Otherwise the user's message
    /// is appended immediately and exactly one assistant message follows.
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        let query = text.trim();
        if let Err(reason) = self.validate(query) {
            tracing::warn!("Chat message rejected: {}", reason);
            self.bus.notify(NotificationSpec::warning(
                "Missing Information",
                reason.to_string(),
            ));
            return SendOutcome::Rejected(reason);
        }

        let user_message = self.append(Role::User, query.to_string());
        self.state = ExchangeState::Pending { user_message };
        tracing::debug!("Asking '{}' ({} chars)", self.topic, query.len());

        let backend = Arc::clone(&self.backend);
        let result = backend
            .chat(&self.topic, query)
            .await
            .and_then(ensure_success)
            .and_then(|response| {
                response.answer.ok_or(NotemindError::Application {
                    detail: response.detail,
                    http_status: None,
                })
            });

        self.settle(result)
    }

    fn validate(&self, query: &str) -> Result<(), ValidationError> {
        if self.is_pending() {
            return Err(ValidationError::RequestInFlight);
        }
        if self.topic.is_empty() {
            return Err(ValidationError::NoTopicSelected);
        }
        if query.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }

    /// Close the pending exchange with its result
    fn settle(&mut self, result: BackendResult<String>) -> SendOutcome {
        let outcome = match result {
            Ok(answer) => {
                let reply = self.append(Role::Assistant, answer);
                tracing::debug!("Received answer {}", reply);
                SendOutcome::Answered { reply }
            }
            Err(error) => {
                tracing::error!("Chat request for '{}' failed: {}", self.topic, error);
                self.bus.notify(NotificationSpec::error(
                    "Chat Error",
                    error.user_message("Failed to get response"),
                ));
                let reply = self.append(Role::Assistant, self.fallback_message.clone());
                SendOutcome::Failed { reply, error }
            }
        };
        self.state = ExchangeState::Idle;
        outcome
    }

    fn append(&mut self, role: Role, text: String) -> MessageId {
        let id = MessageId(Uuid::now_v7());
        self.history.push(ChatMessage {
            id,
            role,
            text,
            created_at: Utc::now(),
        });
        id
    }

    /// Drop the whole conversation
    pub fn clear(&mut self) {
        let removed = self.history.len();
        self.history.clear();
        tracing::info!("Cleared {} chat message(s)", removed);
        self.bus.notify(NotificationSpec::success(
            "Chat Cleared",
            "Conversation history has been cleared",
        ));
    }

    /// Return the raw text of message `id` and confirm the copy
    pub fn copy_message(&self, id: MessageId) -> Option<String> {
        match self.message(id) {
            Some(message) => {
                self.bus.notify(
                    NotificationSpec::new()
                        .title("Copied!")
                        .body("Message copied")
                        .ttl(self.copy_ttl),
                );
                Some(message.text.clone())
            }
            None => {
                tracing::warn!("Cannot copy unknown message {}", id);
                self.bus
                    .notify(NotificationSpec::error("Copy Failed", "Message not found"));
                None
            }
        }
    }
}
