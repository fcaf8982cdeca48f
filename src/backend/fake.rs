//! Scripted in-process backend for unit tests
//!
//! [`FakeBackend`] replays queued [`FakeReply`] values instead of talking to
//! a server, records every request it receives, and tracks how many ingest
//! calls overlap so tests can check that uploads never run in parallel.
//!
//! When a queue is empty the fake answers with a plain success.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::backend::{
    BackendResult, ChatResponse, IngestRequest, IngestResponse, KnowledgeBackend,
    ProgressSender, SubjectsResponse, TransferProgress, STATUS_SUCCESS,
};
use crate::error::NotemindError;

/// How the fake should answer one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeReply {
    /// `status: "success"`; the string is the chat answer (ignored elsewhere)
    Success(String),
    /// A response that arrived with some other `status`
    Status {
        status: String,
        detail: Option<String>,
    },
    /// An HTTP error status with an optional `detail` body
    HttpError { status: u16, detail: Option<String> },
    /// No response at all
    Transport(String),
    /// Never resolve
    Hang,
}

impl FakeReply {
    /// Successful reply without an answer
    pub fn ok() -> Self {
        Self::Success(String::new())
    }

    /// `{"status": "error", "detail": detail}`
    pub fn rejected(detail: &str) -> Self {
        Self::Status {
            status: "error".to_string(),
            detail: Some(detail.to_string()),
        }
    }

    async fn settle(self) -> BackendResult<(String, Option<String>, Option<String>)> {
        match self {
            Self::Success(answer) => Ok((STATUS_SUCCESS.to_string(), None, Some(answer))),
            Self::Status { status, detail } => Ok((status, detail, None)),
            Self::HttpError { status, detail } => Err(NotemindError::Application {
                detail,
                http_status: Some(status),
            }),
            Self::Transport(message) => Err(NotemindError::Transport(message)),
            Self::Hang => std::future::pending().await,
        }
    }
}

/// Scripted [`KnowledgeBackend`]
#[derive(Debug, Default)]
pub struct FakeBackend {
    subjects: Mutex<Vec<String>>,
    subjects_replies: Mutex<VecDeque<FakeReply>>,
    ingest_replies: Mutex<VecDeque<(Vec<u64>, FakeReply)>>,
    chat_replies: Mutex<VecDeque<FakeReply>>,
    ingested: Mutex<Vec<IngestRequest>>,
    queries: Mutex<Vec<(String, String)>>,
    subject_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subjects returned by a successful `list_subjects`
    pub fn set_subjects(&self, subjects: &[&str]) {
        *self.subjects.lock().unwrap() = subjects.iter().map(|s| s.to_string()).collect();
    }

    pub fn push_subjects_reply(&self, reply: FakeReply) {
        self.subjects_replies.lock().unwrap().push_back(reply);
    }

    /// Queue the next ingest reply, preceded by progress ticks in percent
    pub fn push_ingest(&self, progress_percent: &[u64], reply: FakeReply) {
        self.ingest_replies
            .lock()
            .unwrap()
            .push_back((progress_percent.to_vec(), reply));
    }

    pub fn push_chat(&self, reply: FakeReply) {
        self.chat_replies.lock().unwrap().push_back(reply);
    }

    /// Names of the files ingested so far, in call order
    pub fn ingested_files(&self) -> Vec<String> {
        self.ingested
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.file.name().to_string())
            .collect()
    }

    pub fn ingest_requests(&self) -> Vec<IngestRequest> {
        self.ingested.lock().unwrap().clone()
    }

    /// `(subject, query)` pairs received by `chat`
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn subject_calls(&self) -> usize {
        self.subject_calls.load(Ordering::SeqCst)
    }

    /// Highest number of ingest calls that were running at the same time
    pub fn max_concurrent_ingests(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeBackend for FakeBackend {
    async fn list_subjects(&self) -> BackendResult<SubjectsResponse> {
        self.subject_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.subjects_replies.lock().unwrap().pop_front();
        let (status, detail, _) = reply.unwrap_or_else(FakeReply::ok).settle().await?;
        let subjects = if status == STATUS_SUCCESS {
            self.subjects.lock().unwrap().clone()
        } else {
            Vec::new()
        };
        Ok(SubjectsResponse {
            status,
            subjects,
            detail,
        })
    }

    async fn ingest(
        &self,
        request: IngestRequest,
        progress: ProgressSender,
    ) -> BackendResult<IngestResponse> {
        let subject = request.subject.clone();
        self.ingested.lock().unwrap().push(request);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let (ticks, reply) = self
            .ingest_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| (Vec::new(), FakeReply::ok()));

        for percent in ticks {
            let _ = progress.send(TransferProgress {
                loaded: percent,
                total: 100,
            });
            tokio::task::yield_now().await;
        }

        let settled = reply.settle().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let (status, detail, _) = settled?;
        Ok(IngestResponse {
            status,
            subject: Some(subject),
            message: None,
            detail,
        })
    }

    async fn chat(&self, subject: &str, query: &str) -> BackendResult<ChatResponse> {
        self.queries
            .lock()
            .unwrap()
            .push((subject.to_string(), query.to_string()));
        tokio::task::yield_now().await;

        let reply = self.chat_replies.lock().unwrap().pop_front();
        let (status, detail, answer) = reply.unwrap_or_else(FakeReply::ok).settle().await?;
        Ok(ChatResponse {
            status,
            answer,
            detail,
        })
    }
}
