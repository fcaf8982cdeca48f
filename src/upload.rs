//! Multi-file upload orchestration
//!
//! [`UploadOrchestrator`] pushes a batch of documents into one subject of the
//! knowledge base. Files go up strictly one at a time, in the order given:
//! file `i + 1` never starts before file `i` has settled. The first failure
//! stops the batch.
//!
//! While a batch runs, the orchestrator keeps an aggregate percentage for the
//! whole batch. For file `i` of `n` at fraction `p` of its own transfer:
//!
//! ```text
//! aggregate = floor(((i + p) / n) * 100)
//! ```
//!
//! The value never goes down and only reaches 100 once the batch succeeds.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::backend::{
    ensure_success, BackendResult, IngestRequest, IngestResponse, KnowledgeBackend, UploadFile,
};
use crate::error::{NotemindError, ValidationError};
use crate::notifications::{NotificationBus, NotificationSpec};

/// Callback fired after a batch succeeds, so subject listings can refresh
pub type SubjectsChangedHook = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum UploadState {
    #[default]
    Idle,
    InProgress,
    Succeeded,
    Failed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InProgress => write!(f, "uploading"),
            Self::Succeeded => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The batch currently owned by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadBatch {
    /// Files in transfer order, fixed when the batch starts
    pub files: Vec<UploadFile>,
    /// Trimmed subject applied to every file
    pub subject_label: String,
    pub handwritten: bool,
    pub state: UploadState,
    /// File being transferred; `None` outside [`UploadState::InProgress`]
    pub current_index: Option<usize>,
    /// Whole-batch progress, 0 to 100
    pub aggregate_progress: u8,
}

/// Read-only view of a batch published to progress watchers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BatchProgress {
    pub state: UploadState,
    pub current_index: Option<usize>,
    pub current_file: Option<String>,
    pub total_files: usize,
    pub aggregate_progress: u8,
}

/// Result of one [`UploadOrchestrator::submit`] call
#[derive(Debug)]
pub enum UploadOutcome {
    /// Every file was ingested
    Succeeded { files: usize, subject: String },
    /// The batch never started because local input was missing
    Rejected(ValidationError),
    /// The file at `index` failed; later files were not sent
    Failed {
        index: usize,
        file: String,
        error: NotemindError,
    },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Whole-batch percentage for file `index` of `total` at `fraction` done
///
/// # Examples
///
/// ```
/// use notemind::upload::aggregate_percent;
///
/// assert_eq!(aggregate_percent(0, 0.5, 2), 25);
/// assert_eq!(aggregate_percent(1, 0.4, 3), 46);
/// assert_eq!(aggregate_percent(2, 1.0, 3), 100);
/// ```
pub fn aggregate_percent(index: usize, fraction: f64, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let fraction = fraction.clamp(0.0, 1.0);
    // Small epsilon so values like 0.7 * 100 do not floor to 69.
    let percent = ((index as f64 + fraction) / total as f64) * 100.0 + 1e-9;
    percent.floor().clamp(0.0, 100.0) as u8
}

/// Sequential uploader for one subject at a time
///
/// # Examples
///
/// ```no_run
/// use notemind::backend::{HttpBackend, UploadFile};
/// use notemind::config::Config;
/// use notemind::notifications::NotificationBus;
/// use notemind::upload::UploadOrchestrator;
/// use std::sync::Arc;
///
/// # async fn example() -> notemind::error::Result<()> {
/// let config = Config::default();
/// let backend = Arc::new(HttpBackend::new(&config.api, &config.upload)?);
/// let mut uploader = UploadOrchestrator::new(backend, NotificationBus::new());
///
/// let files = vec![UploadFile::new("notes/week1.pdf")];
/// let outcome = uploader.submit(files, "Physics", false).await;
/// assert!(outcome.is_success());
/// # Ok(())
/// # }
/// ```
pub struct UploadOrchestrator {
    backend: Arc<dyn KnowledgeBackend>,
    bus: NotificationBus,
    on_subjects_changed: Option<SubjectsChangedHook>,
    batch: UploadBatch,
    progress_tx: watch::Sender<BatchProgress>,
}

impl fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl UploadOrchestrator {
    pub fn new(backend: Arc<dyn KnowledgeBackend>, bus: NotificationBus) -> Self {
        let (progress_tx, _) = watch::channel(BatchProgress::default());
        Self {
            backend,
            bus,
            on_subjects_changed: None,
            batch: UploadBatch::default(),
            progress_tx,
        }
    }

    /// Register the hook fired after each successful batch
    pub fn with_subjects_changed<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_subjects_changed = Some(Arc::new(hook));
        self
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    pub fn state(&self) -> UploadState {
        self.batch.state
    }

    pub fn aggregate_progress(&self) -> u8 {
        self.batch.aggregate_progress
    }

    pub fn current_index(&self) -> Option<usize> {
        self.batch.current_index
    }

    /// Watch the batch as it progresses
    pub fn watch_progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress_tx.subscribe()
    }

    /// Forget a finished batch and go back to [`UploadState::Idle`]
    pub fn reset(&mut self) {
        self.batch = UploadBatch::default();
        self.publish();
    }

    /// Upload `files` to `subject_label`, one after another
    ///
    /// Missing files or a blank subject are rejected with a warning
    /// notification before anything is sent. Otherwise the batch runs to
    /// [`UploadState::Succeeded`] or stops at the first failing file in
    /// [`UploadState::Failed`], emitting exactly one notification either way.
    pub async fn submit(
        &mut self,
        files: Vec<UploadFile>,
        subject_label: &str,
        handwritten: bool,
    ) -> UploadOutcome {
        if let Err(reason) = Self::validate(&files, subject_label) {
            tracing::warn!("Upload rejected: {}", reason);
            self.bus.notify(NotificationSpec::warning(
                "Missing Information",
                reason.to_string(),
            ));
            return UploadOutcome::Rejected(reason);
        }

        let subject = subject_label.trim().to_string();
        let total = files.len();
        self.batch = UploadBatch {
            files,
            subject_label: subject.clone(),
            handwritten,
            state: UploadState::InProgress,
            current_index: Some(0),
            aggregate_progress: 0,
        };
        self.publish();
        tracing::info!("Uploading {} file(s) to subject '{}'", total, subject);

        for index in 0..total {
            let file = self.batch.files[index].clone();
            self.batch.current_index = Some(index);
            self.publish();

            let request = IngestRequest {
                file: file.clone(),
                subject: subject.clone(),
                handwritten,
            };
            let response = match self.transfer(index, request).await.and_then(ensure_success) {
                Ok(response) => response,
                Err(error) => return self.fail(index, &file, error),
            };
            tracing::debug!(
                "Uploaded {} ({}/{}): {}",
                file.name(),
                index + 1,
                total,
                response.message.as_deref().unwrap_or("ok")
            );
        }

        self.succeed()
    }

    fn validate(files: &[UploadFile], subject_label: &str) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::MissingFiles);
        }
        if subject_label.trim().is_empty() {
            return Err(ValidationError::MissingSubject);
        }
        Ok(())
    }

    /// Run one ingest call, folding its progress ticks into the batch
    async fn transfer(
        &mut self,
        index: usize,
        request: IngestRequest,
    ) -> BackendResult<IngestResponse> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let backend = Arc::clone(&self.backend);
        let call = backend.ingest(request, progress_tx);
        tokio::pin!(call);

        let result = loop {
            tokio::select! {
                biased;
                Some(tick) = progress_rx.recv() => self.record_progress(index, tick.fraction()),
                result = &mut call => break result,
            }
        };

        while let Ok(tick) = progress_rx.try_recv() {
            self.record_progress(index, tick.fraction());
        }
        result
    }

    fn record_progress(&mut self, index: usize, fraction: f64) {
        // 100 is reserved for a finished batch.
        let percent = aggregate_percent(index, fraction, self.batch.files.len()).min(99);
        if percent > self.batch.aggregate_progress {
            self.batch.aggregate_progress = percent;
            self.publish();
        }
    }

    fn fail(&mut self, index: usize, file: &UploadFile, error: NotemindError) -> UploadOutcome {
        self.batch.state = UploadState::Failed;
        self.batch.current_index = None;
        self.publish();

        let message = error.user_message(&format!("Failed to upload {}", file.name()));
        tracing::error!(
            "Upload of {} to '{}' failed at file {}/{}: {}",
            file.name(),
            self.batch.subject_label,
            index + 1,
            self.batch.files.len(),
            error
        );
        self.bus.notify(NotificationSpec::error("Upload Failed", message));

        UploadOutcome::Failed {
            index,
            file: file.name().to_string(),
            error,
        }
    }

    fn succeed(&mut self) -> UploadOutcome {
        self.batch.state = UploadState::Succeeded;
        self.batch.current_index = None;
        self.batch.aggregate_progress = 100;
        self.publish();

        let files = self.batch.files.len();
        let subject = self.batch.subject_label.clone();
        tracing::info!("Uploaded {} file(s) to subject '{}'", files, subject);
        self.bus.notify(NotificationSpec::success(
            "Upload Successful",
            format!("{} file(s) uploaded to subject \"{}\"", files, subject),
        ));

        if let Some(hook) = &self.on_subjects_changed {
            hook();
        }

        UploadOutcome::Succeeded { files, subject }
    }

    fn publish(&self) {
        let current_file = self
            .batch
            .current_index
            .and_then(|i| self.batch.files.get(i))
            .map(|f| f.name().to_string());
        self.progress_tx.send_replace(BatchProgress {
            state: self.batch.state,
            current_index: self.batch.current_index,
            current_file,
            total_files: self.batch.files.len(),
            aggregate_progress: self.batch.aggregate_progress,
        });
    }
}
