//! Ephemeral notification bus
//!
//! [`NotificationBus`] is the single owner of the user-facing notification
//! collection. Producers (the upload orchestrator, the chat session, the
//! CLI) call [`NotificationBus::notify`]; renderers call
//! [`NotificationBus::subscribe`] and receive the full ordered collection
//! after every change.
//!
//! Each notification expires on its own after its TTL. Expiry is a
//! deferred `remove`, scheduled on the current Tokio runtime. Removing a
//! notification early cancels its timer, so a late expiry never touches a
//! collection it no longer belongs to.
//!
//! The bus is a cheap cloneable handle. Clone it into every component that
//! needs to report something instead of reaching for a global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Lifetime of a notification that does not ask for one
pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

/// Lifetime of the short "copied" confirmation
pub const COPY_CONFIRMATION_TTL: Duration = Duration::from_millis(2000);

/// Unique notification identifier, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visual intent of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Neutral information
    #[default]
    Default,
    /// An operation completed
    Success,
    /// An operation failed
    Error,
    /// Input needs attention before anything can happen
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: Option<String>,
    pub body: Option<String>,
    pub severity: Severity,
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

/// Request to show a notification
///
/// Every field is optional. Unset severity means [`Severity::Default`] and
/// unset TTL means the bus default (3 seconds unless configured otherwise).
///
/// # Examples
///
/// ```
/// use notemind::notifications::{NotificationSpec, Severity};
/// use std::time::Duration;
///
/// let spec = NotificationSpec::warning("Missing Information", "Please enter a message")
///     .ttl(Duration::from_secs(5));
/// assert_eq!(spec.severity, Some(Severity::Warning));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSpec {
    pub title: Option<String>,
    pub body: Option<String>,
    pub severity: Option<Severity>,
    pub ttl: Option<Duration>,
}

impl NotificationSpec {
    /// Empty spec; all defaults apply
    pub fn new() -> Self {
        Self::default()
    }

    /// Neutral notification with a title and body
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new().title(title).body(body)
    }

    /// Success notification with a title and body
    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::info(title, body).severity(Severity::Success)
    }

    /// Error notification with a title and body
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::info(title, body).severity(Severity::Error)
    }

    /// Warning notification with a title and body
    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::info(title, body).severity(Severity::Warning)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

type Listener = Arc<dyn Fn(&[Notification]) + Send + Sync>;

#[derive(Default)]
struct BusState {
    notifications: Vec<Notification>,
    timers: HashMap<NotificationId, AbortHandle>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    pending: VecDeque<(Vec<Notification>, Vec<Listener>)>,
    dispatching: bool,
}

impl BusState {
    fn listeners(&self) -> Vec<Listener> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    /// Queue the current collection for delivery, in mutation order
    fn enqueue_snapshot(&mut self) {
        let snapshot = self.notifications.clone();
        let listeners = self.listeners();
        self.pending.push_back((snapshot, listeners));
    }
}

/// Releases the dispatcher role if a listener panics mid-delivery
struct DispatchGuard<'a> {
    state: &'a Mutex<BusState>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.dispatching = false;
            state.pending.clear();
        }
    }
}

/// Process-wide store of visible notifications
///
/// All mutations go through [`notify`](Self::notify),
/// [`remove`](Self::remove) and [`dismiss_all`](Self::dismiss_all).
/// Listeners run after each mutation, in registration order, with the lock
/// released, so a listener may call back into the bus.
///
/// Snapshots are queued under the lock and delivered by one dispatcher at a
/// time, so listeners see them in the order the mutations happened. A
/// mutation made while a delivery is running (from another thread or from
/// inside a listener) is handed to that dispatcher and delivered after the
/// current snapshot.
///
/// # Examples
///
/// ```
/// use notemind::notifications::{NotificationBus, NotificationSpec};
///
/// # #[tokio::main]
/// # async fn main() {
/// let bus = NotificationBus::new();
/// let id = bus.notify(NotificationSpec::success("Done", "All files uploaded"));
/// assert_eq!(bus.notifications().len(), 1);
///
/// assert!(bus.remove(id));
/// assert!(!bus.remove(id));
/// assert!(bus.notifications().is_empty());
/// # }
/// ```
#[derive(Clone)]
pub struct NotificationBus {
    state: Arc<Mutex<BusState>>,
    default_ttl: Duration,
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("NotificationBus")
            .field("visible", &state.notifications.len())
            .field("listeners", &state.listeners.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    /// Create an empty bus using [`DEFAULT_TTL`]
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Create an empty bus with a custom default lifetime
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            default_ttl,
        }
    }

    /// Default lifetime applied to specs without a TTL
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Show a notification and schedule its expiry
    ///
    /// Returns the new notification's id immediately. Expiry needs a Tokio
    /// runtime; without one the notification stays until removed.
    pub fn notify(&self, spec: NotificationSpec) -> NotificationId {
        let notification = Notification {
            id: NotificationId::generate(),
            title: spec.title,
            body: spec.body,
            severity: spec.severity.unwrap_or_default(),
            ttl: spec.ttl.unwrap_or(self.default_ttl),
            created_at: Utc::now(),
        };
        let id = notification.id;

        tracing::debug!(
            "Notification {} [{}]: {}",
            id,
            notification.severity,
            notification.title.as_deref().unwrap_or_default()
        );

        {
            let mut state = self.lock();
            if let Some(timer) = self.schedule_expiry(id, notification.ttl) {
                state.timers.insert(id, timer);
            }
            state.notifications.push(notification);
            state.enqueue_snapshot();
        }

        self.dispatch();
        id
    }

    /// Remove a notification if it is still visible
    ///
    /// Returns true if something was removed. Unknown or already removed ids
    /// are ignored and do not wake listeners.
    pub fn remove(&self, id: NotificationId) -> bool {
        self.remove_inner(id, true)
    }

    /// Remove every visible notification at once
    pub fn dismiss_all(&self) {
        {
            let mut state = self.lock();
            if state.notifications.is_empty() {
                return;
            }
            state.notifications.clear();
            for (_, timer) in state.timers.drain() {
                timer.abort();
            }
            state.enqueue_snapshot();
        }

        self.dispatch();
    }

    /// Register a listener for every add or remove
    ///
    /// The listener receives the full ordered collection. Keep the returned
    /// [`Subscription`] to deregister it later.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// Snapshot of the visible notifications, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Look up a visible notification
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.lock().notifications.iter().find(|n| n.id == id).cloned()
    }

    fn remove_inner(&self, id: NotificationId, cancel_timer: bool) -> bool {
        {
            let mut state = self.lock();
            let timer = state.timers.remove(&id);
            if cancel_timer {
                if let Some(timer) = timer {
                    timer.abort();
                }
            }

            let Some(index) = state.notifications.iter().position(|n| n.id == id) else {
                return false;
            };
            state.notifications.remove(index);
            state.enqueue_snapshot();
        }

        tracing::debug!("Notification {} removed", id);
        self.dispatch();
        true
    }

    fn schedule_expiry(&self, id: NotificationId, ttl: Duration) -> Option<AbortHandle> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime; notification {} will not expire", id);
                return None;
            }
        };

        let state = Arc::downgrade(&self.state);
        let default_ttl = self.default_ttl;
        let task = runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(state) = Weak::upgrade(&state) {
                NotificationBus { state, default_ttl }.remove_inner(id, false);
            }
        });
        Some(task.abort_handle())
    }

    /// Deliver queued snapshots unless another call is already doing so
    fn dispatch(&self) {
        {
            let mut state = self.lock();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }
        let _guard = DispatchGuard { state: &self.state };

        loop {
            // The role is released under the same lock that finds the queue
            // empty, so no snapshot is left behind.
            let next = {
                let mut state = self.lock();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.dispatching = false;
                }
                next
            };
            let Some((snapshot, listeners)) = next else {
                return;
            };
            for listener in &listeners {
                listener(&snapshot);
            }
        }
    }
}

/// Handle returned by [`NotificationBus::subscribe`]
#[derive(Debug)]
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    state: Weak<Mutex<BusState>>,
}

impl Subscription {
    /// Deregister the listener; later changes no longer reach it
    pub fn unsubscribe(self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
