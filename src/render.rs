//! Terminal rendering of bus notifications
//!
//! The bus hands listeners the full collection on every change. The
//! renderer remembers which ids it has already printed so each notification
//! is shown once, when it first appears.

use colored::Colorize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::notifications::{Notification, NotificationBus, Severity, Subscription};

type Sink = Arc<dyn Fn(String) + Send + Sync>;

/// Prints new notifications to stderr while attached to a bus
pub struct NotificationRenderer {
    subscription: Option<Subscription>,
}

impl NotificationRenderer {
    /// Start printing notifications from `bus` to stderr
    pub fn attach(bus: &NotificationBus) -> Self {
        Self::attach_with(bus, |line| eprintln!("{}", line))
    }

    /// Start rendering notifications from `bus` into `sink`
    pub fn attach_with<F>(bus: &NotificationBus, sink: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let sink: Sink = Arc::new(sink);
        let seen = Mutex::new(HashSet::new());

        let subscription = bus.subscribe(move |visible: &[Notification]| {
            let fresh: Vec<String> = {
                let mut seen = seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                seen.retain(|id| visible.iter().any(|n| n.id == *id));
                visible
                    .iter()
                    .filter(|n| seen.insert(n.id))
                    .map(format_notification)
                    .collect()
            };
            for line in fresh {
                sink(line);
            }
        });

        Self {
            subscription: Some(subscription),
        }
    }

    /// Stop rendering
    pub fn detach(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for NotificationRenderer {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Colored severity tag, e.g. `[ERROR]`
pub fn severity_tag(severity: Severity) -> String {
    match severity {
        Severity::Default => format!("[{}]", "INFO".cyan()),
        Severity::Success => format!("[{}]", "OK".green()),
        Severity::Warning => format!("[{}]", "WARN".yellow()),
        Severity::Error => format!("[{}]", "ERROR".red().bold()),
    }
}

/// One-line rendering: tag, bold title, then body
pub fn format_notification(notification: &Notification) -> String {
    let mut line = severity_tag(notification.severity);
    if let Some(title) = &notification.title {
        line.push(' ');
        line.push_str(&title.bold().to_string());
    }
    if let Some(body) = &notification.body {
        line.push_str(if notification.title.is_some() { ": " } else { " " });
        line.push_str(body);
    }
    line
}
