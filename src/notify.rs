//! Notices
//!
//! Transient messages shown to the shopper (the storefront's toasts). Nothing in the core treats
//! a notice as fatal.

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

/// How a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational / success
    Info,

    /// Failure or blocked action
    Destructive,
}

/// A user-visible notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short headline
    pub title: String,

    /// Detail line
    pub description: String,

    /// Presentation
    pub severity: Severity,
}

impl Notice {
    /// An informational notice
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    /// A destructive notice
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }
}

/// Receives notices for display
pub trait Notifier: Send + Sync {
    /// Show a notice
    fn notify(&self, notice: Notice);
}

/// Emits notices as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => info!(title = %notice.title, "{}", notice.description),
            Severity::Destructive => warn!(title = %notice.title, "{}", notice.description),
        }
    }
}

/// Keeps every notice it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far, oldest first
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}
