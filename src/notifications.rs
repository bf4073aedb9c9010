use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::GridError;

/// Maximum number of toasts on screen at once. Older ones are pushed out.
const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    message: String,
    severity: Severity,
    shown_at: Instant,
}

impl Notice {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// Transient toast messages. Each one disappears on its own after the
/// configured lifetime; there is nothing to acknowledge.
#[derive(Debug)]
pub struct Notices {
    visible: VecDeque<Notice>,
    lifetime: Duration,
}

impl Notices {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            visible: VecDeque::new(),
            lifetime,
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.push_at(severity, message, Instant::now());
    }

    pub fn push_at(&mut self, severity: Severity, message: impl Into<String>, now: Instant) {
        if self.visible.len() == MAX_VISIBLE {
            self.visible.pop_back();
        }
        self.visible.push_front(Notice {
            message: message.into(),
            severity,
            shown_at: now,
        });
    }

    /// Shows `error` unless it is one the user should never see.
    pub fn push_error(&mut self, error: &GridError) {
        if error.is_silent() {
            return;
        }
        self.push(Severity::Error, error.to_string());
    }

    /// Drops every notice older than the lifetime.
    pub fn expire(&mut self, now: Instant) {
        let lifetime = self.lifetime;
        self.visible
            .retain(|notice| now.saturating_duration_since(notice.shown_at) < lifetime);
    }

    /// Newest first.
    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.visible.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
