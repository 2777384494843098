use std::time::{Duration, Instant};

use strum::Display;
use uuid::Uuid;

use crate::config::NotificationOptions;

pub const ENTRY_SHARED: &str = "Your thought has been shared successfully!";
pub const ENTRY_FAILED: &str = "Failed to add entry. Please try again.";
pub const SIGNED_OUT: &str = "You have been logged out successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn icon(self) -> char {
        match self {
            ToastKind::Success => '✓',
            ToastKind::Error => '✕',
            ToastKind::Info => 'ℹ',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(Uuid);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Pending notifications, each dismissed automatically once its deadline
/// passes or earlier by an explicit close.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    lifetime: Duration,
    toasts: Vec<Toast>,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(&NotificationOptions::default())
    }
}

impl ToastQueue {
    pub fn new(options: &NotificationOptions) -> Self {
        Self {
            lifetime: options.dismiss_after(),
            toasts: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> ToastId {
        self.push_at(Instant::now(), kind, message)
    }

    pub fn push_at(&mut self, now: Instant, kind: ToastKind, message: impl Into<String>) -> ToastId {
        let id = ToastId(Uuid::new_v4());
        let message = message.into();
        tracing::debug!(%kind, %message, "toast queued");
        self.toasts.push(Toast {
            id,
            kind,
            message,
            expires_at: now + self.lifetime,
        });
        id
    }

    /// Closes a toast before its timer fires. Returns false if it is already gone.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        self.toasts.len() != before
    }

    /// Removes and returns every toast whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Toast> {
        let (expired, live): (Vec<_>, Vec<_>) = self
            .toasts
            .drain(..)
            .partition(|toast| toast.expires_at <= now);
        self.toasts = live;
        expired
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.toasts.iter().map(|toast| toast.expires_at).min()
    }

    pub fn active(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
