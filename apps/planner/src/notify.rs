use std::fmt;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::planner::reconcile::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Success,
    Error,
}

/// A user-visible, non-blocking notification (a toast in a graphical front end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub variant: Variant,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn load_failed() -> Self {
        Self {
            variant: Variant::Error,
            title: "Error".into(),
            description: "Failed to load tasks. Please try again later.".into(),
        }
    }

    pub fn update_failed() -> Self {
        Self {
            variant: Variant::Error,
            title: "Error".into(),
            description: "Failed to update task. Please try again later.".into(),
        }
    }

    /// Success toast for `action` on the item titled `item_title`.
    pub fn action_succeeded(action: Action, item_title: &str) -> Self {
        let (title, description) = match action {
            Action::Accept => (
                "Task added to planner",
                format!("\"{item_title}\" has been added to your daily planner."),
            ),
            Action::Dismiss => (
                "Task dismissed",
                format!("\"{item_title}\" has been removed from your recommendations."),
            ),
            Action::Snooze => (
                "Task snoozed",
                format!("\"{item_title}\" will appear again tomorrow."),
            ),
            Action::ToggleComplete { completed: true } => (
                "Task completed",
                format!("\"{item_title}\" marked as completed."),
            ),
            Action::ToggleComplete { completed: false } => (
                "Task reopened",
                format!("\"{item_title}\" moved back to your plan."),
            ),
        };
        Self {
            variant: Variant::Success,
            title: title.into(),
            description,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            Variant::Success => info!("{notification}"),
            Variant::Error => warn!("{notification}"),
        }
    }
}

/// Forwards notifications to a front end over an unbounded channel.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            error!("Notification receiver dropped; notification lost");
        }
    }
}
