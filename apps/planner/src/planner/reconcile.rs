//! Pure list reconciliation: next list state from the previous one plus one
//! confirmed mutation. Nothing here touches the network.

use crate::models::{ListItem, TaskStatus};

/// A user action on a single list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    Dismiss,
    Snooze,
    ToggleComplete { completed: bool },
}

impl Action {
    pub fn endpoint(self) -> &'static str {
        match self {
            Action::Accept => "/tasks/accept",
            Action::Dismiss => "/tasks/dismiss",
            Action::Snooze => "/tasks/snooze",
            Action::ToggleComplete { .. } => "/tasks/complete",
        }
    }

    /// Whether a confirmed action takes the item out of the list.
    pub fn removes_item(self) -> bool {
        !matches!(self, Action::ToggleComplete { .. })
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Dismiss => "dismiss",
            Action::Snooze => "snooze",
            Action::ToggleComplete { .. } => "complete",
        }
    }
}

/// Applies a confirmed `action` on `item_id` to `prev`.
///
/// Filter actions are idempotent: an id that is already gone leaves the list
/// as it is. Toggle-complete only rewrites the matching item's status.
pub fn next(prev: &[ListItem], action: Action, item_id: &str) -> Vec<ListItem> {
    match action {
        Action::Accept | Action::Dismiss | Action::Snooze => prev
            .iter()
            .filter(|item| item.id != item_id)
            .cloned()
            .collect(),
        Action::ToggleComplete { completed } => prev
            .iter()
            .map(|item| {
                if item.id == item_id {
                    ListItem {
                        status: completion_status(completed),
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect(),
    }
}

/// Puts an accepted recommendation at the head of a planner list, replacing
/// any existing item with the same id. The recommendation's effort estimate
/// becomes an `Est. ...` hint, as the planner list renders it.
pub fn adopt(prev: &[ListItem], item: ListItem) -> Vec<ListItem> {
    let adopted = ListItem {
        status: TaskStatus::Accepted,
        scheduling_hint: item.scheduling_hint.as_deref().map(|h| format!("Est. {h}")),
        ..item
    };
    let mut out = Vec::with_capacity(prev.len() + 1);
    out.extend(prev.iter().filter(|i| i.id != adopted.id).cloned());
    out.insert(0, adopted);
    out
}

/// "Not completed" for a planned task is `accepted`, as the backend records it.
fn completion_status(completed: bool) -> TaskStatus {
    if completed {
        TaskStatus::Completed
    } else {
        TaskStatus::Accepted
    }
}
