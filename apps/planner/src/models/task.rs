//! Task and recommendation records as the planner views see them.
//!
//! The backend returns loosely shaped JSON. `decode_list` is the only way a
//! response body becomes `ListItem`s: it either yields a fully typed list or a
//! `DecodeError`, never a partially decoded one.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Application,
    Interview,
    FollowUp,
    Research,
    Networking,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Accepted,
    Completed,
    Snoozed,
    Dismissed,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Application => "application",
            Category::Interview => "interview",
            Category::FollowUp => "follow-up",
            Category::Research => "research",
            Category::Networking => "networking",
        })
    }
}

/// Which remote list a view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Planner,
    Recommended,
}

impl ListKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            ListKind::Planner => "/planner-tasks",
            ListKind::Recommended => "/recommended-tasks",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ListKind::Planner => "planner tasks",
            ListKind::Recommended => "recommended tasks",
        }
    }
}

/// One row of a rendered list. `id` is unique within a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
    pub tags: Vec<String>,
    pub reason: Option<String>,
    /// Free-text time or effort annotation ("10:00 AM", "Est. 45 min").
    pub scheduling_hint: Option<String>,
    pub status: TaskStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl ListItem {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Wire shape shared by `/planner-tasks` and `/recommended-tasks`.
#[derive(Debug, Deserialize)]
struct TaskRecord {
    id: String,
    title: String,
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    priority: Priority,
    #[serde(rename = "type")]
    category: Category,
    estimated_time: Option<String>,
    time: Option<String>,
    reason: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record at index {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("duplicate task id '{0}' in response")]
    DuplicateId(String),

    #[error("invalid created_at timestamp '{0}'")]
    Timestamp(String),
}

#[derive(Debug, Serialize)]
pub struct TaskActionRequest<'a> {
    pub task_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CompleteTaskRequest<'a> {
    pub task_id: &'a str,
    pub completed: bool,
}

/// Decodes a list response body for `kind`.
pub fn decode_list(kind: ListKind, body: &str) -> Result<Vec<ListItem>, DecodeError> {
    let records: Vec<TaskRecord> = serde_json::from_str(body)?;

    let mut seen = HashSet::with_capacity(records.len());
    let mut items = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let item = into_item(kind, index, record)?;
        if !seen.insert(item.id.clone()) {
            return Err(DecodeError::DuplicateId(item.id));
        }
        items.push(item);
    }

    Ok(items)
}

fn into_item(kind: ListKind, index: usize, record: TaskRecord) -> Result<ListItem, DecodeError> {
    if record.id.trim().is_empty() {
        return Err(DecodeError::EmptyField { index, field: "id" });
    }
    if record.title.trim().is_empty() {
        return Err(DecodeError::EmptyField {
            index,
            field: "title",
        });
    }

    let scheduling_hint = match kind {
        ListKind::Planner => record
            .time
            .or_else(|| record.estimated_time.map(|t| format!("Est. {t}"))),
        ListKind::Recommended => record.estimated_time,
    };

    let created_at = record
        .created_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    Ok(ListItem {
        id: record.id,
        title: record.title,
        description: record.description.unwrap_or_default(),
        priority: record.priority,
        category: record.category,
        tags: record.tags.unwrap_or_default(),
        reason: record.reason,
        scheduling_hint,
        status: record.status.unwrap_or_default(),
        created_at,
    })
}

/// Accepts RFC 3339 or a naive ISO-8601 timestamp. Naive values are UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| DecodeError::Timestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECOMMENDED_BODY: &str = r#"[
        {
            "id": "rec-1",
            "title": "Upload your resume",
            "description": "Let the AI analyze your resume.",
            "tags": ["Resume", "AI Analysis"],
            "priority": "high",
            "type": "application",
            "estimated_time": "3 min",
            "reason": "Resume powers your AI recommendations",
            "created_at": "2025-06-01T09:30:00.123456",
            "status": "pending"
        },
        {
            "id": "rec-2",
            "title": "Connect LinkedIn",
            "description": null,
            "tags": null,
            "priority": "medium",
            "type": "follow-up",
            "estimated_time": null,
            "reason": "Warm intros"
        }
    ]"#;

    #[test]
    fn test_decode_recommended_list() {
        let items = decode_list(ListKind::Recommended, RECOMMENDED_BODY).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "rec-1");
        assert_eq!(items[0].category, Category::Application);
        assert_eq!(items[0].scheduling_hint.as_deref(), Some("3 min"));
        assert_eq!(items[0].tags, vec!["Resume", "AI Analysis"]);
        assert!(items[0].created_at.is_some());
        assert_eq!(items[1].category, Category::FollowUp);
        assert_eq!(items[1].description, "");
        assert!(items[1].tags.is_empty());
        assert_eq!(items[1].status, TaskStatus::Pending);
    }

    #[test]
    fn test_planner_hint_prefers_time_then_estimate() {
        let body = r#"[
            {"id": "1", "title": "A", "priority": "high", "type": "interview",
             "time": "10:00 AM", "estimated_time": "45 min"},
            {"id": "2", "title": "B", "priority": "low", "type": "research",
             "estimated_time": "45 min"},
            {"id": "3", "title": "C", "priority": "low", "type": "research"}
        ]"#;
        let items = decode_list(ListKind::Planner, body).unwrap();
        assert_eq!(items[0].scheduling_hint.as_deref(), Some("10:00 AM"));
        assert_eq!(items[1].scheduling_hint.as_deref(), Some("Est. 45 min"));
        assert_eq!(items[2].scheduling_hint, None);
    }

    #[test]
    fn test_completed_status_marks_item_done() {
        let body = r#"[{"id": "1", "title": "A", "priority": "high",
                        "type": "application", "status": "completed"}]"#;
        let items = decode_list(ListKind::Planner, body).unwrap();
        assert!(items[0].is_completed());
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        let body = r#"[{"id": "1", "title": "A", "priority": "urgent", "type": "application"}]"#;
        assert!(matches!(
            decode_list(ListKind::Planner, body),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_non_array_body_is_rejected() {
        assert!(decode_list(ListKind::Planner, r#"{"detail": "oops"}"#).is_err());
    }

    #[test]
    fn test_duplicate_ids_reject_whole_body() {
        let body = r#"[
            {"id": "1", "title": "A", "priority": "high", "type": "application"},
            {"id": "1", "title": "B", "priority": "low", "type": "research"}
        ]"#;
        match decode_list(ListKind::Recommended, body) {
            Err(DecodeError::DuplicateId(id)) => assert_eq!(id, "1"),
            other => panic!("expected duplicate id error, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let body = r#"[{"id": "1", "title": "  ", "priority": "high", "type": "application"}]"#;
        assert!(matches!(
            decode_list(ListKind::Planner, body),
            Err(DecodeError::EmptyField { index: 0, field: "title" })
        ));
    }

    #[test]
    fn test_id_is_kept_verbatim() {
        let body = r#"[{"id": " 7 ", "title": "A", "priority": "high", "type": "application"}]"#;
        let items = decode_list(ListKind::Planner, body).unwrap();
        assert_eq!(items[0].id, " 7 ");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2025-06-01T09:30:00Z").is_ok());
        assert!(parse_timestamp("2025-06-01T09:30:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_request_bodies_serialize_with_snake_case_keys() {
        let accept = serde_json::to_value(TaskActionRequest { task_id: "7" }).unwrap();
        assert_eq!(accept, serde_json::json!({"task_id": "7"}));

        let complete = serde_json::to_value(CompleteTaskRequest {
            task_id: "7",
            completed: true,
        })
        .unwrap();
        assert_eq!(
            complete,
            serde_json::json!({"task_id": "7", "completed": true})
        );
    }
}
