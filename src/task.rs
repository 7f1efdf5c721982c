// Task record and its persisted JSON shape

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

/// Storage key the task list is persisted under
pub const TASKS_KEY: &str = "tasks";

/// One entry in the to-do list
///
/// Only these four fields are persisted. Anything the presentation layer
/// wants to attach to a task (animation handles, highlight state) belongs in
/// a [`SideTable`](crate::side_table::SideTable) keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub completed_at: Option<String>,
}

impl Task {
    /// Create a pending task with a freshly generated id
    ///
    /// The caller is responsible for trimming and validating `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_task_id(),
            text: text.into(),
            completed: false,
            completed_at: None,
        }
    }

    /// Flip completion, stamping or clearing `completed_at` to match
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.completed_at = if self.completed {
            Some(completion_timestamp(Local::now()))
        } else {
            None
        };
    }
}

/// Generate a unique, time-ordered task id
pub fn new_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Format a completion time the way a locale-style clock reads, e.g. `10/19/2026, 3:04:05 PM`
pub fn completion_timestamp(at: DateTime<Local>) -> String {
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

// An empty string and null both mean "not completed"
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("Buy milk");
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert!(!task.id.is_empty());
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::new("a");
        let b = Task::new("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_toggle_sets_and_clears_completed_at() {
        let mut task = Task::new("Buy milk");

        task.toggle();
        assert!(task.completed);
        assert!(task.completed_at.is_some());

        task.toggle();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_completion_timestamp_format() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 15, 4, 5).unwrap();
        assert_eq!(completion_timestamp(at), "3/7/2026, 3:04:05 PM");

        let at = Local.with_ymd_and_hms(2026, 12, 31, 0, 30, 0).unwrap();
        assert_eq!(completion_timestamp(at), "12/31/2026, 12:30:00 AM");
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let task = Task {
            id: "1700000000000".to_string(),
            text: "Buy milk".to_string(),
            completed: true,
            completed_at: Some("1/2/2026, 9:00:00 AM".to_string()),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "1700000000000",
                "text": "Buy milk",
                "completed": true,
                "completedAt": "1/2/2026, 9:00:00 AM",
            })
        );
    }

    #[test]
    fn test_pending_task_serializes_null_completed_at() {
        let task = Task {
            id: "1".to_string(),
            text: "x".to_string(),
            completed: false,
            completed_at: None,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"completedAt\":null"));
    }

    #[test]
    fn test_deserialize_ignores_presentation_fields() {
        let json = r#"{"id":"1","text":"x","completed":false,"completedAt":null,"animation":{"_value":0}}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "1");
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_deserialize_empty_completed_at_as_none() {
        let json = r#"{"id":"1","text":"x","completed":false,"completedAt":""}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.completed_at.is_none());

        let json = r#"{"id":"2","text":"y"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }
}
