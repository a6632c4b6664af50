//! Best-effort decoding of intercepted chore-list responses.
//!
//! The hosted application answers either with an envelope object carrying the
//! list under a named field (`{"res": [...]}`) or with a bare array. Both
//! shapes are tried in that order; anything else yields an empty list. Element
//! decoding substitutes defaults field by field, so one corrupt chore never
//! costs the rest of the batch.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::task::{NotificationMetadata, Task};

/// Field carrying the list inside the envelope object.
pub const DEFAULT_LIST_FIELD: &str = "res";

/// Remote status code meaning "completed".
pub const DEFAULT_COMPLETED_STATUS: i64 = 3;

/// Which top-level shape a payload was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListShape {
    Envelope,
    BareArray,
    Unrecognised,
}

/// Something that went wrong while decoding, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    /// Index of the offending element, `None` for payload-level problems.
    pub index: Option<usize>,
    pub message: String,
}

/// Output of [`TaskListParser::parse`].
#[derive(Debug, Clone, Serialize)]
pub struct ParsedTaskList {
    pub shape: ListShape,
    pub tasks: Vec<Task>,
    pub issues: Vec<ParseIssue>,
}

/// Decoder for chore-list payloads.
#[derive(Debug, Clone)]
pub struct TaskListParser {
    list_field: String,
    completed_status: i64,
}

impl Default for TaskListParser {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_FIELD, DEFAULT_COMPLETED_STATUS)
    }
}

impl TaskListParser {
    pub fn new(list_field: impl Into<String>, completed_status: i64) -> Self {
        Self {
            list_field: list_field.into(),
            completed_status,
        }
    }

    /// Decode `raw`. Never fails; see [`ParsedTaskList::issues`] for what was
    /// dropped or defaulted.
    pub fn parse(&self, raw: &str) -> ParsedTaskList {
        let mut issues = Vec::new();

        let (shape, elements) = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(mut obj)) => match obj.remove(&self.list_field) {
                Some(Value::Array(items)) => (ListShape::Envelope, items),
                _ => {
                    issues.push(ParseIssue {
                        index: None,
                        message: format!("object has no '{}' array", self.list_field),
                    });
                    (ListShape::Unrecognised, Vec::new())
                }
            },
            Ok(Value::Array(items)) => (ListShape::BareArray, items),
            Ok(other) => {
                issues.push(ParseIssue {
                    index: None,
                    message: format!("unexpected top-level {}", kind_of(&other)),
                });
                (ListShape::Unrecognised, Vec::new())
            }
            Err(e) => {
                issues.push(ParseIssue {
                    index: None,
                    message: format!("invalid JSON: {e}"),
                });
                (ListShape::Unrecognised, Vec::new())
            }
        };

        let tasks = elements
            .iter()
            .enumerate()
            .filter_map(|(index, element)| match element {
                Value::Object(fields) => Some(self.decode_task(fields, index, &mut issues)),
                other => {
                    issues.push(ParseIssue {
                        index: Some(index),
                        message: format!("element is {}, not an object", kind_of(other)),
                    });
                    None
                }
            })
            .collect::<Vec<_>>();

        for issue in &issues {
            tracing::debug!(index = ?issue.index, "{}", issue.message);
        }
        if shape == ListShape::Unrecognised {
            tracing::warn!(issues = issues.len(), "chore list payload not recognised, treating as empty");
        }

        ParsedTaskList {
            shape,
            tasks,
            issues,
        }
    }

    fn decode_task(&self, fields: &Map<String, Value>, index: usize, issues: &mut Vec<ParseIssue>) -> Task {
        let id = int_field(fields, "id").unwrap_or_else(|| {
            issues.push(ParseIssue {
                index: Some(index),
                message: "missing id, using 0".into(),
            });
            0
        });
        let name = str_field(fields, "name").unwrap_or_else(|| {
            issues.push(ParseIssue {
                index: Some(index),
                message: "missing name, using empty string".into(),
            });
            String::new()
        });

        Task {
            id,
            name,
            assigned_to: int_field(fields, "assignedTo"),
            next_due_date: str_field(fields, "nextDueDate"),
            is_completed: int_field(fields, "status") == Some(self.completed_status),
            frequency_type: str_field(fields, "frequencyType"),
            frequency: int_field(fields, "frequency").unwrap_or(1),
            description: str_field(fields, "description"),
            notification: bool_field(fields, "notification").unwrap_or(false),
            notification_metadata: fields
                .get("notificationMetadata")
                .and_then(Value::as_object)
                .map(|meta| NotificationMetadata {
                    nagging: bool_field(meta, "nagging").unwrap_or(false),
                }),
            is_active: bool_field(fields, "isActive").unwrap_or(true),
            priority: int_field(fields, "priority").unwrap_or(0),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Numbers occasionally arrive quoted; accept both.
fn int_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn bool_field(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    match fields.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ParsedTaskList {
        TaskListParser::default().parse(raw)
    }

    #[test]
    fn envelope_with_minimal_element_gets_defaults() {
        let out = parse(r#"{"res":[{"id":1,"name":"A"}]}"#);
        assert_eq!(out.shape, ListShape::Envelope);
        assert_eq!(out.tasks.len(), 1);
        let task = &out.tasks[0];
        assert_eq!(task.id, 1);
        assert_eq!(task.name, "A");
        assert_eq!(task.frequency, 1);
        assert!(task.is_active);
        assert!(!task.notification);
        assert!(!task.is_completed);
        assert_eq!(task.priority, 0);
        assert!(task.next_due_date.is_none());
    }

    #[test]
    fn not_json_is_empty() {
        let out = parse("not json");
        assert_eq!(out.shape, ListShape::Unrecognised);
        assert!(out.tasks.is_empty());
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn bare_array_is_accepted() {
        let out = parse(
            r#"[{"id":5,"name":"B","notification":true,"isActive":true,"nextDueDate":"2099-01-01T00:00:00Z"}]"#,
        );
        assert_eq!(out.shape, ListShape::BareArray);
        assert_eq!(out.tasks.len(), 1);
        assert!(out.tasks[0].is_reminder_eligible());
    }

    #[test]
    fn nulls_take_defaults() {
        let out = parse(
            r#"[{"id":2,"name":"C","frequency":null,"isActive":null,"notification":null,"priority":null,"nextDueDate":null}]"#,
        );
        let task = &out.tasks[0];
        assert_eq!(task.frequency, 1);
        assert!(task.is_active);
        assert!(!task.notification);
        assert_eq!(task.priority, 0);
        assert!(task.next_due_date.is_none());
    }

    #[test]
    fn missing_id_and_name_are_substituted() {
        let out = parse(r#"[{"notification":true},{"id":9,"name":"ok"}]"#);
        assert_eq!(out.tasks.len(), 2);
        assert_eq!(out.tasks[0].id, 0);
        assert_eq!(out.tasks[0].name, "");
        assert_eq!(out.tasks[1].id, 9);
        assert_eq!(out.issues.len(), 2);
    }

    #[test]
    fn non_object_elements_are_skipped_without_aborting() {
        let out = parse(r#"[1, "two", {"id":3,"name":"three"}]"#);
        assert_eq!(out.tasks.len(), 1);
        assert_eq!(out.tasks[0].id, 3);
        assert_eq!(out.issues.iter().filter(|i| i.index.is_some()).count(), 2);
    }

    #[test]
    fn order_is_preserved() {
        let out = parse(r#"{"res":[{"id":3,"name":"c"},{"id":1,"name":"a"},{"id":2,"name":"b"}]}"#);
        let ids: Vec<_> = out.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn completed_status_maps_to_flag() {
        let out = parse(r#"[{"id":1,"name":"a","status":3},{"id":2,"name":"b","status":0}]"#);
        assert!(out.tasks[0].is_completed);
        assert!(!out.tasks[1].is_completed);

        let custom = TaskListParser::new("res", 2).parse(r#"[{"id":1,"name":"a","status":2}]"#);
        assert!(custom.tasks[0].is_completed);
    }

    #[test]
    fn object_without_list_field_is_empty() {
        let out = parse(r#"{"error":"unauthorized"}"#);
        assert_eq!(out.shape, ListShape::Unrecognised);
        assert!(out.tasks.is_empty());
    }

    #[test]
    fn custom_list_field() {
        let out = TaskListParser::new("chores", DEFAULT_COMPLETED_STATUS)
            .parse(r#"{"chores":[{"id":4,"name":"d"}]}"#);
        assert_eq!(out.tasks.len(), 1);
    }

    #[test]
    fn lenient_scalars_and_metadata() {
        let out = parse(
            r#"[{"id":"12","name":"x","assignedTo":7,"isActive":0,"notification":1,
                "frequencyType":"weekly","frequency":2,"priority":3,
                "notificationMetadata":{"nagging":true}}]"#,
        );
        let task = &out.tasks[0];
        assert_eq!(task.id, 12);
        assert_eq!(task.assigned_to, Some(7));
        assert!(!task.is_active);
        assert!(task.notification);
        assert_eq!(task.frequency_type.as_deref(), Some("weekly"));
        assert_eq!(task.frequency, 2);
        assert_eq!(task.priority, 3);
        assert_eq!(task.notification_metadata, Some(NotificationMetadata { nagging: true }));
    }

    #[test]
    fn blank_due_date_is_present_but_overdue() {
        let out = parse(r#"[{"id":1,"name":"a","notification":true,"nextDueDate":"  "}]"#);
        let task = &out.tasks[0];
        assert_eq!(task.next_due_date.as_deref(), Some("  "));
        assert!(task.is_reminder_eligible());
        assert_eq!(task.fire_time(), chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
    }
}
