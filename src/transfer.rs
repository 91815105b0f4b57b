//! JSON export/import and the one-way CSV projection.
//!
//! Imports are all-or-nothing: every task in the file is checked, every
//! problem is reported, and the board is only replaced when the list is empty.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::task::{due_date_format, Task, TaskPriority, TaskStatus};

pub const EXPORT_VERSION: &str = "1.0";
const FILE_STEM: &str = "learning-tasks";
const CSV_HEADER: [&str; 11] = [
    "ID",
    "Title",
    "Description",
    "Status",
    "Priority",
    "Due Date",
    "Created At",
    "Completed At",
    "Time Spent (min)",
    "Tags",
    "Notes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::InvalidArgument(format!(
                "invalid export format '{other}' (expected json|csv)"
            ))),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    version: &'a str,
    export_date: String,
    tasks: &'a [Task],
}

/// `learning-tasks-YYYY-MM-DD.<ext>`
pub fn default_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!("{FILE_STEM}-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

pub fn export_json(tasks: &[Task], now: DateTime<Utc>) -> Result<String> {
    let document = ExportDocument {
        version: EXPORT_VERSION,
        export_date: format_instant(now),
        tasks,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn export_csv(tasks: &[Task]) -> String {
    let mut lines = Vec::with_capacity(tasks.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for task in tasks {
        let row = [
            task.id.clone(),
            quote(&task.title),
            quote(&task.description),
            task.status.to_string(),
            task.priority.to_string(),
            task.due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            format_instant(task.created_at),
            task.completed_at.map(format_instant).unwrap_or_default(),
            task.time_spent.to_string(),
            quote(&task.tags.join(", ")),
            task.notes.as_deref().map(quote).unwrap_or_default(),
        ];
        lines.push(row.join(","));
    }
    lines.join("\n")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse the envelope and return the raw task entries.
pub fn parse_import(text: &str) -> Result<Vec<Value>> {
    let document: Value = serde_json::from_str(text)
        .map_err(|err| Error::ImportFormat(format!("not valid JSON: {err}")))?;
    let Value::Object(mut fields) = document else {
        return Err(Error::ImportFormat(
            "expected a JSON object with version and tasks".to_string(),
        ));
    };

    match fields.get("version") {
        Some(Value::String(version)) if !version.trim().is_empty() => {}
        _ => return Err(Error::ImportFormat("missing version field".to_string())),
    }

    match fields.remove("tasks") {
        Some(Value::Array(tasks)) => Ok(tasks),
        Some(_) => Err(Error::ImportFormat("tasks must be an array".to_string())),
        None => Err(Error::ImportFormat("missing tasks array".to_string())),
    }
}

/// Every problem in the batch, labeled with the 1-based task number.
pub fn validate_import(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .flat_map(|(index, entry)| decode_entry(index + 1, entry).err().unwrap_or_default())
        .collect()
}

/// Parse and validate a whole import file into tasks.
pub fn decode_import(text: &str) -> Result<Vec<Task>> {
    let entries = parse_import(text)?;
    let mut tasks = Vec::with_capacity(entries.len());
    let mut problems = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match decode_entry(index + 1, entry) {
            Ok(task) => tasks.push(task),
            Err(found) => problems.extend(found),
        }
    }
    if !problems.is_empty() {
        return Err(Error::ImportValidation(problems));
    }
    Ok(tasks)
}

/// Replace the store's collection with an import file. The store is left
/// untouched on any error.
pub fn import_into(store: &mut TaskStore, text: &str) -> Result<usize> {
    let tasks = decode_import(text)?;
    let count = tasks.len();
    store.replace_all(tasks)?;
    Ok(count)
}

fn decode_entry(number: usize, entry: &Value) -> std::result::Result<Task, Vec<String>> {
    let Value::Object(fields) = entry else {
        return Err(vec![format!("Task {number}: Not an object")]);
    };

    let mut problems = Vec::new();
    let mut problem = |message: String| problems.push(format!("Task {number}: {message}"));

    let id = required_text(fields, "id");
    if id.is_none() {
        problem("Missing ID".to_string());
    }
    let title = required_text(fields, "title");
    if title.is_none() {
        problem("Missing title".to_string());
    }

    let status = match required_text(fields, "status") {
        None => {
            problem("Missing status".to_string());
            None
        }
        Some(raw) => match raw.parse::<TaskStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                problem(format!("Invalid status '{raw}'"));
                None
            }
        },
    };

    let priority = match required_text(fields, "priority") {
        None => {
            problem("Missing priority".to_string());
            None
        }
        Some(raw) => match raw.parse::<TaskPriority>() {
            Ok(priority) => Some(priority),
            Err(_) => {
                problem(format!("Invalid priority '{raw}'"));
                None
            }
        },
    };

    let created_at = match required_text(fields, "createdAt") {
        None => {
            problem("Missing creation date".to_string());
            None
        }
        Some(raw) => match parse_instant(raw) {
            Some(instant) => Some(instant),
            None => {
                problem(format!("Invalid creation date '{raw}'"));
                None
            }
        },
    };

    let completed_at = match optional_text(fields, "completedAt") {
        Ok(None) => None,
        Ok(Some(raw)) => {
            let parsed = parse_instant(raw);
            if parsed.is_none() {
                problem(format!("Invalid completion date '{raw}'"));
            }
            parsed
        }
        Err(()) => {
            problem("Invalid completion date".to_string());
            None
        }
    };

    let due_date = match optional_text(fields, "dueDate") {
        Ok(None) => None,
        Ok(Some(raw)) => match due_date_format::parse(raw) {
            Ok(date) => Some(date),
            Err(_) => {
                problem(format!("Invalid due date '{raw}'"));
                None
            }
        },
        Err(()) => {
            problem("Invalid due date".to_string());
            None
        }
    };

    let tags = match fields.get("tags") {
        Some(Value::Array(items)) => {
            let tags: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            if tags.is_none() {
                problem("Invalid tags".to_string());
            }
            tags
        }
        _ => {
            problem("Invalid tags".to_string());
            None
        }
    };

    let time_spent = match fields.get("timeSpent") {
        None | Some(Value::Null) => Some(0),
        Some(value) => {
            let minutes = value.as_u64().and_then(|minutes| u32::try_from(minutes).ok());
            if minutes.is_none() {
                problem("Invalid time spent".to_string());
            }
            minutes
        }
    };

    let description = match optional_text(fields, "description") {
        Ok(text) => text.unwrap_or_default().to_string(),
        Err(()) => {
            problem("Invalid description".to_string());
            String::new()
        }
    };
    let notes = match optional_text(fields, "notes") {
        Ok(text) => text.map(str::to_string),
        Err(()) => {
            problem("Invalid notes".to_string());
            None
        }
    };

    match (id, title, status, priority, created_at, tags, time_spent) {
        (
            Some(id),
            Some(title),
            Some(status),
            Some(priority),
            Some(created_at),
            Some(tags),
            Some(time_spent),
        ) if problems.is_empty() => Ok(Task {
            id: id.to_string(),
            title: title.to_string(),
            description,
            status,
            priority,
            due_date,
            created_at,
            completed_at,
            time_spent,
            tags,
            notes,
        }),
        _ => Err(problems),
    }
}

/// Non-empty string field, or `None` when absent, empty or not a string.
fn required_text<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// Absent, null and empty mean `None`; a non-string value is an error.
fn optional_text<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
) -> std::result::Result<Option<&'a str>, ()> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(()),
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 15).unwrap()
    }

    fn store() -> TaskStore {
        let mut store = TaskStore::default();
        for (title, status) in [
            ("Learn \"quoted\" things", TaskStatus::Completed),
            ("Rust traits", TaskStatus::New),
            ("React hooks", TaskStatus::Learning),
        ] {
            store
                .create(
                    NewTask {
                        title: title.to_string(),
                        status: Some(status),
                        tags: vec!["react".to_string(), "web".to_string()],
                        due_date: NaiveDate::from_ymd_opt(2025, 1, 30),
                        notes: Some("see chapter 3".to_string()),
                        ..NewTask::default()
                    },
                    now(),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let mut source = store();
        let id = source.tasks()[1].id.clone();
        source.add_time(&id, 42).unwrap();

        let text = export_json(source.tasks(), now()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["exportDate"], "2025-01-10T09:30:15.000Z");

        let mut target = TaskStore::default();
        let count = import_into(&mut target, &text).unwrap();
        assert_eq!(count, 3);
        assert_eq!(target.tasks(), source.tasks());
    }

    #[test]
    fn missing_tasks_field_leaves_store_unchanged() {
        let mut target = store();
        let before = target.tasks().to_vec();
        let err = import_into(&mut target, r#"{"version":"1.0","exportDate":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::ImportFormat(_)));
        assert_eq!(target.tasks(), before.as_slice());

        assert!(matches!(
            import_into(&mut target, "not json"),
            Err(Error::ImportFormat(_))
        ));
        assert!(matches!(
            import_into(&mut target, r#"{"tasks":[]}"#),
            Err(Error::ImportFormat(_))
        ));
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn collects_every_problem() {
        let text = r#"{
            "version": "1.0",
            "tasks": [
                {"id": "1", "title": "ok", "status": "new", "priority": "low",
                 "createdAt": "2025-01-01T00:00:00.000Z", "tags": []},
                {"title": "", "status": "doing", "createdAt": "2025-01-01T00:00:00.000Z",
                 "tags": "react"},
                {"id": "3", "title": "t", "status": "new", "priority": "high", "tags": []}
            ]
        }"#;

        let mut target = store();
        let err = import_into(&mut target, text).unwrap_err();
        let Error::ImportValidation(problems) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            problems,
            vec![
                "Task 2: Missing ID",
                "Task 2: Missing title",
                "Task 2: Invalid status 'doing'",
                "Task 2: Missing priority",
                "Task 2: Invalid tags",
                "Task 3: Missing creation date",
            ]
        );
        assert_eq!(target.len(), 3);

        let entries = parse_import(text).unwrap();
        assert_eq!(validate_import(&entries).len(), 6);
    }

    #[test]
    fn import_accepts_date_only_and_iso_due_dates() {
        let text = r#"{
            "version": "1.0",
            "exportDate": "2025-01-15T00:00:00.000Z",
            "tasks": [
                {"id": "1", "title": "a", "status": "completed", "priority": "medium",
                 "dueDate": "2025-01-30T00:00:00.000Z", "createdAt": "2025-01-15T00:00:00.000Z",
                 "completedAt": "2025-01-16T12:00:00.000Z", "timeSpent": 90, "tags": ["x"]},
                {"id": "1", "title": "dup id", "status": "new", "priority": "low",
                 "dueDate": "2025-02-01", "createdAt": "2025-01-15T00:00:00Z", "tags": []}
            ]
        }"#;
        let tasks = decode_import(text).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2025, 1, 30));
        assert_eq!(tasks[0].time_spent, 90);
        assert!(tasks[0].completed_at.is_some());
        assert_eq!(tasks[1].due_date, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(tasks[1].description, "");
    }

    #[test]
    fn csv_quotes_and_formats() {
        let source = store();
        let csv = export_csv(source.tasks());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "ID,Title,Description,Status,Priority,Due Date,Created At,Completed At,Time Spent (min),Tags,Notes"
        );
        assert_eq!(lines.len(), 4);
        let first = &source.tasks()[0];
        assert_eq!(
            lines[1],
            format!(
                "{},\"Learn \"\"quoted\"\" things\",\"\",completed,medium,2025-01-30,\
                 2025-01-10T09:30:15.000Z,2025-01-10T09:30:15.000Z,0,\"react, web\",\"see chapter 3\"",
                first.id
            )
        );
        assert!(lines[2].ends_with(",,0,\"react, web\",\"see chapter 3\""));
    }

    #[test]
    fn default_names_follow_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(
            default_file_name(ExportFormat::Json, date),
            "learning-tasks-2025-01-10.json"
        );
        assert_eq!(
            default_file_name("CSV".parse().unwrap(), date),
            "learning-tasks-2025-01-10.csv"
        );
    }
}
