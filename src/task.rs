//! Task records for the learning board.
//!
//! A task lives in exactly one column, picked by its [`TaskStatus`]. The
//! serialized form uses camelCase field names so exported files line up with
//! the import format.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Minutes of tracked time at which a learning task is treated as nearly done.
const LEARNING_PROGRESS_FULL_MINUTES: f64 = 240.0;
const LEARNING_PROGRESS_CAP: f64 = 95.0;
const LEARNING_PROGRESS_FLOOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    New,
    Learning,
    Completed,
}

impl TaskStatus {
    /// Board column order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::New, TaskStatus::Learning, TaskStatus::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::Learning => "learning",
            TaskStatus::Completed => "completed",
        }
    }

    /// Column heading shown on the board.
    pub fn title(self) -> &'static str {
        match self {
            TaskStatus::New => "New",
            TaskStatus::Learning => "Learning",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn column_index(self) -> usize {
        match self {
            TaskStatus::New => 0,
            TaskStatus::Learning => 1,
            TaskStatus::Completed => 2,
        }
    }

    pub fn from_column_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Exact column identifier match, as used for drop targets.
    pub fn from_column_id(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(TaskStatus::New),
            "learning" => Ok(TaskStatus::Learning),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(Error::InvalidArgument(format!(
                "invalid status '{other}' (expected new|learning|completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    /// Higher is more urgent: high=3, medium=2, low=1.
    pub fn rank(self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(Error::InvalidArgument(format!(
                "invalid priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "due_date_format")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

/// Partial update of a task. `None` leaves the field untouched; the nested
/// options on `due_date` and `notes` allow clearing.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
            && self.notes.is_none()
    }
}

impl Task {
    /// Build a fresh task: new id, `created_at = now`, no tracked time.
    pub fn create(input: NewTask, now: DateTime<Utc>) -> Result<Self> {
        let title = validate_title(&input.title)?;
        let description = validate_description(&input.description)?;
        let status = input.status.unwrap_or(TaskStatus::New);
        let completed_at = (status == TaskStatus::Completed).then_some(now);
        Ok(Self {
            id: generate_task_id(),
            title,
            description,
            status,
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            created_at: now,
            completed_at,
            time_spent: 0,
            tags: normalize_tags(input.tags),
            notes: normalize_notes(input.notes),
        })
    }

    /// Apply the non-status fields of a patch. Status goes through
    /// [`crate::transition::transition`] so completion timestamps stay
    /// consistent.
    pub fn apply_fields(&mut self, patch: &TaskPatch) -> Result<()> {
        if let Some(title) = patch.title.as_deref() {
            self.title = validate_title(title)?;
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = validate_description(description)?;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = patch.tags.as_ref() {
            self.tags = normalize_tags(tags.clone());
        }
        if let Some(notes) = patch.notes.as_ref() {
            self.notes = normalize_notes(notes.clone());
        }
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Not completed and due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.due_date.is_some_and(|due| due < today)
    }

    pub fn has_notes(&self) -> bool {
        self.notes
            .as_deref()
            .is_some_and(|notes| !notes.trim().is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|entry| entry == tag)
    }

    /// Progress percentage shown on task cards.
    pub fn progress(&self) -> f64 {
        match self.status {
            TaskStatus::Completed => 100.0,
            TaskStatus::Learning if self.time_spent > 0 => {
                (self.time_spent as f64 / LEARNING_PROGRESS_FULL_MINUTES * 100.0)
                    .min(LEARNING_PROGRESS_CAP)
            }
            TaskStatus::Learning => LEARNING_PROGRESS_FLOOR,
            TaskStatus::New => 0.0,
        }
    }
}

pub fn generate_task_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

pub fn validate_title(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("title is required".to_string()));
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(Error::InvalidArgument(format!(
            "title too long (max {TITLE_MAX_CHARS} characters)"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(value: &str) -> Result<String> {
    if value.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(Error::InvalidArgument(format!(
            "description too long (max {DESCRIPTION_MAX_CHARS} characters)"
        )));
    }
    Ok(value.to_string())
}

/// Trim tags, drop empties and repeats, keep first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Split a comma-separated tag field.
pub fn parse_tag_list(value: &str) -> Vec<String> {
    normalize_tags(value.split(',').map(str::to_string).collect())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|value| !value.is_empty())
}

/// Human form of a minute count: `0 min`, `45 min`, `2h`, `2h 5m`.
pub fn format_minutes(minutes: u32) -> String {
    if minutes == 0 {
        return "0 min".to_string();
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours == 0 {
        format!("{mins} min")
    } else if mins == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {mins}m")
    }
}

/// Due dates are calendar days. Input also accepts full RFC 3339 date-times
/// and keeps their UTC date.
pub(crate) mod due_date_format {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(value: &str) -> Result<NaiveDate, String> {
        if let Ok(date) = NaiveDate::parse_from_str(value, FORMAT) {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(value)
            .map(|instant| instant.naive_utc().date())
            .map_err(|err| format!("invalid due date '{value}': {err}"))
    }
}
