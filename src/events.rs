//! Board event stream for external integrations.
//!
//! With `--events <path|->` every store change (and timer action) is written
//! as one JSON line, so scripts can react to completions without polling the
//! task file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::{ChangeListener, StoreChange};
use crate::task::Task;
use crate::transition::TransitionSignal;

pub const EVENT_SCHEMA_VERSION: &str = "learnboard.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskEdited,
    TaskDeleted,
    TaskMoved,
    TaskCompleted,
    TaskTimeUpdated,
    TasksArchived,
    TasksImported,
    TimerStarted,
    TimerPaused,
    TimerResumed,
    TimerStopped,
}

impl EventKind {
    pub fn for_change(change: &StoreChange) -> Self {
        match change {
            StoreChange::Created { .. } => EventKind::TaskCreated,
            StoreChange::Updated { .. } => EventKind::TaskEdited,
            StoreChange::Deleted { .. } => EventKind::TaskDeleted,
            StoreChange::StatusChanged {
                signal: TransitionSignal::Completed { .. },
            } => EventKind::TaskCompleted,
            StoreChange::StatusChanged { .. } => EventKind::TaskMoved,
            StoreChange::TimeUpdated { .. } => EventKind::TaskTimeUpdated,
            StoreChange::Archived { .. } => EventKind::TasksArchived,
            StoreChange::Replaced { .. } => EventKind::TasksImported,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event: EventKind) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            data: None,
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }
}

/// JSONL writer for events.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

impl EventSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to `path`, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

impl ChangeListener for EventSink {
    fn on_change(&mut self, change: &StoreChange, _tasks: &[Task]) -> Result<()> {
        let event = Event::new(EventKind::for_change(change)).with_data(change)?;
        self.emit(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn parses_destinations() {
        assert_eq!(EventDestination::parse(Some("-")), Some(EventDestination::Stdout));
        assert_eq!(EventDestination::parse(Some("  ")), None);
        assert_eq!(EventDestination::parse(None), None);
        assert_eq!(
            EventDestination::parse(Some("events.jsonl")),
            Some(EventDestination::File(PathBuf::from("events.jsonl")))
        );
    }

    #[test]
    fn store_changes_become_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut sink = EventDestination::File(path.clone()).open().unwrap();

        sink.on_change(
            &StoreChange::StatusChanged {
                signal: TransitionSignal::Completed {
                    task_id: "abc".to_string(),
                    from: TaskStatus::Learning,
                },
            },
            &[],
        )
        .unwrap();
        sink.on_change(&StoreChange::Archived { removed: 2 }, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["schema_version"], EVENT_SCHEMA_VERSION);
        assert_eq!(lines[0]["event"], "task_completed");
        assert_eq!(lines[0]["data"]["signal"]["task_id"], "abc");
        assert_eq!(lines[1]["event"], "tasks_archived");
        assert_eq!(lines[1]["data"]["removed"], 2);
    }
}
