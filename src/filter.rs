//! Search, filter and sort pipeline that drives the board columns.
//!
//! Stages run in a fixed order: text search, quick filter, priority filter,
//! tag filter, then sort. Column grouping afterwards is a stable partition, so
//! the chosen sort is the only ordering the user ever sees.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar::Clock;
use crate::error::{Error, Result};
use crate::task::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuickFilter {
    #[default]
    All,
    Today,
    Overdue,
    HighPriority,
    HasNotes,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 5] = [
        QuickFilter::All,
        QuickFilter::Today,
        QuickFilter::Overdue,
        QuickFilter::HighPriority,
        QuickFilter::HasNotes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuickFilter::All => "all",
            QuickFilter::Today => "today",
            QuickFilter::Overdue => "overdue",
            QuickFilter::HighPriority => "high-priority",
            QuickFilter::HasNotes => "has-notes",
        }
    }

    fn matches(self, task: &Task, clock: &Clock) -> bool {
        match self {
            QuickFilter::All => true,
            QuickFilter::Today => task.due_date == Some(clock.today()),
            QuickFilter::Overdue => task.is_overdue(clock.today()),
            QuickFilter::HighPriority => task.priority == TaskPriority::High,
            QuickFilter::HasNotes => task.has_notes(),
        }
    }
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuickFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid filter '{value}' (expected all|today|overdue|high-priority|has-notes)"
                ))
            })
    }
}

/// Priority narrowing; `All` keeps every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(TaskPriority),
}

impl PriorityFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(priority) => task.priority == priority,
        }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => f.write_str("all"),
            PriorityFilter::Only(priority) => write!(f, "{priority}"),
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        value.parse().map(PriorityFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Newest,
    Oldest,
    Priority,
    DueDate,
    Alphabetical,
    /// Priority descending, newest first within a priority.
    #[default]
    Board,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::Priority,
        SortKey::DueDate,
        SortKey::Alphabetical,
        SortKey::Board,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Priority => "priority",
            SortKey::DueDate => "due_date",
            SortKey::Alphabetical => "alphabetical",
            SortKey::Board => "board",
        }
    }

    /// Next key in menu order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|key| *key == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Oldest => a.created_at.cmp(&b.created_at),
            SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Alphabetical => compare_titles(&a.title, &b.title),
            SortKey::Board => b
                .priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| b.created_at.cmp(&a.created_at)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let normalized = if normalized == "duedate" {
            "due_date".to_string()
        } else {
            normalized
        };
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid sort '{value}' (expected newest|oldest|priority|due_date|alphabetical|board)"
                ))
            })
    }
}

/// Case-insensitive title order, falling back to the raw text so the order
/// is total.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub quick: QuickFilter,
    pub priority: PriorityFilter,
    /// Tasks match when they carry at least one of these.
    pub tags: Vec<String>,
    pub sort: SortKey,
}

impl FilterConfig {
    pub fn with_sort(sort: SortKey) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// True when no narrowing stage is active. Sort is not a filter.
    pub fn is_default(&self) -> bool {
        self.quick == QuickFilter::All
            && self.priority == PriorityFilter::All
            && self.tags.is_empty()
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(index) = self.tags.iter().position(|entry| entry == tag) {
            self.tags.remove(index);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    /// Clear every narrowing stage, keeping the sort.
    pub fn reset(&mut self) {
        *self = Self::with_sort(self.sort);
    }
}

fn matches_query(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task.description.to_lowercase().contains(needle)
        || task
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

/// Run the full pipeline and return the visible tasks in display order.
pub fn apply(tasks: &[Task], query: &str, config: &FilterConfig, clock: &Clock) -> Vec<Task> {
    let needle = query.trim().to_lowercase();
    let required: HashSet<&str> = config.tags.iter().map(String::as_str).collect();

    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| needle.is_empty() || matches_query(task, &needle))
        .filter(|task| config.quick.matches(task, clock))
        .filter(|task| config.priority.matches(task))
        .filter(|task| {
            required.is_empty() || task.tags.iter().any(|tag| required.contains(tag.as_str()))
        })
        .cloned()
        .collect();

    visible.sort_by(|a, b| config.sort.compare(a, b));
    visible
}

/// Pipeline output split into board columns, order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Columns {
    pub new: Vec<Task>,
    pub learning: Vec<Task>,
    pub completed: Vec<Task>,
}

impl Columns {
    pub fn get(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::New => &self.new,
            TaskStatus::Learning => &self.learning,
            TaskStatus::Completed => &self.completed,
        }
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.learning.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn group_by_status(tasks: Vec<Task>) -> Columns {
    let mut columns = Columns::default();
    for task in tasks {
        match task.status {
            TaskStatus::New => columns.new.push(task),
            TaskStatus::Learning => columns.learning.push(task),
            TaskStatus::Completed => columns.completed.push(task),
        }
    }
    columns
}

/// Distinct tags in first-appearance order.
pub fn available_tags(tasks: &[Task]) -> Vec<String> {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .flat_map(|task| task.tags.iter())
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap()
    }

    fn clock() -> Clock {
        Clock::fixed(at(10), Calendar::Utc)
    }

    fn task(id: &str, title: &str, priority: TaskPriority, created: u32) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::New,
            priority,
            due_date: None,
            created_at: at(created),
            completed_at: None,
            time_spent: 0,
            tags: Vec::new(),
            notes: None,
        }
    }

    fn sample() -> Vec<Task> {
        let mut a = task("a", "Borrow checker", TaskPriority::Low, 1);
        a.tags = vec!["rust".to_string()];
        a.due_date = NaiveDate::from_ymd_opt(2025, 1, 10);
        let mut b = task("b", "async runtimes", TaskPriority::High, 2);
        b.description = "Tokio internals".to_string();
        b.status = TaskStatus::Learning;
        b.due_date = NaiveDate::from_ymd_opt(2025, 1, 5);
        let mut c = task("c", "CSS grid", TaskPriority::Medium, 3);
        c.tags = vec!["css".to_string(), "layout".to_string()];
        c.notes = Some("  ".to_string());
        let mut d = task("d", "Zig comptime", TaskPriority::High, 4);
        d.status = TaskStatus::Completed;
        d.due_date = NaiveDate::from_ymd_opt(2025, 1, 2);
        d.notes = Some("fun".to_string());
        vec![a, b, c, d]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn search_matches_title_description_and_tags() {
        let tasks = sample();
        let config = FilterConfig::with_sort(SortKey::Oldest);
        assert_eq!(ids(&apply(&tasks, "TOKIO", &config, &clock())), vec!["b"]);
        assert_eq!(ids(&apply(&tasks, "rus", &config, &clock())), vec!["a"]);
        assert_eq!(apply(&tasks, "", &config, &clock()).len(), 4);
    }

    #[test]
    fn quick_filters() {
        let tasks = sample();
        let run = |quick| {
            let config = FilterConfig {
                quick,
                sort: SortKey::Oldest,
                ..FilterConfig::default()
            };
            ids(&apply(&tasks, "", &config, &clock()))
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(QuickFilter::Today), vec!["a"]);
        // completed "d" is past due but not overdue
        assert_eq!(run(QuickFilter::Overdue), vec!["b"]);
        assert_eq!(run(QuickFilter::HighPriority), vec!["b", "d"]);
        assert_eq!(run(QuickFilter::HasNotes), vec!["d"]);
    }

    #[test]
    fn priority_and_tag_filters() {
        let tasks = sample();
        let config = FilterConfig {
            priority: PriorityFilter::Only(TaskPriority::Medium),
            sort: SortKey::Oldest,
            ..FilterConfig::default()
        };
        assert_eq!(ids(&apply(&tasks, "", &config, &clock())), vec!["c"]);

        let config = FilterConfig {
            tags: vec!["layout".to_string(), "rust".to_string()],
            sort: SortKey::Oldest,
            ..FilterConfig::default()
        };
        assert_eq!(ids(&apply(&tasks, "", &config, &clock())), vec!["a", "c"]);
        assert!(!config.is_default());
    }

    #[test]
    fn sort_keys() {
        let tasks = sample();
        let sorted = |sort| {
            ids(&apply(&tasks, "", &FilterConfig::with_sort(sort), &clock()))
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(sorted(SortKey::Newest), vec!["d", "c", "b", "a"]);
        assert_eq!(sorted(SortKey::Oldest), vec!["a", "b", "c", "d"]);
        assert_eq!(sorted(SortKey::Priority), vec!["b", "d", "c", "a"]);
        assert_eq!(sorted(SortKey::DueDate), vec!["d", "b", "a", "c"]);
        assert_eq!(sorted(SortKey::Alphabetical), vec!["b", "a", "c", "d"]);
        assert_eq!(sorted(SortKey::Board), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let tasks = sample();
        for sort in SortKey::ALL {
            let config = FilterConfig {
                quick: QuickFilter::All,
                tags: vec!["rust".to_string(), "css".to_string()],
                sort,
                ..FilterConfig::default()
            };
            let once = apply(&tasks, "", &config, &clock());
            let twice = apply(&once, "", &config, &clock());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn grouping_keeps_pipeline_order() {
        let tasks = sample();
        let visible = apply(&tasks, "", &FilterConfig::with_sort(SortKey::Alphabetical), &clock());
        let columns = group_by_status(visible);
        assert_eq!(ids(&columns.new), vec!["a", "c"]);
        assert_eq!(ids(columns.get(TaskStatus::Learning)), vec!["b"]);
        assert_eq!(ids(&columns.completed), vec!["d"]);
        assert_eq!(columns.len(), 4);
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("high-priority".parse::<QuickFilter>().unwrap(), QuickFilter::HighPriority);
        assert_eq!("has_notes".parse::<QuickFilter>().unwrap(), QuickFilter::HasNotes);
        assert_eq!("dueDate".parse::<SortKey>().unwrap(), SortKey::DueDate);
        assert_eq!("due-date".parse::<SortKey>().unwrap(), SortKey::DueDate);
        assert_eq!("all".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!(
            "HIGH".parse::<PriorityFilter>().unwrap(),
            PriorityFilter::Only(TaskPriority::High)
        );
        assert!("sideways".parse::<SortKey>().is_err());
    }

    #[test]
    fn tags_and_defaults() {
        let tasks = sample();
        assert_eq!(available_tags(&tasks), vec!["rust", "css", "layout"]);

        let mut config = FilterConfig::with_sort(SortKey::Newest);
        assert!(config.is_default());
        config.toggle_tag("css");
        assert_eq!(config.tags, vec!["css".to_string()]);
        config.toggle_tag("css");
        assert!(config.is_default());
        config.quick = QuickFilter::Overdue;
        config.reset();
        assert!(config.is_default());
        assert_eq!(config.sort, SortKey::Newest);
    }
}
