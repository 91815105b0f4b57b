//! Read-only analytics over a task collection.
//!
//! Every function here is pure: it takes the tasks and a [`Clock`] and
//! returns plain data, so the `stats` command and the terminal board render
//! the same numbers.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::calendar::Clock;
use crate::task::{Task, TaskPriority, TaskStatus};

pub const DEFAULT_TREND_DAYS: u32 = 30;
const TOP_TAGS: usize = 10;
const TOP_TIME_ENTRIES: usize = 10;
const RECENT_WINDOW_DAYS: i64 = 30;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub new: usize,
    pub completion_rate: f64,
    /// Mean days between creation and completion.
    pub average_time_to_complete: f64,
    pub overdue_tasks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityDistribution {
    pub fn get(&self, priority: TaskPriority) -> usize {
        match priority {
            TaskPriority::High => self.high,
            TaskPriority::Medium => self.medium,
            TaskPriority::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAnalysis {
    pub tag: String,
    pub count: usize,
    pub completed_count: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendDay {
    #[serde(serialize_with = "serialize_day")]
    pub date: NaiveDate,
    pub completed: usize,
    pub created: usize,
    pub cumulative: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub task_id: String,
    pub title: String,
    pub time_spent: u32,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub new: usize,
    pub learning: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.new + self.learning + self.completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub stats: TaskStats,
    pub priority_distribution: PriorityDistribution,
    pub top_tags: Vec<TagAnalysis>,
    pub completion_trends: Vec<TrendDay>,
    pub time_analysis: Vec<TimeEntry>,
    pub tasks_by_status: StatusCounts,
    pub average_tasks_per_day: f64,
    pub productivity_score: u32,
}

fn serialize_day<S>(date: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

pub fn task_stats(tasks: &[Task], clock: &Clock) -> TaskStats {
    let total = tasks.len();
    let completed = count_status(tasks, TaskStatus::Completed);
    let in_progress = count_status(tasks, TaskStatus::Learning);
    let new = count_status(tasks, TaskStatus::New);

    let durations: Vec<f64> = tasks
        .iter()
        .filter(|task| task.is_completed())
        .filter_map(|task| {
            task.completed_at.map(|done| {
                (done - task.created_at).num_milliseconds() as f64 / MILLIS_PER_DAY
            })
        })
        .collect();
    let average_time_to_complete = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    let today = clock.today();
    let overdue_tasks = tasks.iter().filter(|task| task.is_overdue(today)).count();

    TaskStats {
        total,
        completed,
        in_progress,
        new,
        completion_rate: ratio_pct(completed, total),
        average_time_to_complete,
        overdue_tasks,
    }
}

pub fn priority_distribution(tasks: &[Task]) -> PriorityDistribution {
    let count = |priority| tasks.iter().filter(|task| task.priority == priority).count();
    PriorityDistribution {
        high: count(TaskPriority::High),
        medium: count(TaskPriority::Medium),
        low: count(TaskPriority::Low),
    }
}

/// Per-tag usage, most used first. A tag counts once per task.
pub fn tag_analysis(tasks: &[Task]) -> Vec<TagAnalysis> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for task in tasks {
        let mut seen_on_task: Vec<&str> = Vec::with_capacity(task.tags.len());
        for tag in &task.tags {
            if seen_on_task.contains(&tag.as_str()) {
                continue;
            }
            seen_on_task.push(tag.as_str());
            let entry = counts.entry(tag.as_str()).or_insert_with(|| {
                order.push(tag.as_str());
                (0, 0)
            });
            entry.0 += 1;
            if task.is_completed() {
                entry.1 += 1;
            }
        }
    }

    let mut entries: Vec<TagAnalysis> = order
        .into_iter()
        .map(|tag| {
            let (count, completed_count) = counts[tag];
            TagAnalysis {
                tag: tag.to_string(),
                count,
                completed_count,
                completion_rate: ratio_pct(completed_count, count),
            }
        })
        .collect();
    // stable: ties keep first appearance
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(TOP_TAGS);
    entries
}

/// One bucket per calendar day, oldest first, ending today.
pub fn completion_trend(tasks: &[Task], days: u32, clock: &Clock) -> Vec<TrendDay> {
    let today = clock.today();
    let mut cumulative = 0;
    (0..days)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(i64::from(offset));
            let completed = tasks
                .iter()
                .filter(|task| {
                    task.completed_at
                        .is_some_and(|done| clock.date_of(done) == date)
                })
                .count();
            let created = tasks
                .iter()
                .filter(|task| clock.date_of(task.created_at) == date)
                .count();
            cumulative += completed;
            TrendDay {
                date,
                completed,
                created,
                cumulative,
            }
        })
        .collect()
}

pub fn time_analysis(tasks: &[Task]) -> Vec<TimeEntry> {
    let mut entries: Vec<TimeEntry> = tasks
        .iter()
        .filter(|task| task.time_spent > 0)
        .map(|task| TimeEntry {
            task_id: task.id.clone(),
            title: task.title.clone(),
            time_spent: task.time_spent,
            status: task.status,
        })
        .collect();
    entries.sort_by(|a, b| b.time_spent.cmp(&a.time_spent));
    entries.truncate(TOP_TIME_ENTRIES);
    entries
}

/// Weighted 0-100 blend of completion, recent velocity, overdue ratio and
/// completion speed.
pub fn productivity_score(tasks: &[Task], clock: &Clock) -> u32 {
    if tasks.is_empty() {
        return 0;
    }

    let stats = task_stats(tasks, clock);
    let recent: Vec<&Task> = recent_tasks(tasks, clock).collect();

    let completion = stats.completion_rate / 100.0;
    let velocity = if recent.is_empty() {
        0.0
    } else {
        recent.iter().filter(|task| task.is_completed()).count() as f64 / recent.len() as f64
    };
    let overdue_ratio = 1.0 - stats.overdue_tasks as f64 / stats.total as f64;
    let time_factor = if stats.average_time_to_complete > 0.0 {
        (7.0 / stats.average_time_to_complete).min(1.0)
    } else {
        0.0
    };

    let score = (completion * 0.3 + velocity * 0.3 + overdue_ratio * 0.2 + time_factor * 0.2) * 100.0;
    score.round().clamp(0.0, 100.0) as u32
}

pub fn average_tasks_per_day(tasks: &[Task], clock: &Clock) -> f64 {
    recent_tasks(tasks, clock).count() as f64 / RECENT_WINDOW_DAYS as f64
}

pub fn status_counts(tasks: &[Task]) -> StatusCounts {
    StatusCounts {
        new: count_status(tasks, TaskStatus::New),
        learning: count_status(tasks, TaskStatus::Learning),
        completed: count_status(tasks, TaskStatus::Completed),
    }
}

pub fn generate(tasks: &[Task], trend_days: u32, clock: &Clock) -> AnalyticsReport {
    let stats = task_stats(tasks, clock);
    let tasks_by_status = StatusCounts {
        new: stats.new,
        learning: stats.in_progress,
        completed: stats.completed,
    };
    AnalyticsReport {
        priority_distribution: priority_distribution(tasks),
        top_tags: tag_analysis(tasks),
        completion_trends: completion_trend(tasks, trend_days, clock),
        time_analysis: time_analysis(tasks),
        tasks_by_status,
        average_tasks_per_day: average_tasks_per_day(tasks, clock),
        productivity_score: productivity_score(tasks, clock),
        stats,
    }
}

fn recent_tasks<'a>(tasks: &'a [Task], clock: &Clock) -> impl Iterator<Item = &'a Task> {
    let cutoff = clock.now() - Duration::days(RECENT_WINDOW_DAYS);
    tasks.iter().filter(move |task| task.created_at >= cutoff)
}

fn count_status(tasks: &[Task], status: TaskStatus) -> usize {
    tasks.iter().filter(|task| task.status == status).count()
}

fn ratio_pct(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}
