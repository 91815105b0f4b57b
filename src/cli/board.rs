//! lb list / lb board
//!
//! Both run the search/filter/sort pipeline; `board` then splits the result
//! into the three columns without re-sorting.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::{Context, FilterArgs};
use crate::error::Result;
use crate::filter::{self, Columns, FilterConfig};
use crate::output::{emit_success, HumanOutput};
use crate::task::{format_minutes, Task, TaskStatus};

#[derive(Serialize)]
struct ListReport<'a> {
    total: usize,
    visible: usize,
    query: &'a str,
    filters: &'a FilterConfig,
    tasks: &'a [Task],
}

#[derive(Serialize)]
struct BoardReport<'a> {
    total: usize,
    visible: usize,
    query: &'a str,
    filters: &'a FilterConfig,
    columns: &'a Columns,
}

impl FilterArgs {
    /// Filter settings, with the configured default sort filling in.
    pub(crate) fn to_config(&self, ctx: &Context) -> FilterConfig {
        FilterConfig {
            quick: self.filter,
            priority: self.priority,
            tags: self
                .tags
                .iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            sort: self.sort.unwrap_or(ctx.config.board.default_sort),
        }
    }
}

/// One line per task: `[status] priority  title  (id)` plus markers.
pub(crate) fn format_task_line(task: &Task, today: NaiveDate) -> String {
    let mut line = format!(
        "[{}] {:<6} {}  ({})",
        task.status.as_str(),
        task.priority.as_str(),
        task.title,
        task.id
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", due.format("%Y-%m-%d")));
        if task.is_overdue(today) {
            line.push_str(" OVERDUE");
        }
    }
    if task.time_spent > 0 {
        line.push_str(&format!("  {}", format_minutes(task.time_spent)));
    }
    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|tag| format!("#{tag}")).collect();
        line.push_str(&format!("  {}", tags.join(" ")));
    }
    line
}

fn push_filter_summary(human: &mut HumanOutput, query: &str, config: &FilterConfig) {
    if !query.trim().is_empty() {
        human.push_summary("search", query.trim().to_string());
    }
    if !config.is_default() {
        human.push_summary("filter", config.quick.as_str());
        human.push_summary("priority", config.priority.to_string());
        if !config.tags.is_empty() {
            human.push_summary("tags", config.tags.join(", "));
        }
    }
    human.push_summary("sort", config.sort.as_str());
}

pub fn run_list(ctx: &Context, args: FilterArgs) -> Result<()> {
    let clock = ctx.clock();
    let tasks = ctx.storage.load_tasks()?;
    let config = args.to_config(ctx);
    let query = args.search.as_deref().unwrap_or("");
    let visible = filter::apply(&tasks, query, &config, &clock);

    let mut human = HumanOutput::new(format!(
        "lb list: {} of {} task(s)",
        visible.len(),
        tasks.len()
    ));
    push_filter_summary(&mut human, query, &config);
    let today = clock.today();
    for task in &visible {
        human.push_detail(format_task_line(task, today));
    }
    if tasks.is_empty() {
        human.push_next_step("lb add \"<title>\"");
    }

    emit_success(
        ctx.output,
        "list",
        &ListReport {
            total: tasks.len(),
            visible: visible.len(),
            query,
            filters: &config,
            tasks: &visible,
        },
        Some(&human),
    )
}

pub fn run_board(ctx: &Context, args: FilterArgs) -> Result<()> {
    let clock = ctx.clock();
    let tasks = ctx.storage.load_tasks()?;
    let config = args.to_config(ctx);
    let query = args.search.as_deref().unwrap_or("");
    let columns = filter::group_by_status(filter::apply(&tasks, query, &config, &clock));

    let mut human = HumanOutput::new(format!(
        "lb board: {} of {} task(s)",
        columns.len(),
        tasks.len()
    ));
    for status in TaskStatus::ALL {
        human.push_summary(status.title(), columns.get(status).len().to_string());
    }
    push_filter_summary(&mut human, query, &config);
    let today = clock.today();
    for status in TaskStatus::ALL {
        let column = columns.get(status);
        if column.is_empty() {
            continue;
        }
        human.push_detail(format!("{} ({})", status.title(), column.len()));
        for task in column {
            human.push_detail(format!("  {}", format_task_line(task, today)));
        }
    }

    emit_success(
        ctx.output,
        "board",
        &BoardReport {
            total: tasks.len(),
            visible: columns.len(),
            query,
            filters: &config,
            columns: &columns,
        },
        Some(&human),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{NewTask, TaskPriority};
    use chrono::{TimeZone, Utc};

    #[test]
    fn task_line_marks_overdue_and_tags() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        let mut task = Task::create(
            NewTask {
                title: "Borrow checker".to_string(),
                priority: Some(TaskPriority::High),
                due_date: NaiveDate::from_ymd_opt(2025, 1, 8),
                tags: vec!["rust".to_string()],
                ..NewTask::default()
            },
            now,
        )
        .unwrap();
        task.time_spent = 90;

        let line = format_task_line(&task, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert!(line.starts_with("[new] high   Borrow checker"));
        assert!(line.contains("due 2025-01-08 OVERDUE"));
        assert!(line.contains("1h 30m"));
        assert!(line.ends_with("#rust"));
    }
}
