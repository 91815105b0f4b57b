//! lb stats command implementation

use crate::analytics;
use crate::cli::Context;
use crate::config::validate_trend_days;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::format_minutes;

/// Trend days shown in human output; JSON carries the full series.
const HUMAN_TREND_DAYS: usize = 7;

pub fn run_stats(ctx: &Context, days: Option<u32>) -> Result<()> {
    let days = days.unwrap_or(ctx.config.analytics.trend_days);
    validate_trend_days(days, "--days")?;

    let clock = ctx.clock();
    let tasks = ctx.storage.load_tasks()?;
    let report = analytics::generate(&tasks, days, &clock);
    let stats = &report.stats;

    let mut human = HumanOutput::new(format!(
        "lb stats: productivity score {}/100",
        report.productivity_score
    ));
    human.push_summary("total", stats.total.to_string());
    human.push_summary("completed", stats.completed.to_string());
    human.push_summary("learning", stats.in_progress.to_string());
    human.push_summary("new", stats.new.to_string());
    human.push_summary("completion rate", format!("{:.1}%", stats.completion_rate));
    human.push_summary(
        "avg days to complete",
        format!("{:.1}", stats.average_time_to_complete),
    );
    human.push_summary("overdue", stats.overdue_tasks.to_string());
    human.push_summary(
        "tasks per day (30d)",
        format!("{:.2}", report.average_tasks_per_day),
    );
    human.push_summary(
        "priority high/medium/low",
        format!(
            "{}/{}/{}",
            report.priority_distribution.high,
            report.priority_distribution.medium,
            report.priority_distribution.low
        ),
    );

    for tag in &report.top_tags {
        human.push_detail(format!(
            "#{}: {} task(s), {} completed ({:.0}%)",
            tag.tag, tag.count, tag.completed_count, tag.completion_rate
        ));
    }
    for entry in &report.time_analysis {
        human.push_detail(format!(
            "{}: {} [{}]",
            entry.title,
            format_minutes(entry.time_spent),
            entry.status.as_str()
        ));
    }
    let recent = report
        .completion_trends
        .len()
        .saturating_sub(HUMAN_TREND_DAYS);
    for day in &report.completion_trends[recent..] {
        human.push_detail(format!(
            "{}: +{} created, +{} completed, {} total completed",
            day.date.format("%Y-%m-%d"),
            day.created,
            day.completed,
            day.cumulative
        ));
    }
    if stats.overdue_tasks > 0 {
        human.push_next_step("lb list --filter overdue");
    }

    emit_success(ctx.output, "stats", &report, Some(&human))
}
