use chrono::NaiveDate;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::task::{format_minutes, Task, TaskPriority, TaskStatus};

use super::app::{AppState, DeleteConfirmState, StatusKind};

const DETAIL_HEIGHT: u16 = 8;
const HELP_KEY_WIDTH: usize = 12;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_SELECTED_BG: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);

pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.size();
    let detail_height = if app.show_detail { DETAIL_HEIGHT } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(detail_height),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    render_header(frame, app, chunks[0]);
    render_columns(frame, app, chunks[1]);
    if app.show_detail {
        render_detail(frame, app, chunks[2]);
    }
    render_footer(frame, app, chunks[3]);

    if let Some(state) = app.delete_confirm.as_ref() {
        render_delete_confirm_modal(frame, area, state);
    }
    if app.show_help {
        render_help_modal(frame, area);
    }
}

fn render_header(frame: &mut Frame, app: &AppState, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            "Learning board",
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {} of {} task(s)  ", app.columns.len(), app.total_tasks()),
            Style::default().fg(COLOR_MUTED),
        ),
        Span::styled(app.filter_summary(), Style::default().fg(COLOR_INFO)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_columns(frame: &mut Frame, app: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ]
            .as_ref(),
        )
        .split(area);

    let today = app.clock().today();
    for status in TaskStatus::ALL {
        render_column(frame, app, status, today, chunks[status.column_index()]);
    }
}

fn render_column(frame: &mut Frame, app: &AppState, status: TaskStatus, today: NaiveDate, area: Rect) {
    let tasks = app.columns.get(status);
    let focused = app.focus == status;
    let content_width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2) as usize;
    let selected = app.selected_index(status);

    let mut lines = Vec::new();
    if tasks.is_empty() {
        let text = if app.grabbed.is_some() && focused {
            "drop here"
        } else {
            "No tasks"
        };
        lines.push(Line::from(Span::styled(text, Style::default().fg(COLOR_MUTED_DARK))));
    } else {
        let (start, end) = list_window(tasks.len(), selected, height);
        for (index, task) in tasks.iter().enumerate().take(end).skip(start) {
            let is_selected = focused && selected == Some(index);
            let is_grabbed = app.grabbed.as_deref() == Some(task.id.as_str());
            lines.push(render_card(task, today, content_width, is_selected, is_grabbed));
        }
    }

    let border_color = if focused { column_color(status) } else { COLOR_BORDER };
    let title = format!("{} ({})", status.title(), tasks.len());
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                title,
                Style::default()
                    .fg(column_color(status))
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(border_color)),
    );
    frame.render_widget(widget, area);
}

fn render_card(
    task: &Task,
    today: NaiveDate,
    width: usize,
    selected: bool,
    grabbed: bool,
) -> Line<'static> {
    let marker = if grabbed { "» " } else { "  " };
    let priority = priority_label(task.priority);
    let mut suffix = String::new();
    if task.is_overdue(today) {
        suffix.push_str(" !");
    } else if task.due_date == Some(today) {
        suffix.push_str(" *");
    }
    if task.has_notes() {
        suffix.push_str(" ✎");
    }
    let title_width = width.saturating_sub(marker.chars().count() + priority.len() + 1 + suffix.chars().count());

    let base = if selected {
        Style::default().bg(COLOR_SELECTED_BG)
    } else {
        Style::default()
    };
    let title_style = if task.is_completed() {
        base.fg(COLOR_MUTED).add_modifier(Modifier::CROSSED_OUT)
    } else if selected {
        base.fg(COLOR_TEXT).add_modifier(Modifier::BOLD)
    } else {
        base.fg(COLOR_TEXT)
    };
    let suffix_color = if task.is_overdue(today) {
        COLOR_ERROR
    } else {
        COLOR_WARNING
    };

    Line::from(vec![
        Span::styled(marker.to_string(), base.fg(COLOR_ACCENT)),
        Span::styled(priority.to_string(), base.fg(priority_color(task.priority))),
        Span::styled(" ", base),
        Span::styled(pad_text(&task.title, title_width), title_style),
        Span::styled(suffix, base.fg(suffix_color)),
    ])
}

fn render_detail(frame: &mut Frame, app: &AppState, area: Rect) {
    let today = app.clock().today();
    let lines = match app.selected_task() {
        Some(task) => build_detail_lines(task, today),
        None => vec![Line::from(Span::styled(
            "No task selected",
            Style::default().fg(COLOR_MUTED_DARK),
        ))],
    };
    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Details")
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn build_detail_lines(task: &Task, today: NaiveDate) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    lines.push(Line::from(vec![
        Span::styled(
            task.title.clone(),
            Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(task.id.clone(), Style::default().fg(COLOR_MUTED_DARK)),
    ]));

    let mut meta = vec![
        label_span("status "),
        Span::styled(
            task.status.as_str().to_string(),
            Style::default().fg(column_color(task.status)),
        ),
        label_span("  priority "),
        Span::styled(
            task.priority.as_str().to_string(),
            Style::default().fg(priority_color(task.priority)),
        ),
        label_span("  time "),
        Span::raw(format_minutes(task.time_spent)),
        label_span("  progress "),
        Span::raw(format!("{:.0}%", task.progress())),
    ];
    if let Some(due) = task.due_date {
        meta.push(label_span("  due "));
        let style = if task.is_overdue(today) {
            Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT)
        };
        meta.push(Span::styled(due.format("%Y-%m-%d").to_string(), style));
    }
    lines.push(Line::from(meta));

    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|tag| format!("#{tag}")).collect();
        lines.push(Line::from(Span::styled(
            tags.join(" "),
            Style::default().fg(COLOR_INFO),
        )));
    }
    if !task.description.is_empty() {
        lines.push(Line::from(task.description.clone()));
    }
    if let Some(notes) = task.notes.as_deref() {
        lines.push(Line::from(vec![label_span("notes "), Span::raw(notes.to_string())]));
    }
    lines
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint = Line::from(Span::styled(app.footer_hint(), Style::default().fg(COLOR_INFO)));
    let status = match app.status_line() {
        Some((message, StatusKind::Error)) => Line::from(Span::styled(
            message,
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Some((message, StatusKind::Info)) => {
            Line::from(Span::styled(message, Style::default().fg(COLOR_WARNING)))
        }
        None => Line::from(""),
    };
    let widget = Paragraph::new(vec![hint, status])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER)),
        );
    frame.render_widget(widget, area);
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, state: &DeleteConfirmState) {
    let content_width = area.width.saturating_sub(8).min(64);
    let modal = centered_rect(content_width, 7, area);
    frame.render_widget(Clear, modal);

    let title_width = (content_width as usize).saturating_sub(4);
    let lines = vec![
        Line::from(Span::styled(
            "Delete task?",
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            truncate_text(&state.title, title_width),
            Style::default().fg(COLOR_TEXT),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y/enter confirm  esc/n cancel",
            Style::default().fg(COLOR_MUTED_DARK),
        )),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Delete Task"))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let lines = build_help_lines();
    let modal = centered_rect(48, lines.len() as u16 + 2, area);
    frame.render_widget(Clear, modal);
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Help")
            .border_style(Style::default().fg(COLOR_ACCENT)),
    );
    frame.render_widget(widget, modal);
}

fn build_help_lines() -> Vec<Line<'static>> {
    vec![
        help_line("h/l", "focus column"),
        help_line("j/k", "select task"),
        help_line("n", "new task in column"),
        help_line("e", "edit title"),
        help_line("space/c", "mark completed"),
        help_line("</>", "move to previous/next column"),
        help_line("1/2/3", "move to new/learning/completed"),
        help_line("m", "pick up, then drop with enter"),
        help_line("d/del", "delete task"),
        help_line("a", "archive completed"),
        help_line("/", "search"),
        help_line("f", "cycle quick filter"),
        help_line("p", "cycle priority filter"),
        help_line("t", "toggle tag filter"),
        help_line("s", "cycle sort"),
        help_line("x", "clear filters"),
        help_line("enter", "toggle details"),
        help_line("r", "reload"),
        help_line("q/esc", "quit"),
    ]
}

fn help_line(keys: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            pad_text(keys, HELP_KEY_WIDTH),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(desc.to_string(), Style::default().fg(COLOR_MUTED)),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn list_window(total: usize, selected: Option<usize>, height: usize) -> (usize, usize) {
    if total == 0 || height == 0 {
        return (0, 0);
    }
    if total <= height {
        return (0, total);
    }
    let selected = selected.unwrap_or(0);
    let mut start = selected.saturating_sub(height / 2);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn column_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::New => COLOR_INFO,
        TaskStatus::Learning => COLOR_WARNING,
        TaskStatus::Completed => COLOR_SUCCESS,
    }
}

fn priority_label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::High => "HIGH",
        TaskPriority::Medium => "MED ",
        TaskPriority::Low => "LOW ",
    }
}

fn priority_color(priority: TaskPriority) -> Color {
    match priority {
        TaskPriority::High => Color::Rgb(255, 87, 87),
        TaskPriority::Medium => COLOR_WARNING,
        TaskPriority::Low => COLOR_ACCENT,
    }
}

fn pad_text(value: &str, width: usize) -> String {
    let text = truncate_text(value, width);
    format!("{text:width$}")
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

fn label_span(label: &str) -> Span<'static> {
    Span::styled(label.to_string(), Style::default().fg(COLOR_MUTED_DARK))
}
