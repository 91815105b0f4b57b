use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::calendar::Clock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{self, Columns, FilterConfig, PriorityFilter, QuickFilter};
use crate::sound::{SoundDispatcher, TerminalBell};
use crate::storage::{Storage, SOUND_FILE, TASKS_FILE};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::transition::{self, TransitionSignal};

use super::view;

const EVENT_POLL_MS: u64 = 120;
const WATCH_DEBOUNCE_MS: u64 = 200;

enum UiMsg {
    FilesChanged,
    WatchError(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PromptKind {
    NewTask(TaskStatus),
    EditTitle(String),
    Tag,
}

#[derive(Clone, Debug)]
pub(crate) struct Prompt {
    pub(crate) kind: PromptKind,
    pub(crate) input: String,
}

impl Prompt {
    pub(crate) fn label(&self) -> String {
        match &self.kind {
            PromptKind::NewTask(status) => format!("new task in {}", status.title()),
            PromptKind::EditTitle(_) => "title".to_string(),
            PromptKind::Tag => "toggle tag".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct DeleteConfirmState {
    pub(crate) task_id: String,
    pub(crate) title: String,
}

pub struct AppState {
    pub(crate) columns: Columns,
    pub(crate) focus: TaskStatus,
    selected: [usize; 3],
    pub(crate) query: String,
    pub(crate) search_active: bool,
    pub(crate) filters: FilterConfig,
    pub(crate) prompt: Option<Prompt>,
    pub(crate) delete_confirm: Option<DeleteConfirmState>,
    /// Task picked up with `m`, waiting to be dropped.
    pub(crate) grabbed: Option<String>,
    pub(crate) show_help: bool,
    pub(crate) show_detail: bool,
    info_message: Option<String>,
    error_message: Option<String>,
    watch_error: Option<String>,
    storage: Storage,
    config: Config,
    store: TaskStore,
}

fn open_store(storage: &Storage) -> Result<TaskStore> {
    let mut store = storage.open_store()?;
    store.subscribe(SoundDispatcher::new(
        storage.load_sound_settings()?,
        TerminalBell::stderr(),
    ));
    Ok(store)
}

fn describe_signal(title: &str, signal: Option<&TransitionSignal>) -> String {
    match signal {
        Some(TransitionSignal::Completed { .. }) => format!("completed \"{title}\""),
        Some(TransitionSignal::Moved { to, .. }) => {
            format!("moved \"{title}\" to {}", to.title())
        }
        None => format!("\"{title}\" did not move"),
    }
}

impl AppState {
    pub(crate) fn new(storage: Storage, config: Config) -> Result<Self> {
        let store = open_store(&storage)?;
        let mut app = Self {
            columns: Columns::default(),
            focus: TaskStatus::New,
            selected: [0; 3],
            query: String::new(),
            search_active: false,
            filters: FilterConfig::with_sort(config.board.default_sort),
            prompt: None,
            delete_confirm: None,
            grabbed: None,
            show_help: false,
            show_detail: true,
            info_message: None,
            error_message: None,
            watch_error: None,
            storage,
            config,
            store,
        };
        app.refresh(None);
        Ok(app)
    }

    pub(crate) fn clock(&self) -> Clock {
        Clock::system(self.config.board.calendar)
    }

    pub(crate) fn total_tasks(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn selected_index(&self, status: TaskStatus) -> Option<usize> {
        let column = self.columns.get(status);
        if column.is_empty() {
            return None;
        }
        Some(self.selected[status.column_index()].min(column.len() - 1))
    }

    pub(crate) fn selected_task(&self) -> Option<&Task> {
        let index = self.selected_index(self.focus)?;
        self.columns.get(self.focus).get(index)
    }

    pub(crate) fn grabbed_task(&self) -> Option<&Task> {
        self.grabbed.as_deref().and_then(|id| self.store.get(id))
    }

    /// Re-run the pipeline, keeping `keep` selected when it is still visible.
    fn refresh(&mut self, keep: Option<String>) {
        let clock = self.clock();
        let visible = filter::apply(self.store.tasks(), &self.query, &self.filters, &clock);
        self.columns = filter::group_by_status(visible);

        if let Some(id) = keep {
            for status in TaskStatus::ALL {
                if let Some(pos) = self.columns.get(status).iter().position(|task| task.id == id) {
                    self.focus = status;
                    self.selected[status.column_index()] = pos;
                }
            }
        }
        for status in TaskStatus::ALL {
            let len = self.columns.get(status).len();
            let slot = &mut self.selected[status.column_index()];
            *slot = (*slot).min(len.saturating_sub(1));
        }
        if self
            .grabbed
            .as_deref()
            .is_some_and(|id| self.store.get(id).is_none())
        {
            self.grabbed = None;
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_task().map(|task| task.id.clone())
    }

    /// Reload from disk (another `lb` process changed the board).
    pub(crate) fn reload(&mut self) -> Result<()> {
        let keep = self.selected_id();
        self.store = open_store(&self.storage)?;
        self.refresh(keep);
        Ok(())
    }

    /// Run a mutation under the board lock against the latest file contents.
    /// Never blocks the event loop: a board held by another `lb` process is
    /// reported instead of waited on.
    fn mutate<T>(
        &mut self,
        keep: Option<String>,
        action: impl FnOnce(&mut TaskStore, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let Some(_lock) = self.storage.try_lock_board()? else {
            return Err(Error::OperationFailed(
                "board busy: another lb command is writing, try again".to_string(),
            ));
        };
        self.store = open_store(&self.storage)?;
        let now = self.clock().now();
        let result = action(&mut self.store, now);
        self.refresh(keep);
        result
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.columns.get(self.focus).len();
        if len == 0 {
            return;
        }
        let slot = &mut self.selected[self.focus.column_index()];
        let next = (*slot as isize + delta).clamp(0, len as isize - 1);
        *slot = next as usize;
    }

    fn move_focus(&mut self, delta: isize) {
        let next = (self.focus.column_index() as isize + delta).clamp(0, 2);
        if let Some(status) = TaskStatus::from_column_index(next as usize) {
            self.focus = status;
        }
    }

    fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
        self.info_message = None;
    }

    fn set_info(&mut self, message: String) {
        self.info_message = Some(message);
        self.error_message = None;
    }

    fn report(&mut self, result: Result<String>) {
        match result {
            Ok(message) => self.set_info(message),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(message) = self.error_message.as_ref() {
            return Some((message.clone(), StatusKind::Error));
        }
        if let Some(error) = self.watch_error.as_ref() {
            return Some((error.clone(), StatusKind::Error));
        }
        if let Some(prompt) = self.prompt.as_ref() {
            let mut line = format!("{}: {}_", prompt.label(), prompt.input);
            if prompt.kind == PromptKind::Tag {
                let tags = filter::available_tags(self.store.tasks());
                if !tags.is_empty() {
                    line.push_str(&format!("  ({})", tags.join(", ")));
                }
            }
            return Some((line, StatusKind::Info));
        }
        if let Some(task) = self.grabbed_task() {
            return Some((format!("moving \"{}\"", task.title), StatusKind::Info));
        }
        if let Some(info) = self.info_message.as_ref() {
            return Some((info.clone(), StatusKind::Info));
        }
        None
    }

    pub(crate) fn filter_summary(&self) -> String {
        let mut segments = Vec::new();
        if self.search_active || !self.query.is_empty() {
            segments.push(format!("search: {}", self.query));
        }
        segments.push(format!("filter: {}", self.filters.quick));
        segments.push(format!("priority: {}", self.filters.priority));
        if !self.filters.tags.is_empty() {
            segments.push(format!("tags: {}", self.filters.tags.join(",")));
        }
        segments.push(format!("sort: {}", self.filters.sort));
        segments.join("  ")
    }

    pub(crate) fn footer_hint(&self) -> String {
        if self.delete_confirm.is_some() {
            return "y/enter confirm delete  esc cancel".to_string();
        }
        if self.prompt.is_some() {
            return "type text  enter apply  esc cancel".to_string();
        }
        if self.search_active {
            return "type search  backspace delete  enter done  esc clear".to_string();
        }
        if self.grabbed.is_some() {
            return "h/l column  j/k target  enter drop  esc cancel".to_string();
        }
        "h/l column  j/k move  n new  space done  m move  / search  f/p/s filters  ? help  q quit"
            .to_string()
    }

    fn cycle_quick_filter(&mut self) {
        let index = QuickFilter::ALL
            .iter()
            .position(|quick| *quick == self.filters.quick)
            .unwrap_or(0);
        self.filters.quick = QuickFilter::ALL[(index + 1) % QuickFilter::ALL.len()];
    }

    fn cycle_priority_filter(&mut self) {
        self.filters.priority = match self.filters.priority {
            PriorityFilter::All => PriorityFilter::Only(TaskPriority::High),
            PriorityFilter::Only(TaskPriority::High) => PriorityFilter::Only(TaskPriority::Medium),
            PriorityFilter::Only(TaskPriority::Medium) => PriorityFilter::Only(TaskPriority::Low),
            PriorityFilter::Only(TaskPriority::Low) => PriorityFilter::All,
        };
    }

    fn set_status_of_selected(&mut self, status: TaskStatus) -> Result<String> {
        let Some(task) = self.selected_task().cloned() else {
            return Ok("no task selected".to_string());
        };
        let signal = self.mutate(Some(task.id.clone()), |store, now| {
            store.set_status(&task.id, status, now)
        })?;
        Ok(describe_signal(&task.title, signal.as_ref()))
    }

    fn shift_selected(&mut self, delta: isize) -> Result<String> {
        let Some(task) = self.selected_task().cloned() else {
            return Ok("no task selected".to_string());
        };
        let index = task.status.column_index() as isize + delta;
        match usize::try_from(index).ok().and_then(TaskStatus::from_column_index) {
            Some(status) => self.set_status_of_selected(status),
            None => Ok(format!("\"{}\" is already in the last column", task.title)),
        }
    }

    /// Drop the grabbed task onto the selected task, or onto the focused
    /// column when it is empty.
    fn drop_grabbed(&mut self) -> Result<String> {
        let Some(active_id) = self.grabbed.take() else {
            return Ok("nothing to drop".to_string());
        };
        let over_id = self
            .selected_id()
            .unwrap_or_else(|| self.focus.as_str().to_string());
        let title = self
            .store
            .get(&active_id)
            .map(|task| task.title.clone())
            .unwrap_or_else(|| active_id.clone());
        let signal = self.mutate(Some(active_id.clone()), |store, now| {
            transition::drop_task(store, &active_id, &over_id, now)
        })?;
        Ok(describe_signal(&title, signal.as_ref()))
    }

    fn delete_confirmed(&mut self, state: DeleteConfirmState) -> Result<String> {
        self.mutate(None, |store, _| store.delete(&state.task_id))?;
        Ok(format!("deleted \"{}\"", state.title))
    }

    fn archive(&mut self) -> Result<String> {
        let removed = self.mutate(None, |store, _| store.archive_completed())?;
        Ok(match removed {
            0 => "no completed tasks to archive".to_string(),
            count => format!("archived {count} completed task(s)"),
        })
    }

    fn submit_prompt(&mut self, prompt: Prompt) -> Result<String> {
        let input = prompt.input.trim().to_string();
        match prompt.kind {
            PromptKind::NewTask(status) => {
                let priority = self.config.board.default_priority;
                let task = self.mutate(None, |store, now| {
                    store.create(
                        NewTask {
                            title: input,
                            status: Some(status),
                            priority: Some(priority),
                            ..NewTask::default()
                        },
                        now,
                    )
                })?;
                self.refresh(Some(task.id.clone()));
                Ok(format!("created \"{}\"", task.title))
            }
            PromptKind::EditTitle(id) => {
                let patch = TaskPatch {
                    title: Some(input),
                    ..TaskPatch::default()
                };
                let (task, _) =
                    self.mutate(Some(id.clone()), |store, now| store.edit(&id, &patch, now))?;
                Ok(format!("renamed to \"{}\"", task.title))
            }
            PromptKind::Tag => {
                if input.is_empty() {
                    return Ok("no tag given".to_string());
                }
                self.filters.toggle_tag(&input);
                let keep = self.selected_id();
                self.refresh(keep);
                Ok(format!("tag filter: {}", self.filters.tags.join(", ")))
            }
        }
    }

    /// Returns true when the board should close.
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if let Some(state) = self.delete_confirm.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('c') | KeyCode::Enter => {
                    let result = self.delete_confirmed(state);
                    self.report(result);
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.set_info("cancelled".to_string());
                }
                _ => self.delete_confirm = Some(state),
            }
            return false;
        }

        if let Some(mut prompt) = self.prompt.take() {
            match key.code {
                KeyCode::Esc => self.set_info("cancelled".to_string()),
                KeyCode::Enter => {
                    let result = self.submit_prompt(prompt);
                    self.report(result);
                }
                KeyCode::Backspace => {
                    prompt.input.pop();
                    self.prompt = Some(prompt);
                }
                KeyCode::Char(ch) if !ch.is_control() => {
                    prompt.input.push(ch);
                    self.prompt = Some(prompt);
                }
                _ => self.prompt = Some(prompt),
            }
            return false;
        }

        if self.search_active {
            match key.code {
                KeyCode::Esc => {
                    self.query.clear();
                    self.search_active = false;
                }
                KeyCode::Enter => self.search_active = false,
                KeyCode::Backspace => {
                    self.query.pop();
                }
                KeyCode::Char(ch) if !ch.is_control() => self.query.push(ch),
                _ => {}
            }
            let keep = self.selected_id();
            self.refresh(keep);
            return false;
        }

        if self.grabbed.is_some() {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    self.grabbed = None;
                    self.set_info("move cancelled".to_string());
                }
                KeyCode::Enter | KeyCode::Char('m') => {
                    let result = self.drop_grabbed();
                    self.report(result);
                }
                KeyCode::Char('h') | KeyCode::Left => self.move_focus(-1),
                KeyCode::Char('l') | KeyCode::Right => self.move_focus(1),
                KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
                KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Char('h') | KeyCode::Left => self.move_focus(-1),
            KeyCode::Char('l') | KeyCode::Right => self.move_focus(1),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Enter => self.show_detail = !self.show_detail,
            KeyCode::Char('/') => self.search_active = true,
            KeyCode::Char('n') => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::NewTask(self.focus),
                    input: String::new(),
                });
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.prompt = Some(Prompt {
                        kind: PromptKind::EditTitle(task.id.clone()),
                        input: task.title.clone(),
                    });
                }
            }
            KeyCode::Char('t') => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Tag,
                    input: String::new(),
                });
            }
            KeyCode::Char(' ') | KeyCode::Char('c') => {
                let result = self.set_status_of_selected(TaskStatus::Completed);
                self.report(result);
            }
            KeyCode::Char('>') | KeyCode::Char('L') => {
                let result = self.shift_selected(1);
                self.report(result);
            }
            KeyCode::Char('<') | KeyCode::Char('H') => {
                let result = self.shift_selected(-1);
                self.report(result);
            }
            KeyCode::Char(digit @ '1'..='3') => {
                let index = digit as usize - '1' as usize;
                if let Some(status) = TaskStatus::from_column_index(index) {
                    let result = self.set_status_of_selected(status);
                    self.report(result);
                }
            }
            KeyCode::Char('m') => {
                if let Some(task) = self.selected_task() {
                    self.grabbed = Some(task.id.clone());
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.selected_task() {
                    self.delete_confirm = Some(DeleteConfirmState {
                        task_id: task.id.clone(),
                        title: task.title.clone(),
                    });
                }
            }
            KeyCode::Char('a') => {
                let result = self.archive();
                self.report(result);
            }
            KeyCode::Char('f') => {
                self.cycle_quick_filter();
                let keep = self.selected_id();
                self.refresh(keep);
            }
            KeyCode::Char('p') => {
                self.cycle_priority_filter();
                let keep = self.selected_id();
                self.refresh(keep);
            }
            KeyCode::Char('s') => {
                self.filters.sort = self.filters.sort.next();
                let keep = self.selected_id();
                self.refresh(keep);
            }
            KeyCode::Char('x') => {
                self.filters.reset();
                self.query.clear();
                let keep = self.selected_id();
                self.refresh(keep);
                self.set_info("filters cleared".to_string());
            }
            KeyCode::Char('r') => match self.reload() {
                Ok(()) => self.set_info("reloaded".to_string()),
                Err(err) => self.set_error(err.to_string()),
            },
            _ => {}
        }
        false
    }

    fn handle_ui_msg(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::FilesChanged => {
                if let Err(err) = self.reload() {
                    self.set_error(format!("reload error: {err}"));
                }
            }
            UiMsg::WatchError(err) => {
                tracing::warn!(error = %err, "board watcher failed");
                self.watch_error = Some(format!("watch error: {err}"));
            }
        }
    }
}

pub fn run(storage: &Storage, config: &Config) -> Result<()> {
    std::fs::create_dir_all(storage.root())?;
    let mut app = AppState::new(storage.clone(), config.clone())?;
    let (ui_tx, ui_rx) = mpsc::channel();
    spawn_watch(storage.root().to_path_buf(), ui_tx);
    run_terminal(&mut app, ui_rx)
}

fn run_terminal(app: &mut AppState, ui_rx: Receiver<UiMsg>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, ui_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            app.handle_ui_msg(msg);
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

fn is_board_file(path: &std::path::Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == TASKS_FILE || name == SOUND_FILE)
}

fn spawn_watch(data_dir: PathBuf, ui_tx: Sender<UiMsg>) {
    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };
        if let Err(err) = watcher.watch(&data_dir, RecursiveMode::NonRecursive) {
            let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
            return;
        }

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;

        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    if event.paths.iter().any(|path| is_board_file(path)) {
                        pending = Some(Instant::now() + debounce);
                    }
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.take().is_some() && ui_tx.send(UiMsg::FilesChanged).is_err() {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}
