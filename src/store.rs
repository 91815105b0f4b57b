//! In-memory task collection.
//!
//! The store is the only writer of the task list. Persistence is not baked
//! in: callers subscribe a [`ChangeListener`] (see
//! [`crate::storage::FilePersistence`]) and get the full list after every
//! mutation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::transition::{self, TransitionSignal};

/// What a mutation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StoreChange {
    Created { task_id: String },
    Updated { task_id: String },
    Deleted { task_id: String },
    StatusChanged { signal: TransitionSignal },
    TimeUpdated { task_id: String, minutes: u32 },
    Archived { removed: usize },
    Replaced { total: usize },
}

pub trait ChangeListener {
    fn on_change(&mut self, change: &StoreChange, tasks: &[Task]) -> Result<()>;
}

impl<F> ChangeListener for F
where
    F: FnMut(&StoreChange, &[Task]) -> Result<()>,
{
    fn on_change(&mut self, change: &StoreChange, tasks: &[Task]) -> Result<()> {
        self(change, tasks)
    }
}

#[derive(Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    listeners: Vec<Box<dyn ChangeListener>>,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl ChangeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        if let Some(task) = self.get(trimmed) {
            return Ok(task.id.clone());
        }

        let needle = trimmed.to_ascii_lowercase();
        let mut matches: Vec<&str> = self
            .tasks
            .iter()
            .filter(|task| task.id.to_ascii_lowercase().starts_with(&needle))
            .map(|task| task.id.as_str())
            .collect();
        matches.sort_unstable();
        matches.dedup();

        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(trimmed.to_string())),
            [only] => Ok(only.to_string()),
            many => Err(Error::InvalidArgument(format!(
                "ambiguous task id '{}': {}",
                trimmed,
                many.join(", ")
            ))),
        }
    }

    pub fn create(&mut self, input: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = Task::create(input, now)?;
        tracing::debug!(task_id = %task.id, status = %task.status, "task created");
        self.tasks.push(task.clone());
        self.notify(StoreChange::Created {
            task_id: task.id.clone(),
        })?;
        Ok(task)
    }

    /// Edit fields and, if the patch carries a status, transition it.
    pub fn edit(
        &mut self,
        id: &str,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<(Task, Option<TransitionSignal>)> {
        let index = self.index_of(id)?;
        let mut updated = self.tasks[index].clone();
        updated.apply_fields(patch)?;
        let signal = patch
            .status
            .and_then(|status| transition::transition(&mut updated, status, now));
        self.tasks[index] = updated.clone();
        tracing::debug!(task_id = %updated.id, "task edited");

        let fields_only = TaskPatch {
            status: None,
            ..patch.clone()
        };
        if !fields_only.is_empty() {
            self.notify(StoreChange::Updated {
                task_id: updated.id.clone(),
            })?;
        }
        if let Some(signal) = signal.as_ref() {
            self.notify(StoreChange::StatusChanged {
                signal: signal.clone(),
            })?;
        }
        Ok((updated, signal))
    }

    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let index = self.index_of(id)?;
        let removed = self.tasks.remove(index);
        tracing::debug!(task_id = %removed.id, "task deleted");
        self.notify(StoreChange::Deleted {
            task_id: removed.id.clone(),
        })?;
        Ok(removed)
    }

    pub fn set_status(
        &mut self,
        id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<TransitionSignal>> {
        let index = self.index_of(id)?;
        let Some(signal) = transition::transition(&mut self.tasks[index], status, now) else {
            return Ok(None);
        };
        tracing::debug!(task_id = %signal.task_id(), to = %signal.to(), "task status changed");
        self.notify(StoreChange::StatusChanged {
            signal: signal.clone(),
        })?;
        Ok(Some(signal))
    }

    /// Overwrite the tracked minutes of a task.
    pub fn set_time_spent(&mut self, id: &str, minutes: u32) -> Result<Task> {
        let index = self.index_of(id)?;
        self.tasks[index].time_spent = minutes;
        let task = self.tasks[index].clone();
        self.notify(StoreChange::TimeUpdated {
            task_id: task.id.clone(),
            minutes,
        })?;
        Ok(task)
    }

    /// Add tracked minutes; time only ever grows through this path.
    pub fn add_time(&mut self, id: &str, minutes: u32) -> Result<Task> {
        let index = self.index_of(id)?;
        let total = self.tasks[index].time_spent.saturating_add(minutes);
        let id = self.tasks[index].id.clone();
        self.set_time_spent(&id, total)
    }

    /// Remove every completed task. Returns how many were removed.
    pub fn archive_completed(&mut self) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.is_completed());
        let removed = before - self.tasks.len();
        tracing::debug!(removed, "archived completed tasks");
        if removed > 0 {
            self.notify(StoreChange::Archived { removed })?;
        }
        Ok(removed)
    }

    /// Replace the whole collection (import). No merge, no id checks.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<()> {
        let total = tasks.len();
        self.tasks = tasks;
        tracing::debug!(total, "task collection replaced");
        self.notify(StoreChange::Replaced { total })
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    fn notify(&mut self, change: StoreChange) -> Result<()> {
        for listener in &mut self.listeners {
            listener.on_change(&change, &self.tasks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskPriority;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn new_task(title: &str, status: TaskStatus) -> NewTask {
        NewTask {
            title: title.to_string(),
            status: Some(status),
            ..NewTask::default()
        }
    }

    #[test]
    fn archive_removes_only_completed() {
        let mut store = TaskStore::default();
        for (title, status) in [
            ("a", TaskStatus::New),
            ("b", TaskStatus::Completed),
            ("c", TaskStatus::Learning),
            ("d", TaskStatus::Completed),
            ("e", TaskStatus::New),
        ] {
            store.create(new_task(title, status), now()).unwrap();
        }

        let removed = store.archive_completed().unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 3);
        assert!(store.tasks().iter().all(|task| !task.is_completed()));
    }

    #[test]
    fn listeners_see_every_mutation() {
        let seen: Rc<RefCell<Vec<(StoreChange, usize)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut store = TaskStore::default();
        store.subscribe(move |change: &StoreChange, tasks: &[Task]| -> Result<()> {
            sink.borrow_mut().push((change.clone(), tasks.len()));
            Ok(())
        });

        let task = store.create(new_task("Listen", TaskStatus::New), now()).unwrap();
        store.set_status(&task.id, TaskStatus::Learning, now()).unwrap();
        store.set_status(&task.id, TaskStatus::Learning, now()).unwrap();
        store.delete(&task.id).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0].0, StoreChange::Created { .. }));
        assert!(matches!(seen[1].0, StoreChange::StatusChanged { .. }));
        assert_eq!(seen[2], (StoreChange::Deleted { task_id: task.id.clone() }, 0));
    }

    #[test]
    fn edit_routes_status_through_transition() {
        let mut store = TaskStore::default();
        let task = store
            .create(new_task("Edit me", TaskStatus::Completed), now())
            .unwrap();
        assert!(task.completed_at.is_some());

        let patch = TaskPatch {
            status: Some(TaskStatus::New),
            priority: Some(TaskPriority::High),
            ..TaskPatch::default()
        };
        let (updated, signal) = store.edit(&task.id, &patch, now()).unwrap();
        assert!(updated.completed_at.is_none());
        assert_eq!(updated.priority, TaskPriority::High);
        assert!(matches!(signal, Some(TransitionSignal::Moved { .. })));
    }

    #[test]
    fn edited_status_reaches_listeners_as_a_transition() {
        let seen: Rc<RefCell<Vec<StoreChange>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut store = TaskStore::default();
        let task = store.create(new_task("Finish me", TaskStatus::Learning), now()).unwrap();
        store.subscribe(move |change: &StoreChange, _tasks: &[Task]| -> Result<()> {
            sink.borrow_mut().push(change.clone());
            Ok(())
        });

        let status_only = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..TaskPatch::default()
        };
        let (_, signal) = store.edit(&task.id, &status_only, now()).unwrap();
        assert!(matches!(signal, Some(TransitionSignal::Completed { .. })));

        let mixed = TaskPatch {
            status: Some(TaskStatus::New),
            title: Some("Again".to_string()),
            ..TaskPatch::default()
        };
        store.edit(&task.id, &mixed, now()).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(matches!(
            &seen[0],
            StoreChange::StatusChanged {
                signal: TransitionSignal::Completed { .. }
            }
        ));
        assert_eq!(seen[1], StoreChange::Updated { task_id: task.id.clone() });
        assert!(matches!(
            &seen[2],
            StoreChange::StatusChanged {
                signal: TransitionSignal::Moved { .. }
            }
        ));
        assert_eq!(
            crate::sound::SoundKind::for_change(&seen[0]),
            Some(crate::sound::SoundKind::TaskComplete)
        );
    }

    #[test]
    fn failed_edit_leaves_task_untouched() {
        let mut store = TaskStore::default();
        let task = store.create(new_task("Keep", TaskStatus::New), now()).unwrap();
        let patch = TaskPatch {
            title: Some(String::new()),
            priority: Some(TaskPriority::Low),
            ..TaskPatch::default()
        };
        assert!(store.edit(&task.id, &patch, now()).is_err());
        assert_eq!(store.get(&task.id), Some(&task));
    }

    #[test]
    fn add_time_accumulates() {
        let mut store = TaskStore::default();
        let task = store.create(new_task("Track", TaskStatus::Learning), now()).unwrap();
        store.add_time(&task.id, 25).unwrap();
        let updated = store.add_time(&task.id, 5).unwrap();
        assert_eq!(updated.time_spent, 30);
    }

    #[test]
    fn resolves_unique_prefixes() {
        let mut store = TaskStore::default();
        let task = store.create(new_task("Prefix", TaskStatus::New), now()).unwrap();
        let prefix = &task.id[..task.id.len() - 4];
        assert_eq!(store.resolve_id(prefix).unwrap(), task.id);
        assert!(matches!(
            store.resolve_id("zzzz-missing"),
            Err(Error::TaskNotFound(_))
        ));
    }
}
