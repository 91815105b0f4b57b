//! Status transitions between board columns.
//!
//! Menu actions, `lb move`, and drops onto a column or onto another task all
//! end up in [`transition`], so `completed_at` is maintained the same way no
//! matter what triggered the move.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::store::TaskStore;
use crate::task::{Task, TaskStatus};

/// Side signal raised by a real status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionSignal {
    /// A task entered `completed` from another column.
    Completed {
        task_id: String,
        from: TaskStatus,
    },
    /// Any other column change.
    Moved {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

impl TransitionSignal {
    pub fn task_id(&self) -> &str {
        match self {
            TransitionSignal::Completed { task_id, .. } | TransitionSignal::Moved { task_id, .. } => {
                task_id
            }
        }
    }

    pub fn to(&self) -> TaskStatus {
        match self {
            TransitionSignal::Completed { .. } => TaskStatus::Completed,
            TransitionSignal::Moved { to, .. } => *to,
        }
    }
}

/// Move `task` to `target`. Returns `None` when the task is already there.
pub fn transition(task: &mut Task, target: TaskStatus, now: DateTime<Utc>) -> Option<TransitionSignal> {
    let from = task.status;
    if from == target {
        return None;
    }

    task.status = target;
    if target == TaskStatus::Completed {
        task.completed_at = Some(now);
        Some(TransitionSignal::Completed {
            task_id: task.id.clone(),
            from,
        })
    } else {
        task.completed_at = None;
        Some(TransitionSignal::Moved {
            task_id: task.id.clone(),
            from,
            to: target,
        })
    }
}

/// Column a drop lands in: a column id directly, or the column of the task
/// being hovered.
pub fn resolve_drop_target(tasks: &[Task], over_id: &str) -> Option<TaskStatus> {
    if let Some(status) = TaskStatus::from_column_id(over_id) {
        return Some(status);
    }
    tasks
        .iter()
        .find(|task| task.id == over_id)
        .map(|task| task.status)
}

/// Drop `active_id` over `over_id`. Unknown tasks and unresolvable targets
/// are a no-op.
pub fn drop_task(
    store: &mut TaskStore,
    active_id: &str,
    over_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<TransitionSignal>> {
    if store.get(active_id).is_none() {
        return Ok(None);
    }
    let Some(target) = resolve_drop_target(store.tasks(), over_id) else {
        tracing::debug!(active_id, over_id, "drop target not resolvable");
        return Ok(None);
    };
    store.set_status(active_id, target, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()
    }

    fn task(status: TaskStatus) -> Task {
        Task::create(
            NewTask {
                title: "Ownership chapter".to_string(),
                status: Some(status),
                ..NewTask::default()
            },
            now() - chrono::Duration::days(3),
        )
        .unwrap()
    }

    #[test]
    fn completing_sets_timestamp_and_signals() {
        let mut task = task(TaskStatus::Learning);
        let signal = transition(&mut task, TaskStatus::Completed, now());
        assert_eq!(task.completed_at, Some(now()));
        assert_eq!(
            signal,
            Some(TransitionSignal::Completed {
                task_id: task.id.clone(),
                from: TaskStatus::Learning,
            })
        );
    }

    #[test]
    fn moving_back_clears_timestamp() {
        let mut task = task(TaskStatus::Learning);
        transition(&mut task, TaskStatus::Completed, now());
        let signal = transition(&mut task, TaskStatus::New, now()).unwrap();
        assert!(task.completed_at.is_none());
        assert_eq!(signal.to(), TaskStatus::New);
        assert!(matches!(signal, TransitionSignal::Moved { from: TaskStatus::Completed, .. }));
    }

    #[test]
    fn same_status_is_silent() {
        let mut task = task(TaskStatus::Completed);
        let before = task.clone();
        assert!(transition(&mut task, TaskStatus::Completed, now()).is_none());
        assert_eq!(task, before);
    }

    #[test]
    fn drop_target_resolves_columns_and_tasks() {
        let learning = task(TaskStatus::Learning);
        let tasks = vec![learning.clone()];
        assert_eq!(resolve_drop_target(&tasks, "completed"), Some(TaskStatus::Completed));
        assert_eq!(resolve_drop_target(&tasks, &learning.id), Some(TaskStatus::Learning));
        assert_eq!(resolve_drop_target(&tasks, "nowhere"), None);
    }

    #[test]
    fn drop_over_task_moves_into_its_column() {
        let mut store = TaskStore::new(vec![task(TaskStatus::New), task(TaskStatus::Completed)]);
        let active = store.tasks()[0].id.clone();
        let over = store.tasks()[1].id.clone();

        let signal = drop_task(&mut store, &active, &over, now()).unwrap();
        assert!(matches!(signal, Some(TransitionSignal::Completed { .. })));
        assert_eq!(store.get(&active).unwrap().status, TaskStatus::Completed);

        let none = drop_task(&mut store, &active, "off-board", now()).unwrap();
        assert!(none.is_none());
    }
}
