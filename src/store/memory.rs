//! In-process task store: the planner's stand-in for a hosted document
//! database. Writes apply atomically, optionally persist a JSON snapshot, and
//! notify every subscriber with the full task list.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::port::{Subscription, TaskChangeFeed, TaskListener, TaskMutationPort};
use crate::error::{MutationError, StorageError, ValidationError};
use crate::io::file::{load_tasks, save_tasks};
use crate::model::{NewTask, Task, TaskId, TaskPatch};

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    listeners: Vec<(u64, TaskListener)>,
    next_listener: u64,
    /// Ids unsubscribed while `notify` held the listener list.
    cancelled: HashSet<u64>,
    snapshot_path: Option<PathBuf>,
    read_only: bool,
    unavailable: Option<String>,
}

/// Cheap to clone; clones share the same store.
#[derive(Clone, Default)]
pub struct MemoryTaskStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                tasks,
                ..Default::default()
            })),
        }
    }

    /// Open a store persisted at `path`, loading whatever is there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let tasks = load_tasks(&path)?;
        info!(path = %path.display(), count = tasks.len(), "task store opened");
        let store = Self::new(tasks);
        store.inner.borrow_mut().snapshot_path = Some(path);
        Ok(store)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.inner.borrow().tasks.clone()
    }

    /// Reject every write with `PermissionDenied`.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.borrow_mut().read_only = read_only;
    }

    /// Reject every write with a backend error until cleared.
    pub fn set_unavailable(&self, reason: Option<String>) {
        self.inner.borrow_mut().unavailable = reason;
    }

    /// Run `edit` on a copy of the task list; keep the copy only if it
    /// succeeds and persists, then notify subscribers.
    fn write<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Task>) -> Result<T, MutationError>,
    ) -> Result<T, MutationError> {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            if let Some(reason) = &inner.unavailable {
                return Err(MutationError::Backend(reason.clone()));
            }
            if inner.read_only {
                return Err(MutationError::PermissionDenied);
            }
            let mut tasks = inner.tasks.clone();
            let value = edit(&mut tasks)?;
            if let Some(path) = &inner.snapshot_path {
                save_tasks(&tasks, path).map_err(|e| {
                    warn!(%e, "failed to persist task snapshot");
                    MutationError::Backend(e.to_string())
                })?;
            }
            inner.tasks = tasks.clone();
            (value, tasks)
        };
        let (value, tasks) = snapshot;
        self.notify(&tasks);
        Ok(value)
    }

    fn notify(&self, tasks: &[Task]) {
        // Listeners run without the store borrowed so they may call back in.
        let mut listeners = std::mem::take(&mut self.inner.borrow_mut().listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(tasks);
        }
        let mut inner = self.inner.borrow_mut();
        listeners.append(&mut inner.listeners);
        let cancelled = std::mem::take(&mut inner.cancelled);
        listeners.retain(|(id, _)| !cancelled.contains(id));
        inner.listeners = listeners;
    }
}

fn find_mut(tasks: &mut [Task], id: TaskId) -> Result<&mut Task, MutationError> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(MutationError::NotFound(id))
}

#[async_trait(?Send)]
impl TaskMutationPort for MemoryTaskStore {
    async fn update(&self, task_id: TaskId, patch: TaskPatch) -> Result<(), MutationError> {
        self.write(|tasks| {
            let task = find_mut(tasks, task_id)?;
            patch.validate_against(task)?;
            task.apply(&patch);
            debug!(task = %task_id, ?patch, "task updated");
            Ok(())
        })
    }

    async fn add_dependency(
        &self,
        prerequisite: TaskId,
        dependent: TaskId,
    ) -> Result<(), MutationError> {
        if prerequisite == dependent {
            return Err(ValidationError::SelfDependency.into());
        }
        self.write(|tasks| {
            if !tasks.iter().any(|t| t.id == prerequisite) {
                return Err(MutationError::NotFound(prerequisite));
            }
            let task = find_mut(tasks, dependent)?;
            if !task.depends_on(prerequisite) {
                task.dependencies.push(prerequisite);
            }
            Ok(())
        })
    }

    async fn remove_dependency(
        &self,
        prerequisite: TaskId,
        dependent: TaskId,
    ) -> Result<(), MutationError> {
        self.write(|tasks| {
            find_mut(tasks, dependent)?
                .dependencies
                .retain(|id| *id != prerequisite);
            Ok(())
        })
    }

    async fn create(&self, task: NewTask) -> Result<TaskId, MutationError> {
        task.validate()?;
        self.write(|tasks| {
            let task = task.into_task();
            let id = task.id;
            tasks.push(task);
            info!(task = %id, "task created");
            Ok(id)
        })
    }

    async fn delete(&self, task_id: TaskId) -> Result<(), MutationError> {
        self.write(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != task_id);
            if tasks.len() == before {
                return Err(MutationError::NotFound(task_id));
            }
            info!(task = %task_id, "task deleted");
            Ok(())
        })
    }
}

impl TaskChangeFeed for MemoryTaskStore {
    fn subscribe(&self, mut listener: TaskListener) -> Subscription {
        let (id, tasks) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            (id, inner.tasks.clone())
        };
        // New subscribers get the current list straight away.
        listener(&tasks);
        self.inner.borrow_mut().listeners.push((id, listener));

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Ok(mut inner) = inner.try_borrow_mut() {
                    let before = inner.listeners.len();
                    inner.listeners.retain(|(lid, _)| *lid != id);
                    if inner.listeners.len() == before {
                        // Mid-notify: the list is out being called.
                        inner.cancelled.insert(id);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::port::delete_task_cascade;
    use chrono::NaiveDate;
    use futures::executor::block_on;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn recording(store: &MemoryTaskStore) -> (Rc<RefCell<Vec<Vec<Task>>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(Box::new(move |tasks: &[Task]| {
            sink.borrow_mut().push(tasks.to_vec())
        }));
        (seen, sub)
    }

    #[test]
    fn subscribers_get_current_list_then_every_change() {
        let a = Task::new("A", d(1), d(2));
        let store = MemoryTaskStore::new(vec![a.clone()]);
        let (seen, _sub) = recording(&store);
        assert_eq!(seen.borrow().len(), 1);

        block_on(store.update(a.id, TaskPatch::progress(50))).unwrap();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1][0].progress, 50);
    }

    #[test]
    fn dropping_subscription_stops_notifications() {
        let a = Task::new("A", d(1), d(2));
        let store = MemoryTaskStore::new(vec![a.clone()]);
        let (seen, sub) = recording(&store);
        drop(sub);
        block_on(store.update(a.id, TaskPatch::progress(10))).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn unsubscribing_during_notify_sticks() {
        let a = Task::new("A", d(1), d(2));
        let store = MemoryTaskStore::new(vec![a.clone()]);
        let (seen, other) = recording(&store);
        let other = Rc::new(RefCell::new(Some(other)));

        // Drops its own subscription and the recorder's on its first change.
        let own: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(RefCell::new(0));
        let sub = {
            let (own, other, calls) = (Rc::clone(&own), Rc::clone(&other), Rc::clone(&calls));
            store.subscribe(Box::new(move |_: &[Task]| {
                *calls.borrow_mut() += 1;
                if *calls.borrow() > 1 {
                    own.borrow_mut().take();
                    other.borrow_mut().take();
                }
            }))
        };
        *own.borrow_mut() = Some(sub);

        block_on(store.update(a.id, TaskPatch::progress(10))).unwrap();
        assert_eq!(*calls.borrow(), 2);
        let seen_after_first = seen.borrow().len();

        block_on(store.update(a.id, TaskPatch::progress(20))).unwrap();
        assert_eq!(*calls.borrow(), 2);
        assert_eq!(seen.borrow().len(), seen_after_first);
        assert!(store.inner.borrow().listeners.is_empty());
        assert!(store.inner.borrow().cancelled.is_empty());
    }

    #[test]
    fn rejected_writes_change_nothing() {
        let a = Task::new("A", d(10), d(12));
        let store = MemoryTaskStore::new(vec![a.clone()]);
        let (seen, _sub) = recording(&store);

        let err = block_on(store.update(a.id, TaskPatch::end(d(9)))).unwrap_err();
        assert!(matches!(err, MutationError::Validation(_)));

        store.set_unavailable(Some("offline".into()));
        let err = block_on(store.update(a.id, TaskPatch::end(d(14)))).unwrap_err();
        assert_eq!(err, MutationError::Backend("offline".into()));
        store.set_unavailable(None);

        store.set_read_only(true);
        let err = block_on(store.delete(a.id)).unwrap_err();
        assert_eq!(err, MutationError::PermissionDenied);

        assert_eq!(store.tasks(), vec![a]);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn dependencies_are_a_set() {
        let a = Task::new("A", d(1), d(2));
        let b = Task::new("B", d(3), d(4));
        let store = MemoryTaskStore::new(vec![a.clone(), b.clone()]);
        block_on(store.add_dependency(a.id, b.id)).unwrap();
        block_on(store.add_dependency(a.id, b.id)).unwrap();
        assert_eq!(store.tasks()[1].dependencies, vec![a.id]);
        block_on(store.remove_dependency(a.id, b.id)).unwrap();
        assert!(store.tasks()[1].dependencies.is_empty());

        assert_eq!(
            block_on(store.add_dependency(b.id, b.id)),
            Err(MutationError::Validation(ValidationError::SelfDependency))
        );
        assert!(store.tasks()[1].dependencies.is_empty());

        let ghost = TaskId::new_v4();
        assert_eq!(
            block_on(store.add_dependency(ghost, b.id)),
            Err(MutationError::NotFound(ghost))
        );
    }

    #[test]
    fn create_validates_and_appends() {
        let store = MemoryTaskStore::default();
        let id = block_on(store.create(NewTask {
            title: " Design ".into(),
            start: d(3),
            end: d(6),
        }))
        .unwrap();
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].title, "Design");
        assert_eq!(tasks[0].progress, 0);

        let bad = block_on(store.create(NewTask {
            title: "Backwards".into(),
            start: d(6),
            end: d(3),
        }));
        assert!(bad.is_err());
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn cascade_delete_unlinks_dependents_first() {
        let a = Task::new("A", d(1), d(2));
        let mut b = Task::new("B", d(3), d(4));
        b.dependencies.push(a.id);
        let store = MemoryTaskStore::new(vec![a.clone(), b.clone()]);
        block_on(delete_task_cascade(&store, &store.tasks(), a.id)).unwrap();
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].dependencies.is_empty());
    }

    #[test]
    fn persisted_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = MemoryTaskStore::open(&path).unwrap();
        let id = block_on(store.create(NewTask {
            title: "Kickoff".into(),
            start: d(2),
            end: d(2),
        }))
        .unwrap();
        let reopened = MemoryTaskStore::open(&path).unwrap();
        assert_eq!(reopened.tasks()[0].id, id);
    }
}
