//! Runs mutation-port futures on the UI thread without blocking it.
//!
//! Each call spawns one future onto a [`LocalPool`]. The app polls the pool
//! once per frame and drains the finished [`Outcome`]s into the planner.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use tracing::{debug, error};

use crate::error::MutationError;
use crate::interaction::{CommitTicket, DependencyEdge, PendingCommit};
use crate::model::{NewTask, Task, TaskId, TaskPatch};
use crate::store::{delete_task_cascade, TaskMutationPort};

/// A finished port call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    DragCommitted {
        ticket: CommitTicket,
        task_id: TaskId,
        result: Result<(), MutationError>,
    },
    Linked {
        edge: DependencyEdge,
        result: Result<(), MutationError>,
    },
    Unlinked {
        edge: DependencyEdge,
        result: Result<(), MutationError>,
    },
    Created {
        title: String,
        result: Result<TaskId, MutationError>,
    },
    Renamed {
        task_id: TaskId,
        result: Result<(), MutationError>,
    },
    Deleted {
        task_id: TaskId,
        result: Result<(), MutationError>,
    },
}

pub struct Dispatcher {
    port: Rc<dyn TaskMutationPort>,
    pool: LocalPool,
    spawner: LocalSpawner,
    finished: Rc<RefCell<Vec<Outcome>>>,
}

impl Dispatcher {
    pub fn new(port: Rc<dyn TaskMutationPort>) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            port,
            pool,
            spawner,
            finished: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn spawn(&self, work: impl Future<Output = Outcome> + 'static) {
        let finished = Rc::clone(&self.finished);
        let spawned = self.spawner.spawn_local(async move {
            let outcome = work.await;
            finished.borrow_mut().push(outcome);
        });
        if let Err(e) = spawned {
            error!(%e, "could not schedule store write");
        }
    }

    pub fn commit_drag(&self, commit: PendingCommit) {
        let port = Rc::clone(&self.port);
        debug!(task = %commit.task_id, ticket = ?commit.ticket, "dispatching drag commit");
        self.spawn(async move {
            let result = port.update(commit.task_id, commit.patch).await;
            Outcome::DragCommitted {
                ticket: commit.ticket,
                task_id: commit.task_id,
                result,
            }
        });
    }

    pub fn link(&self, edge: DependencyEdge) {
        let port = Rc::clone(&self.port);
        self.spawn(async move {
            let result = port.add_dependency(edge.prerequisite, edge.dependent).await;
            Outcome::Linked { edge, result }
        });
    }

    pub fn unlink(&self, edge: DependencyEdge) {
        let port = Rc::clone(&self.port);
        self.spawn(async move {
            let result = port
                .remove_dependency(edge.prerequisite, edge.dependent)
                .await;
            Outcome::Unlinked { edge, result }
        });
    }

    pub fn create(&self, task: NewTask) {
        let port = Rc::clone(&self.port);
        self.spawn(async move {
            let title = task.title.trim().to_string();
            let result = port.create(task).await;
            Outcome::Created { title, result }
        });
    }

    pub fn rename(&self, task_id: TaskId, title: String) {
        let port = Rc::clone(&self.port);
        self.spawn(async move {
            let result = port.update(task_id, TaskPatch::title(title)).await;
            Outcome::Renamed { task_id, result }
        });
    }

    /// Delete `task_id`, unlinking it from its dependents in `tasks` first.
    pub fn delete(&self, task_id: TaskId, tasks: Vec<Task>) {
        let port = Rc::clone(&self.port);
        self.spawn(async move {
            let result = delete_task_cascade(port.as_ref(), &tasks, task_id).await;
            Outcome::Deleted { task_id, result }
        });
    }

    /// Poll every spawned write as far as it can go without blocking.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Take the outcomes finished since the last drain, in completion order.
    pub fn drain(&self) -> Vec<Outcome> {
        std::mem::take(&mut *self.finished.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTaskStore;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn nothing_runs_until_polled() {
        let a = Task::new("A", d(1), d(2));
        let store = MemoryTaskStore::new(vec![a.clone()]);
        let mut dispatcher = Dispatcher::new(Rc::new(store.clone()));

        dispatcher.rename(a.id, "Renamed".into());
        assert!(dispatcher.drain().is_empty());
        assert_eq!(store.tasks()[0].title, "A");

        dispatcher.run_until_stalled();
        assert_eq!(
            dispatcher.drain(),
            vec![Outcome::Renamed {
                task_id: a.id,
                result: Ok(())
            }]
        );
        assert_eq!(store.tasks()[0].title, "Renamed");
    }

    #[test]
    fn failures_come_back_as_outcomes() {
        let a = Task::new("A", d(1), d(2));
        let store = MemoryTaskStore::new(vec![a.clone()]);
        store.set_unavailable(Some("offline".into()));
        let mut dispatcher = Dispatcher::new(Rc::new(store));

        let edge = DependencyEdge {
            prerequisite: a.id,
            dependent: a.id,
        };
        dispatcher.unlink(edge);
        dispatcher.run_until_stalled();
        assert_eq!(
            dispatcher.drain(),
            vec![Outcome::Unlinked {
                edge,
                result: Err(MutationError::Backend("offline".into()))
            }]
        );
    }

    #[test]
    fn delete_cascades() {
        let a = Task::new("A", d(1), d(2));
        let mut b = Task::new("B", d(3), d(4));
        b.dependencies.push(a.id);
        let store = MemoryTaskStore::new(vec![a.clone(), b]);
        let mut dispatcher = Dispatcher::new(Rc::new(store.clone()));

        dispatcher.delete(a.id, store.tasks());
        dispatcher.run_until_stalled();
        assert!(matches!(
            dispatcher.drain().as_slice(),
            [Outcome::Deleted { result: Ok(()), .. }]
        ));
        let left = store.tasks();
        assert_eq!(left.len(), 1);
        assert!(left[0].dependencies.is_empty());
    }
}
