use async_trait::async_trait;
use tracing::debug;

use crate::error::MutationError;
use crate::model::{NewTask, Task, TaskId, TaskPatch};

/// Writes against the shared task store.
///
/// Futures resolve on success and fail with a [`MutationError`]. Everything
/// runs on the UI thread, so implementations need not be `Send`.
#[async_trait(?Send)]
pub trait TaskMutationPort {
    async fn update(&self, task_id: TaskId, patch: TaskPatch) -> Result<(), MutationError>;

    /// Record that `dependent` cannot finish before `prerequisite`.
    async fn add_dependency(
        &self,
        prerequisite: TaskId,
        dependent: TaskId,
    ) -> Result<(), MutationError>;

    async fn remove_dependency(
        &self,
        prerequisite: TaskId,
        dependent: TaskId,
    ) -> Result<(), MutationError>;

    async fn create(&self, task: NewTask) -> Result<TaskId, MutationError>;

    async fn delete(&self, task_id: TaskId) -> Result<(), MutationError>;
}

pub type TaskListener = Box<dyn FnMut(&[Task])>;

/// Pushes the full task list to subscribers whenever it changes.
pub trait TaskChangeFeed {
    fn subscribe(&self, listener: TaskListener) -> Subscription;
}

/// Keeps a feed listener registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Delete a task after unlinking it from every task that depends on it.
pub async fn delete_task_cascade(
    port: &dyn TaskMutationPort,
    tasks: &[Task],
    task_id: TaskId,
) -> Result<(), MutationError> {
    for dependent in tasks.iter().filter(|t| t.depends_on(task_id)) {
        debug!(task = %task_id, dependent = %dependent.id, "unlinking before delete");
        port.remove_dependency(task_id, dependent.id).await?;
    }
    port.delete(task_id).await
}
