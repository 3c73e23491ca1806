pub mod memory;
pub mod port;

pub use memory::MemoryTaskStore;
pub use port::{delete_task_cascade, Subscription, TaskChangeFeed, TaskListener, TaskMutationPort};
