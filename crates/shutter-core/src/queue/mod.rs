//! Queue module: the persistent task list and its policy.

mod policy;
mod task_queue;

pub use policy::QueuePolicy;
pub use task_queue::{Appended, Durability, TaskQueue};
