//! Core build orchestration: task descriptors and the dependency executor.

pub mod registry;
pub mod task;

pub use registry::TaskRegistry;
pub use task::{RunContext, Task, TaskBody};
