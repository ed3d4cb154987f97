//! Background processing tasks and their status registry.

mod manager;
mod registry;

pub use manager::{PipelineSettings, TaskHandle, TaskManager};
pub use registry::{TaskId, TaskRecord, TaskRegistry, TaskStatus};
