pub use router::OutputRouter;
pub use scheduler::TaskScheduler;
pub use task::{RegionTask, TaskContext, TaskKind, TaskState};

mod router;
mod scheduler;
mod task;
