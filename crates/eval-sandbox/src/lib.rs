pub mod executor;
pub mod queue;
pub mod task;

pub use executor::Judge0Executor;
pub use queue::{poll_until_done, Queue, SandboxQueue};
pub use task::{CaseOutcome, ExecutionResult, Task, TaskStatus};
