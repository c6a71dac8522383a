//! FIFO sandbox queue (spec.md §4.C), grounded on
//! `sa_gateway::runtime::tasks::{TaskStore, TaskRunner}`'s insert/poll/update
//! shape, simplified from semaphore-per-session concurrency (tasks here
//! aren't tied to a session lock) to a fixed-size worker pool draining a
//! shared FIFO channel — this domain runs one kind of job (compile+run),
//! not arbitrary per-session turns.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use eval_domain::{Error, Result};

use crate::executor::Judge0Executor;
use crate::task::{ExecutionResult, Task, TaskStatus};

struct Entry {
    status: TaskStatus,
    result: Option<ExecutionResult>,
}

/// Submits tasks and polls their outcome. Implemented by `SandboxQueue`
/// (in-process FIFO) today; `USE_REDIS_QUEUE=true` names a second
/// implementation of this trait for a shared external queue, not yet wired
/// to a concrete backend (see DESIGN.md).
#[async_trait::async_trait]
pub trait Queue: Send + Sync {
    async fn enqueue(&self, task: Task) -> Uuid;
    fn status(&self, task_id: &Uuid) -> Option<TaskStatus>;
    fn result(&self, task_id: &Uuid) -> Option<ExecutionResult>;
}

/// In-process FIFO queue backed by a fixed pool of worker tasks pulling
/// from an `mpsc` channel. Grounded on `TaskRunner::enqueue`'s
/// spawn-and-update pattern, but the concurrency unit is a worker count,
/// not a per-session semaphore.
pub struct SandboxQueue {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    sender: mpsc::UnboundedSender<Task>,
}

impl SandboxQueue {
    pub fn new(executor: Arc<Judge0Executor>, worker_count: usize) -> Self {
        let entries: Arc<RwLock<HashMap<Uuid, Entry>>> = Arc::new(RwLock::new(HashMap::new()));
        let (sender, receiver) = mpsc::unbounded_channel::<Task>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        for worker_id in 0..worker_count.max(1) {
            let entries = entries.clone();
            let receiver = receiver.clone();
            let executor = executor.clone();
            tokio::spawn(async move {
                loop {
                    let task = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(task) = task else { break };
                    let task_id = task.task_id;
                    tracing::debug!(worker_id, %task_id, "sandbox worker picked up task");
                    entries
                        .write()
                        .entry(task_id)
                        .and_modify(|e| e.status = TaskStatus::Running);

                    let outcome = executor.run(&task).await;
                    let (status, result) = match outcome {
                        Ok(result) => (TaskStatus::Done, Some(result)),
                        Err(e) => {
                            tracing::warn!(%task_id, error = %e, "sandbox task failed");
                            (TaskStatus::Failed, None)
                        }
                    };
                    entries.write().insert(task_id, Entry { status, result });
                }
            });
        }

        Self { entries, sender }
    }
}

#[async_trait::async_trait]
impl Queue for SandboxQueue {
    async fn enqueue(&self, task: Task) -> Uuid {
        let task_id = task.task_id;
        self.entries.write().insert(
            task_id,
            Entry {
                status: TaskStatus::Pending,
                result: None,
            },
        );
        // An unbounded channel with workers alive never errors; if it did
        // the queue has no workers left to serve this task.
        if self.sender.send(task).is_err() {
            self.entries.write().insert(
                task_id,
                Entry {
                    status: TaskStatus::Failed,
                    result: None,
                },
            );
        }
        task_id
    }

    fn status(&self, task_id: &Uuid) -> Option<TaskStatus> {
        self.entries.read().get(task_id).map(|e| e.status)
    }

    fn result(&self, task_id: &Uuid) -> Option<ExecutionResult> {
        self.entries.read().get(task_id).and_then(|e| e.result.clone())
    }
}

/// Poll a queued task to completion at the configured interval, up to
/// `cap_ms`. Grounded on `execution.py`'s `poll_interval=0.5`/`max_wait=30`
/// loop.
pub async fn poll_until_done(
    queue: &dyn Queue,
    task_id: Uuid,
    interval_ms: u64,
    cap_ms: u64,
) -> Result<ExecutionResult> {
    let start = tokio::time::Instant::now();
    let cap = std::time::Duration::from_millis(cap_ms);
    let interval = std::time::Duration::from_millis(interval_ms);
    loop {
        match queue.status(&task_id) {
            Some(TaskStatus::Done) => {
                return queue
                    .result(&task_id)
                    .ok_or_else(|| Error::SandboxFailure("task done but no result recorded".into()));
            }
            Some(TaskStatus::Failed) => {
                return Err(Error::SandboxFailure(format!("task {task_id} failed")));
            }
            _ => {}
        }
        if start.elapsed() >= cap {
            return Err(Error::Timeout(format!(
                "sandbox task {task_id} did not complete within {cap_ms}ms"
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Judge0Executor;

    fn queue_with_stub_executor() -> SandboxQueue {
        let executor = Arc::new(Judge0Executor::stub());
        SandboxQueue::new(executor, 2)
    }

    #[tokio::test]
    async fn enqueue_then_poll_reaches_done() {
        let queue = queue_with_stub_executor();
        let task = Task::new("print(1)", "python");
        let task_id = queue.enqueue(task).await;

        let result = poll_until_done(&queue, task_id, 10, 2000).await.unwrap();
        assert!(result.succeeded);
    }

    #[tokio::test]
    async fn poll_times_out_when_task_unknown() {
        let queue = queue_with_stub_executor();
        let err = poll_until_done(&queue, Uuid::new_v4(), 10, 50).await;
        assert!(matches!(err, Err(Error::Timeout(_))));
    }
}
