use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use log::{debug, error};
use parking_lot::Mutex;
use tokio::{
    runtime::{Builder, Runtime},
    sync::watch,
    time,
};

use crate::error::{EngineErr, Result};

/// The process wide identifier of an asynchronous operation.
pub type OperationId = u64;

/// The lifecycle of an asynchronous operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    Running,
    Completed,
    Failed(EngineErr),
}

impl OperationState {
    fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Runs long operations in the background and lets callers await them.
///
/// Every operation publishes its state on a watch channel. An operation can be
/// awaited until it finishes once, after that its id is forgotten.
pub struct OperationTracker {
    runtime: Runtime,
    next_id: AtomicU64,
    operations: Mutex<HashMap<OperationId, watch::Receiver<OperationState>>>,
}

impl OperationTracker {
    /// Creates a new `OperationTracker`.
    ///
    /// # Arguments
    /// * `threads` - The amount of threads driving the operations.
    ///
    /// # Returns
    /// The tracker or an `InternalError` if its runtime can't be started.
    pub fn new(threads: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads.max(1))
            .thread_name("async-operation")
            .enable_time()
            .build()
            .map_err(|e| EngineErr::Internal(format!("failed to start the async runtime: {e}")))?;

        Ok(Self {
            runtime,
            next_id: AtomicU64::new(1),
            operations: Mutex::default(),
        })
    }

    /// Starts `job` in the background.
    ///
    /// # Arguments
    /// * `name` - What the operation does, used in diagnostics.
    /// * `job` - The blocking work of the operation.
    ///
    /// # Returns
    /// The id of the new operation.
    pub fn submit<F>(&self, name: &'static str, job: F) -> OperationId
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(OperationState::Running);
        self.operations.lock().insert(id, rx);

        debug!(operation = id; "{name} submitted");
        self.runtime.spawn_blocking(move || {
            let state = match job() {
                Ok(()) => {
                    debug!(operation = id; "{name} completed");
                    OperationState::Completed
                }
                Err(e) => {
                    error!(operation = id; "{name} failed: {e}");
                    OperationState::Failed(e)
                }
            };

            let _ = tx.send(state);
        });

        id
    }

    /// The current state of an operation, without consuming it.
    pub fn state(&self, id: OperationId) -> Result<OperationState> {
        self.operations
            .lock()
            .get(&id)
            .map(|rx| OperationState::clone(&rx.borrow()))
            .ok_or_else(|| EngineErr::not_found("operation", id.to_string()))
    }

    /// Blocks until the operation finishes or `timeout` elapses.
    ///
    /// A finished operation is consumed, awaiting it again fails with `NotFound`.
    ///
    /// # Arguments
    /// * `id` - The operation to await.
    /// * `timeout` - The longest time to wait, `None` waits for as long as it takes.
    ///
    /// # Returns
    /// The final state of the operation, a `Timeout` error if it is still
    /// running, or a `NotFound` error for unknown or consumed ids.
    pub fn await_operation(
        &self,
        id: OperationId,
        timeout: Option<Duration>,
    ) -> Result<OperationState> {
        let mut rx = self
            .operations
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineErr::not_found("operation", id.to_string()))?;

        let finished = self.runtime.block_on(async {
            let wait = rx.wait_for(OperationState::is_finished);

            match timeout {
                Some(timeout) => time::timeout(timeout, wait)
                    .await
                    .map(|state| state.map(|s| OperationState::clone(&s))),
                None => Ok(wait.await.map(|s| OperationState::clone(&s))),
            }
        });

        let state = match finished {
            Err(_) => return Err(EngineErr::Timeout { operation: id }),
            Ok(Ok(state)) => state,
            Ok(Err(_)) => OperationState::Failed(EngineErr::Internal(format!(
                "operation {id} stopped without reporting its result"
            ))),
        };

        self.operations.lock().remove(&id);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread};

    use super::*;

    #[test]
    fn ids_increase_monotonically() {
        let tracker = OperationTracker::new(1).unwrap();
        let a = tracker.submit("noop", || Ok(()));
        let b = tracker.submit("noop", || Ok(()));

        assert!(b > a);
    }

    #[test]
    fn timeouts_leave_the_operation_running() {
        let tracker = OperationTracker::new(1).unwrap();
        let (release, gate) = mpsc::channel::<()>();
        let id = tracker.submit("gated", move || {
            let _ = gate.recv();
            Ok(())
        });

        let err = tracker
            .await_operation(id, Some(Duration::ZERO))
            .unwrap_err();
        assert_eq!(err, EngineErr::Timeout { operation: id });
        assert_eq!(tracker.state(id).unwrap(), OperationState::Running);

        release.send(()).unwrap();
        assert_eq!(
            tracker.await_operation(id, None).unwrap(),
            OperationState::Completed
        );

        let err = tracker.await_operation(id, None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn failures_are_reported() {
        let tracker = OperationTracker::new(1).unwrap();
        let id = tracker.submit("failing", || Err(EngineErr::invalid("bad batch")));

        let state = tracker
            .await_operation(id, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(state, OperationState::Failed(EngineErr::invalid("bad batch")));
    }

    #[test]
    fn panicking_jobs_fail() {
        let tracker = OperationTracker::new(1).unwrap();
        let id = tracker.submit("panicking", || panic!("boom"));

        thread::sleep(Duration::from_millis(10));
        let state = tracker.await_operation(id, None).unwrap();
        assert!(matches!(state, OperationState::Failed(EngineErr::Internal(_))));
    }
}
