//! Background load tasks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};

use super::{AssetError, AssetSource};
use crate::ecs::EcsError;

/// Progress of a [`LoadTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTaskState {
    /// Worker still running
    Pending,
    /// Result was handed out
    Finished,
    /// Cancelled before the result was taken
    Cancelled,
}

/// A document being fetched and parsed on a worker thread
///
/// Dropping an unfinished task cancels it; the worker still runs to the
/// end of its current step but its result is discarded.
#[derive(Debug)]
pub struct LoadTask<T> {
    path: String,
    rx: Receiver<Result<T, AssetError>>,
    cancelled: Arc<AtomicBool>,
    state: LoadTaskState,
}

impl<T: Send + 'static> LoadTask<T> {
    /// Read `path` from `source` and parse it on a worker thread
    pub fn spawn<F>(source: Arc<dyn AssetSource>, path: impl Into<String>, parse: F) -> Self
    where
        F: FnOnce(&str) -> Result<T, EcsError> + Send + 'static,
    {
        let path = path.into();
        let (tx, rx) = bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_path = path.clone();
        let worker_cancelled = Arc::clone(&cancelled);
        thread::spawn(move || {
            let text = source.read_to_string(&worker_path);
            if worker_cancelled.load(Ordering::Acquire) {
                log::debug!("Dropping cancelled load of {}", worker_path);
                return;
            }
            let result = text.and_then(|text| {
                parse(&text).map_err(|source| AssetError::Parse {
                    path: worker_path.clone(),
                    source,
                })
            });
            // Receiver is gone when the task was dropped
            let _ = tx.send(result);
        });

        log::debug!("Started loading {}", path);
        Self {
            path,
            rx,
            cancelled,
            state: LoadTaskState::Pending,
        }
    }
}

impl<T> LoadTask<T> {
    /// Requested path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current state
    pub const fn state(&self) -> LoadTaskState {
        self.state
    }

    /// True while the worker has not delivered and the task is not cancelled
    pub fn is_pending(&self) -> bool {
        self.state == LoadTaskState::Pending
    }

    /// Check for a result without blocking
    ///
    /// Returns `None` while the worker is still running.
    pub fn poll(&mut self) -> Option<Result<T, AssetError>> {
        match self.state {
            LoadTaskState::Finished => return Some(Err(AssetError::AlreadyTaken(self.path.clone()))),
            LoadTaskState::Cancelled => return Some(Err(AssetError::Cancelled(self.path.clone()))),
            LoadTaskState::Pending => {}
        }
        match self.rx.try_recv() {
            Ok(result) => Some(self.finish(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.finish(Err(AssetError::WorkerLost(self.path.clone())))),
        }
    }

    /// Block until the result arrives or `timeout` elapses
    ///
    /// A timed out task is cancelled.
    pub fn wait(mut self, timeout: Duration) -> Result<T, AssetError> {
        if let Some(result) = self.poll() {
            return result;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(result) => self.finish(result),
            Err(RecvTimeoutError::Timeout) => {
                log::error!("Loading {} timed out after {:?}", self.path, timeout);
                self.cancel();
                Err(AssetError::Timeout {
                    path: self.path.clone(),
                    after: timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => self.finish(Err(AssetError::WorkerLost(self.path.clone()))),
        }
    }

    /// Abandon the load; a result that arrives later is discarded
    pub fn cancel(&mut self) {
        if self.state == LoadTaskState::Pending {
            log::info!("Cancelled loading {}", self.path);
            self.cancelled.store(true, Ordering::Release);
            self.state = LoadTaskState::Cancelled;
        }
    }

    fn finish(&mut self, result: Result<T, AssetError>) -> Result<T, AssetError> {
        self.state = LoadTaskState::Finished;
        match &result {
            Ok(_) => log::info!("Loaded {}", self.path),
            Err(err) => log::error!("{}", err),
        }
        result
    }
}

impl<T> Drop for LoadTask<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;
    use std::sync::Mutex;

    /// Source that blocks each read until the test releases it
    struct GatedSource {
        gate: Mutex<Receiver<()>>,
    }

    impl AssetSource for GatedSource {
        fn read_to_string(&self, path: &str) -> Result<String, AssetError> {
            let gate = self.gate.lock().map_err(|_| AssetError::WorkerLost(path.to_string()))?;
            let _ = gate.recv();
            Ok(format!("\"{path}\""))
        }
    }

    fn gated() -> (Sender<()>, Arc<dyn AssetSource>) {
        let (open, gate) = bounded(1);
        (open, Arc::new(GatedSource { gate: Mutex::new(gate) }))
    }

    fn parse_string(text: &str) -> Result<String, EcsError> {
        Ok(serde_json::from_str(text)?)
    }

    #[test]
    fn test_poll_is_pending_until_worker_delivers() {
        let (open, source) = gated();
        let mut task = LoadTask::spawn(source, "intro", parse_string);
        assert!(task.poll().is_none());
        assert!(task.is_pending());

        open.send(()).unwrap();
        let result = loop {
            if let Some(result) = task.poll() {
                break result;
            }
            thread::yield_now();
        };
        assert_eq!(result.unwrap(), "intro");
        assert_eq!(task.state(), LoadTaskState::Finished);
        assert!(matches!(task.poll(), Some(Err(AssetError::AlreadyTaken(_)))));
    }

    #[test]
    fn test_wait_times_out_and_cancels() {
        let (open, source) = gated();
        let task = LoadTask::spawn(source, "slow", parse_string);
        let err = task.wait(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, AssetError::Timeout { .. }));
        // Release the worker so it can observe the cancellation and exit
        let _ = open.send(());
    }

    #[test]
    fn test_cancelled_task_reports_cancellation() {
        let (open, source) = gated();
        let mut task = LoadTask::spawn(source, "skipped", parse_string);
        task.cancel();
        assert_eq!(task.state(), LoadTaskState::Cancelled);
        let _ = open.send(());
        assert!(matches!(task.poll(), Some(Err(AssetError::Cancelled(_)))));
    }
}
