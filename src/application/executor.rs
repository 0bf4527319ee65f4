use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, OwnedMutexGuard};
use tracing::{error, info};

use crate::domain::{DownloadOutcome, FetchPlan, ProgressEvent};
use crate::engine::{EngineUpdate, MediaEngine};

type LockKey = (PathBuf, String);

/// Serializes downloads that would write the same file.
#[derive(Clone, Default)]
pub struct DestinationLocks {
    inner: Arc<Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DestinationLocks {
    pub async fn acquire(&self, destination: &Path, url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((destination.to_path_buf(), url.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Rebases byte counts when the engine moves on to the next stream (for
/// example audio after video), so `bytes_done` never goes backwards.
#[derive(Debug, Default)]
struct CumulativeBytes {
    carried: u64,
    last_done: u64,
    last_total: Option<u64>,
}

impl CumulativeBytes {
    fn observe(&mut self, bytes_done: u64, bytes_total: Option<u64>) -> ProgressEvent {
        // Engines that never close a part explicitly still restart from zero.
        if bytes_done < self.last_done {
            self.next_part();
        }
        self.last_done = bytes_done;
        self.last_total = bytes_total;

        let done = self.carried + bytes_done;
        ProgressEvent::Downloading {
            bytes_done: done,
            bytes_total: bytes_total.map(|total| (self.carried + total).max(done)),
        }
    }

    fn finish_part(&mut self, bytes_done: u64, bytes_total: Option<u64>) -> ProgressEvent {
        let event = self.observe(bytes_done, bytes_total);
        self.next_part();
        event
    }

    fn next_part(&mut self) {
        self.carried += self
            .last_total
            .unwrap_or(self.last_done)
            .max(self.last_done);
        self.last_done = 0;
        self.last_total = None;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs one fetch plan on a background task and reports exactly one
/// terminal event through `on_progress`.
pub struct DownloadExecutor {
    engine: Arc<dyn MediaEngine>,
    locks: DestinationLocks,
}

impl DownloadExecutor {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            locks: DestinationLocks::default(),
        }
    }

    pub async fn execute<F>(
        &self,
        url: String,
        plan: FetchPlan,
        mut on_progress: F,
    ) -> DownloadOutcome
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let engine = Arc::clone(&self.engine);
        info!(
            engine = engine.name(),
            %url,
            selector = %plan.stream_selector,
            output = %plan.output_template.display(),
            "Starting download"
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut task = tokio::spawn(async move { engine.fetch(&url, &plan, tx).await });
        let mut bytes = CumulativeBytes::default();
        let mut forward = |update: EngineUpdate| {
            let event = match update {
                EngineUpdate::Downloading {
                    bytes_done,
                    bytes_total,
                } => bytes.observe(bytes_done, bytes_total),
                EngineUpdate::PartFinished {
                    bytes_done,
                    bytes_total,
                } => bytes.finish_part(bytes_done, bytes_total),
                EngineUpdate::Processing => ProgressEvent::Processing,
            };
            on_progress(event);
        };

        let joined = loop {
            tokio::select! {
                Some(update) = rx.recv() => forward(update),
                joined = &mut task => break joined,
            }
        };
        while let Ok(update) = rx.try_recv() {
            forward(update);
        }

        let outcome = match joined {
            Ok(Ok(())) => DownloadOutcome::Completed,
            Ok(Err(e)) => DownloadOutcome::Failed {
                message: e.to_string(),
            },
            Err(e) if e.is_panic() => DownloadOutcome::Failed {
                message: format!("engine crashed: {}", panic_message(e.into_panic())),
            },
            Err(e) => DownloadOutcome::Failed {
                message: format!("download task aborted: {}", e),
            },
        };

        match &outcome {
            DownloadOutcome::Completed => info!("Download complete"),
            DownloadOutcome::Failed { message } => error!(%message, "Download failed"),
        }

        on_progress(outcome.clone().into());
        outcome
    }

    /// Like [`execute`](Self::execute), but waits for any in-flight download of
    /// the same URL into the same directory.
    pub async fn execute_locked<F>(
        &self,
        destination: &Path,
        url: String,
        plan: FetchPlan,
        on_progress: F,
    ) -> DownloadOutcome
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let _guard = self.locks.acquire(destination, &url).await;
        self.execute(url, plan, on_progress).await
    }
}
