use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::error::{ValidationError, require_non_empty};

const QUEUE_DEPTH: usize = 256;

/// A request to re-extract one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexJob {
    pub file_id: String,
}

struct Worker {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Hands reindex requests to a background worker.
///
/// The worker currently only records the hand-off; the OCR pipeline that would
/// consume these jobs lives outside this crate.
#[derive(Clone)]
pub struct ReindexTrigger {
    job_tx: mpsc::Sender<ReindexJob>,
    worker: Arc<Mutex<Option<Worker>>>,
}

impl ReindexTrigger {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        Self::spawn_with(|job| {
            info!(file_id = %job.file_id, "reindex requested; handing off to ingestion");
        })
    }

    fn spawn_with<F>(handoff: F) -> Self
    where
        F: Fn(ReindexJob) + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<ReindexJob>(QUEUE_DEPTH);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut jobs = ReceiverStream::new(job_rx);
            loop {
                tokio::select! {
                    job = jobs.next() => match job {
                        Some(job) => handoff(job),
                        None => break,
                    },
                    _ = &mut shutdown_rx => {
                        // Stop accepting, then drain what is already queued.
                        jobs.close();
                        while let Some(job) = jobs.next().await {
                            handoff(job);
                        }
                        break;
                    }
                }
            }
            info!("Reindex worker stopped");
        });
        Self {
            job_tx,
            worker: Arc::new(Mutex::new(Some(Worker {
                shutdown_tx,
                handle,
            }))),
        }
    }

    /// Wrap an existing sender; jobs are delivered to whoever owns the receiver.
    pub fn with_sender(job_tx: mpsc::Sender<ReindexJob>) -> Self {
        Self {
            job_tx,
            worker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn reindex(&self, file_id: &str) -> Result<(), ValidationError> {
        let file_id = require_non_empty("file_id", file_id)?;
        let job = ReindexJob {
            file_id: file_id.to_string(),
        };
        if let Err(e) = self.job_tx.try_send(job) {
            warn!(file_id, "reindex job dropped: {}", e);
        }
        Ok(())
    }

    /// Stop the worker once every queued job has been handed off.
    ///
    /// Later calls, on this trigger or any clone, return immediately.
    pub async fn shutdown(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        let _ = worker.shutdown_tx.send(());
        if let Err(e) = worker.handle.await {
            warn!("reindex worker ended abnormally: {}", e);
        }
    }
}
