//! Batch processing worker.
//!
//! The [`BatchProcessor`] owns exactly one background worker that pulls record
//! batches from an internal [`HandoffQueue`], sorts each batch in display
//! order and delivers it to a [`RecordSink`]. Processing is strictly
//! sequential: one batch at a time, in submission order.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::concurrency::queue::HandoffQueue;
use crate::error::{ErrorKind, RosterResult};
use crate::roster_error;
use crate::sink::RecordSink;
use crate::types::{Batch, display_order};

/// Cloneable handle for submitting batches to a running [`BatchProcessor`].
///
/// Receiving tasks hold a submitter rather than the processor itself, so the
/// coordinating task keeps exclusive ownership of the processor lifecycle.
#[derive(Debug, Clone)]
pub struct BatchSubmitter {
    queue: Arc<HandoffQueue<Batch>>,
}

impl BatchSubmitter {
    /// Hands a batch over to the processing stage.
    ///
    /// Ownership of the batch transfers to the batch worker. Never blocks the
    /// caller beyond the queue's brief state lock.
    pub async fn submit(&self, batch: Batch) {
        self.queue.push(batch).await;
    }
}

/// Handle for the spawned batch worker task.
#[derive(Debug)]
struct BatchWorkerHandle {
    handle: JoinHandle<()>,
}

impl BatchWorkerHandle {
    /// Waits for the batch worker to exit.
    ///
    /// Converts a worker panic into an error instead of propagating the panic
    /// into the coordinating task.
    async fn wait(self) -> RosterResult<()> {
        self.handle.await.map_err(|err| {
            roster_error!(
                ErrorKind::BatchWorkerPanic,
                "Batch worker panicked",
                source: err
            )
        })
    }
}

/// Owns the processing stage: one handoff queue and one background worker.
///
/// The worker runs until the queue is shut down and drained, then exits
/// cleanly. [`BatchProcessor::stop`] performs the cooperative shutdown and
/// joins the worker, guaranteeing that no orphaned task remains once it
/// returns and that every batch submitted before the stop was processed.
#[derive(Debug)]
pub struct BatchProcessor {
    queue: Arc<HandoffQueue<Batch>>,
    worker: Option<BatchWorkerHandle>,
}

impl BatchProcessor {
    /// Starts the processor with its background worker bound to `sink`.
    pub fn start<S>(sink: S) -> Self
    where
        S: RecordSink + Send + Sync + 'static,
    {
        let queue = Arc::new(HandoffQueue::new());

        let worker_queue = queue.clone();
        let handle = tokio::spawn(async move {
            process_loop(worker_queue, sink).await;
        });

        info!("batch worker started");

        Self {
            queue,
            worker: Some(BatchWorkerHandle { handle }),
        }
    }

    /// Returns a cloneable submission handle for receiving tasks.
    pub fn submitter(&self) -> BatchSubmitter {
        BatchSubmitter {
            queue: self.queue.clone(),
        }
    }

    /// Shuts down the queue and waits for the worker to exit.
    ///
    /// Idempotent: calling stop on an already stopped processor is a no-op.
    /// Batches submitted before the stop request are still processed before
    /// the worker exits.
    pub async fn stop(&mut self) -> RosterResult<()> {
        self.queue.stop().await;

        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.wait().await
    }
}

/// Main loop of the batch worker.
///
/// A [`None`] from the queue is the normal end-of-stream signal, not a
/// failure. A sink error is logged and the loop continues with the next
/// batch, so one bad delivery does not take the processing stage down.
async fn process_loop<S>(queue: Arc<HandoffQueue<Batch>>, sink: S)
where
    S: RecordSink + Send + Sync + 'static,
{
    while let Some(mut batch) = queue.wait_and_pop().await {
        info!(records = batch.len(), "processing received batch");

        batch.sort_by(display_order);
        if let Err(err) = sink.write_batch(batch).await {
            error!(error = %err, "failed to deliver processed batch to sink");
        }
    }

    info!("batch worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::types::Record;

    fn record(id: i64, first: &str, last: &str) -> Record {
        Record {
            id,
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            birth_date: "01.01.1990".to_owned(),
        }
    }

    #[tokio::test]
    async fn sorts_batches_in_display_order_before_delivery() {
        let sink = MemorySink::new();
        let mut processor = BatchProcessor::start(sink.clone());

        processor
            .submitter()
            .submit(vec![
                record(1, "Zoe", "Brown"),
                record(2, "Anna", "Adams"),
                record(3, "Anna", "Brown"),
            ])
            .await;
        processor.stop().await.unwrap();

        let batches = sink.batches().await;
        assert_eq!(batches.len(), 1);
        let names = batches[0]
            .iter()
            .map(|r| (r.last_name.as_str(), r.first_name.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![("Adams", "Anna"), ("Brown", "Anna"), ("Brown", "Zoe")]
        );
    }

    #[tokio::test]
    async fn preserves_submission_order_across_batches() {
        let sink = MemorySink::new();
        let mut processor = BatchProcessor::start(sink.clone());
        let submitter = processor.submitter();

        submitter.submit(vec![record(1, "First", "Batch")]).await;
        submitter.submit(vec![record(2, "Second", "Batch")]).await;
        submitter.submit(vec![record(3, "Third", "Batch")]).await;
        processor.stop().await.unwrap();

        let batches = sink.batches().await;
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0][0].id, 1);
        assert_eq!(batches[1][0].id, 2);
        assert_eq!(batches[2][0].id, 3);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let sink = MemorySink::new();
        let mut processor = BatchProcessor::start(sink.clone());

        processor.submitter().submit(vec![record(1, "A", "B")]).await;
        processor.stop().await.unwrap();
        processor.stop().await.unwrap();

        assert_eq!(sink.batches().await.len(), 1);
    }
}
