//! Batch rendering sinks.
//!
//! A [`RecordSink`] is where the batch worker delivers each display-sorted
//! batch. The production sink renders records through tracing; the in-memory
//! sink captures batches so tests can inspect what the worker produced.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::RosterResult;
use crate::types::Batch;

/// Trait for components that receive processed record batches.
///
/// Batches arrive strictly sequentially, one at a time, already sorted in
/// display order. Implementations own the batch once the call returns.
pub trait RecordSink {
    /// Renders or stores one processed batch.
    fn write_batch(&self, batch: Batch) -> impl Future<Output = RosterResult<()>> + Send;
}

/// Sink that renders each record through the tracing subscriber.
///
/// This is the production default: one line per record with
/// `id firstName lastName birthDate`.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl RecordSink for LogSink {
    async fn write_batch(&self, batch: Batch) -> RosterResult<()> {
        info!(records = batch.len(), "rendering processed batch");
        for record in &batch {
            info!(
                "{} {} {} {}",
                record.id, record.first_name, record.last_name, record.birth_date
            );
        }

        Ok(())
    }
}

/// In-memory sink for testing and development purposes.
///
/// Stores every delivered batch in order. All data is held in memory and lost
/// when the process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Batch>>>,
}

impl MemorySink {
    /// Creates a new empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all batches delivered to this sink, in delivery order.
    pub async fn batches(&self) -> Vec<Batch> {
        let batches = self.batches.lock().await;
        batches.clone()
    }
}

impl RecordSink for MemorySink {
    async fn write_batch(&self, batch: Batch) -> RosterResult<()> {
        let mut batches = self.batches.lock().await;
        batches.push(batch);

        Ok(())
    }
}
