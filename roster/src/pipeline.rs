//! Consumer session orchestration.
//!
//! A [`ConsumerPipeline`] wires the three concurrent roles of a receive
//! session together: the receiving task (the client transport), the batch
//! worker owned by the [`BatchProcessor`], and the coordinating task running
//! [`ConsumerPipeline::run`]. The coordinator waits for the receiver to finish
//! naturally before stopping the processor, so every submitted batch is
//! processed before the session ends.

use tracing::{error, info};

use crate::error::{ErrorKind, RosterResult};
use crate::roster_error;
use crate::transport::ClientTransport;
use crate::workers::batch::BatchProcessor;

/// One consumer session: a processing stage plus a client transport.
pub struct ConsumerPipeline {
    processor: BatchProcessor,
    transport: Box<dyn ClientTransport>,
}

impl ConsumerPipeline {
    /// Creates a pipeline from a started processor and a client transport.
    pub fn new(processor: BatchProcessor, transport: Box<dyn ClientTransport>) -> Self {
        Self {
            processor,
            transport,
        }
    }

    /// Runs the session end to end.
    ///
    /// Spawns the receiving task, waits for it to complete, then shuts down
    /// the processing stage and joins its worker. A transport failure is fatal
    /// to the session but the processor is still stopped and drained before
    /// the error is returned.
    pub async fn run(mut self) -> RosterResult<()> {
        info!("starting consumer session");

        let transport = self.transport;
        let receiver = tokio::spawn(async move { transport.run().await });

        let transport_result = match receiver.await {
            Ok(result) => result,
            Err(err) => Err(roster_error!(
                ErrorKind::InvalidState,
                "Receiving task panicked",
                source: err
            )),
        };
        if let Err(err) = &transport_result {
            error!(error = %err, "client transport session failed");
        }

        info!("receiver finished, stopping batch processor");
        let stop_result = self.processor.stop().await;

        transport_result.and(stop_result)?;

        info!("consumer session complete");

        Ok(())
    }
}
