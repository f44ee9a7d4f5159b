//! Shutdown signaling for long-running server tasks.
//!
//! Abstracts tokio's watch channels into a simple shutdown signal. The signal
//! carries no data payload, it only notifies subscribers that they should stop
//! accepting new work and terminate gracefully.

use tokio::sync::watch;

/// Transmitter side of a shutdown signal channel.
///
/// Sending `()` notifies every subscribed receiver at once. Dropping the
/// transmitter has the same effect, since receivers treat a closed channel as
/// a shutdown request.
pub type ShutdownTx = watch::Sender<()>;

/// Receiver side of a shutdown signal channel.
///
/// Awaiting [`watch::Receiver::changed`] resolves once shutdown has been
/// requested (or the transmitter was dropped).
pub type ShutdownRx = watch::Receiver<()>;

/// Creates a new shutdown signal channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (tx, rx)
}
