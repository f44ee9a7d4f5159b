//! Concurrency utilities for coordinating the receiving, processing and
//! coordinating tasks.
//!
//! The [`queue`] module implements the handoff queue that decouples a
//! network-receiving task from the batch worker, with a cooperative shutdown
//! protocol that loses no data and never blocks indefinitely. The [`shutdown`]
//! module provides the watch-based signal used to stop long-running servers.

pub mod queue;
pub mod shutdown;
