//! Transport capability contracts and implementations.
//!
//! The two transport families, the publish/subscribe bus ([`bus`]) and the
//! single-shot document transfer ([`document`]), are interchangeable behind
//! the [`ServerTransport`] and [`ClientTransport`] contracts. Transport choice
//! is a runtime parameter and does not affect the downstream processing stage.

use async_trait::async_trait;

use crate::error::RosterResult;

pub mod bus;
pub mod document;

/// Serving side of a transport.
///
/// [`ServerTransport::run`] performs the full serving lifecycle and returns
/// when the session is complete (bus) or once a shutdown has been requested
/// (document).
#[async_trait]
pub trait ServerTransport: Send {
    async fn run(self: Box<Self>) -> RosterResult<()>;
}

/// Receiving side of a transport.
///
/// [`ClientTransport::run`] performs the full receive lifecycle: obtaining the
/// record collection from the peer and submitting the resulting batch to the
/// processing stage, returning when the session is complete.
#[async_trait]
pub trait ClientTransport: Send {
    async fn run(self: Box<Self>) -> RosterResult<()>;
}
