//! Publish/subscribe bus transport.
//!
//! The bus distributes the record collection as a stream of topic-prefixed
//! text frames over TCP, one frame per line. A plain publish channel cannot
//! guarantee delivery to a subscriber that joins after publishing starts, so
//! the protocol adds a rendezvous channel: the server blocks until exactly one
//! synchronization request arrives and only then begins publishing. The client
//! opens its subscription before performing the rendezvous, which closes the
//! late-joiner gap entirely.
//!
//! The stream is unbounded from the subscriber's point of view, so the server
//! terminates it with a sentinel frame (`RECORDS|END`) after the last record.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::config::BusConfig;
use crate::error::{ErrorKind, RosterResult};
use crate::repository::RecordRepository;
use crate::transport::{ClientTransport, ServerTransport};
use crate::types::{Batch, Record};
use crate::workers::batch::BatchSubmitter;
use crate::{bail, roster_error};

/// Topic prefix shared by data and sentinel frames. Subscribers filter
/// received frames by this prefix.
pub const TOPIC: &str = "RECORDS|";

/// Payload of the terminal frame marking end of stream.
pub const END_SENTINEL: &str = "END";

/// Serving side of the bus transport.
///
/// Binds both channels up front so the bound addresses are known before the
/// session runs, then serves exactly one subscriber session: rendezvous,
/// publish, sentinel, return. The transport does not loop to serve a second
/// client.
#[derive(Debug)]
pub struct BusServer {
    repository: RecordRepository,
    publish_listener: TcpListener,
    rendezvous_listener: TcpListener,
}

impl BusServer {
    /// Binds the publish and rendezvous channels.
    pub async fn bind(config: &BusConfig, repository: RecordRepository) -> RosterResult<Self> {
        let publish_listener = TcpListener::bind(&config.publish_addr)
            .await
            .map_err(|err| {
                roster_error!(
                    ErrorKind::TransportConnectionFailed,
                    "Failed to bind the bus publish channel",
                    &config.publish_addr,
                    source: err
                )
            })?;

        let rendezvous_listener = TcpListener::bind(&config.rendezvous_addr)
            .await
            .map_err(|err| {
                roster_error!(
                    ErrorKind::TransportConnectionFailed,
                    "Failed to bind the bus rendezvous channel",
                    &config.rendezvous_addr,
                    source: err
                )
            })?;

        Ok(Self {
            repository,
            publish_listener,
            rendezvous_listener,
        })
    }

    /// Returns the bound publish channel address.
    pub fn publish_addr(&self) -> RosterResult<SocketAddr> {
        Ok(self.publish_listener.local_addr()?)
    }

    /// Returns the bound rendezvous channel address.
    pub fn rendezvous_addr(&self) -> RosterResult<SocketAddr> {
        Ok(self.rendezvous_listener.local_addr()?)
    }

    /// Runs one full subscriber session.
    pub async fn run(self) -> RosterResult<()> {
        info!("bus server waiting for one subscriber to synchronize");

        // Publishing is gated on the rendezvous: nothing is written to the
        // publish channel until the subscriber has signalled readiness.
        let (sync_stream, sync_peer) = self.rendezvous_listener.accept().await.map_err(|err| {
            roster_error!(
                ErrorKind::TransportReceiveFailed,
                "Failed to accept a rendezvous connection",
                source: err
            )
        })?;
        answer_rendezvous(sync_stream).await?;
        info!(peer = %sync_peer, "subscriber synchronized, publishing records");

        // The subscriber connects the publish channel before the rendezvous,
        // so its connection is already pending here.
        let (publish_stream, _) = self.publish_listener.accept().await.map_err(|err| {
            roster_error!(
                ErrorKind::TransportReceiveFailed,
                "Failed to accept the publish connection",
                source: err
            )
        })?;
        let mut publisher = BufWriter::new(publish_stream);

        let records = self.repository.load_unique_records().await;
        let mut published = 0usize;
        for record in &records {
            // A record whose names contain internal whitespace cannot be
            // framed with four tokens; it is skipped rather than published as
            // a frame the subscriber is guaranteed to drop.
            let payload = match record.to_wire() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, "skipping record that does not fit the wire framing");
                    continue;
                }
            };

            publish_frame(&mut publisher, &payload).await?;
            published += 1;
        }

        publish_frame(&mut publisher, END_SENTINEL).await?;
        publisher.flush().await.map_err(|err| {
            roster_error!(
                ErrorKind::TransportSendFailed,
                "Failed to flush the publish channel",
                source: err
            )
        })?;

        info!(published, "bus session complete, shutting down");

        Ok(())
    }
}

#[async_trait]
impl ServerTransport for BusServer {
    async fn run(self: Box<Self>) -> RosterResult<()> {
        (*self).run().await
    }
}

/// Performs the server half of the rendezvous: read one request line, reply
/// with an empty acknowledgment. The exchange carries no data.
async fn answer_rendezvous(stream: TcpStream) -> RosterResult<()> {
    let (read_half, mut write_half) = stream.into_split();

    let mut requests = BufReader::new(read_half).lines();
    let request = requests.next_line().await.map_err(|err| {
        roster_error!(
            ErrorKind::TransportReceiveFailed,
            "Failed to read the rendezvous request",
            source: err
        )
    })?;
    if request.is_none() {
        bail!(
            ErrorKind::TransportReceiveFailed,
            "Rendezvous peer disconnected before sending a request"
        );
    }

    write_half.write_all(b"\n").await.map_err(|err| {
        roster_error!(
            ErrorKind::TransportSendFailed,
            "Failed to send the rendezvous acknowledgment",
            source: err
        )
    })?;

    Ok(())
}

/// Writes one topic-prefixed frame to the publish channel.
async fn publish_frame(
    publisher: &mut BufWriter<TcpStream>,
    payload: &str,
) -> RosterResult<()> {
    let frame = format!("{TOPIC}{payload}\n");
    publisher.write_all(frame.as_bytes()).await.map_err(|err| {
        roster_error!(
            ErrorKind::TransportSendFailed,
            "Failed to publish a frame",
            source: err
        )
    })?;

    Ok(())
}

/// Receiving side of the bus transport.
///
/// Subscribes to the publish channel, performs the rendezvous, receives frames
/// until the sentinel and submits the accumulated batch to the processing
/// stage.
#[derive(Debug)]
pub struct BusClient {
    publish_addr: String,
    rendezvous_addr: String,
    submitter: BatchSubmitter,
}

impl BusClient {
    /// Creates a client for the given bus configuration.
    pub fn new(config: &BusConfig, submitter: BatchSubmitter) -> Self {
        Self {
            publish_addr: config.publish_addr.clone(),
            rendezvous_addr: config.rendezvous_addr.clone(),
            submitter,
        }
    }

    /// Runs one full subscribe session.
    ///
    /// A transport-level receive failure is fatal to this session: it is
    /// returned to the caller and the accumulated batch is discarded. A decode
    /// failure of a single frame is not: the frame is logged and skipped and
    /// the session continues.
    pub async fn run(self) -> RosterResult<()> {
        // Subscribe before the rendezvous so that the subscription is active
        // by the time the server starts publishing.
        let publish_stream = TcpStream::connect(&self.publish_addr).await.map_err(|err| {
            roster_error!(
                ErrorKind::TransportConnectionFailed,
                "Failed to connect to the bus publish channel",
                &self.publish_addr,
                source: err
            )
        })?;
        let mut frames = BufReader::new(publish_stream).lines();

        request_rendezvous(&self.rendezvous_addr).await?;
        info!("synchronized with bus server, receiving records");

        let mut batch = Batch::new();
        loop {
            let frame = frames.next_line().await.map_err(|err| {
                roster_error!(
                    ErrorKind::TransportReceiveFailed,
                    "Failed to receive from the publish channel",
                    source: err
                )
            })?;
            let Some(frame) = frame else {
                bail!(
                    ErrorKind::TransportReceiveFailed,
                    "Publish channel closed before the end-of-stream sentinel"
                );
            };

            // Subscription filter: frames outside our topic are not ours.
            let Some(payload) = frame.strip_prefix(TOPIC) else {
                continue;
            };

            if payload == END_SENTINEL {
                break;
            }

            match Record::from_wire(payload) {
                Ok(record) => batch.push(record),
                Err(err) => {
                    warn!(error = %err, payload, "skipping malformed bus frame");
                }
            }
        }

        info!(records = batch.len(), "received end-of-stream sentinel");

        if !batch.is_empty() {
            self.submitter.submit(batch).await;
        }

        Ok(())
    }
}

#[async_trait]
impl ClientTransport for BusClient {
    async fn run(self: Box<Self>) -> RosterResult<()> {
        (*self).run().await
    }
}

/// Performs the client half of the rendezvous: send an empty request, block
/// until the empty acknowledgment arrives.
async fn request_rendezvous(rendezvous_addr: &str) -> RosterResult<()> {
    let stream = TcpStream::connect(rendezvous_addr).await.map_err(|err| {
        roster_error!(
            ErrorKind::TransportConnectionFailed,
            "Failed to connect to the bus rendezvous channel",
            rendezvous_addr,
            source: err
        )
    })?;
    let (read_half, mut write_half) = stream.into_split();

    write_half.write_all(b"\n").await.map_err(|err| {
        roster_error!(
            ErrorKind::TransportSendFailed,
            "Failed to send the rendezvous request",
            source: err
        )
    })?;

    let mut replies = BufReader::new(read_half).lines();
    let reply = replies.next_line().await.map_err(|err| {
        roster_error!(
            ErrorKind::TransportReceiveFailed,
            "Failed to read the rendezvous acknowledgment",
            source: err
        )
    })?;
    if reply.is_none() {
        bail!(
            ErrorKind::TransportReceiveFailed,
            "Rendezvous peer disconnected before acknowledging"
        );
    }

    Ok(())
}
