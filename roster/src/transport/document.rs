//! Request/response document transport.
//!
//! The document transport serves the same logical dataset as the bus, but as a
//! single synchronous exchange: one GET on a well-known path returning the
//! full record collection as one JSON array. No pagination, no streaming.

use std::net::SocketAddr;

use actix_web::dev::Server;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::concurrency::shutdown::ShutdownRx;
use crate::config::DocumentConfig;
use crate::error::{ErrorKind, RosterResult};
use crate::repository::RecordRepository;
use crate::roster_error;
use crate::transport::{ClientTransport, ServerTransport};
use crate::types::Batch;
use crate::workers::batch::BatchSubmitter;

/// Well-known path serving the record document.
pub const RECORDS_PATH: &str = "/records";

#[get("/records")]
async fn get_records(repository: web::Data<RecordRepository>) -> impl Responder {
    info!("serving record document request");

    let records = repository.load_unique_records().await;
    HttpResponse::Ok().json(records)
}

/// Serving side of the document transport.
///
/// Wraps an actix-web server answering GET on [`RECORDS_PATH`] with the full
/// deduplicated record collection, loaded fresh from the repository on every
/// request. Runs until a shutdown signal arrives.
pub struct DocumentServer {
    server: Server,
    addr: SocketAddr,
    shutdown_rx: ShutdownRx,
}

impl DocumentServer {
    /// Binds the listener and builds the server.
    pub fn bind(
        config: &DocumentConfig,
        repository: RecordRepository,
        shutdown_rx: ShutdownRx,
    ) -> RosterResult<Self> {
        let listener = std::net::TcpListener::bind(&config.addr).map_err(|err| {
            roster_error!(
                ErrorKind::TransportConnectionFailed,
                "Failed to bind the document server",
                &config.addr,
                source: err
            )
        })?;
        let addr = listener.local_addr()?;

        let repository = web::Data::new(repository);
        let server = HttpServer::new(move || {
            App::new()
                .app_data(repository.clone())
                .service(get_records)
        })
        // Shutdown is driven by the watch channel, not by process signals.
        .disable_signals()
        .listen(listener)
        .map_err(|err| {
            roster_error!(
                ErrorKind::TransportConnectionFailed,
                "Failed to start the document server",
                source: err
            )
        })?
        .run();

        Ok(Self {
            server,
            addr,
            shutdown_rx,
        })
    }

    /// Returns the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves requests until shutdown is requested.
    pub async fn run(self) -> RosterResult<()> {
        info!(addr = %self.addr, "document server started");

        let handle = self.server.handle();
        let mut shutdown_rx = self.shutdown_rx;
        tokio::spawn(async move {
            // A closed channel also counts as a shutdown request.
            let _ = shutdown_rx.changed().await;
            info!("stopping document server");
            handle.stop(true).await;
        });

        self.server.await.map_err(|err| {
            roster_error!(
                ErrorKind::TransportReceiveFailed,
                "Document server terminated abnormally",
                source: err
            )
        })?;

        info!("document server has shut down");

        Ok(())
    }
}

#[async_trait]
impl ServerTransport for DocumentServer {
    async fn run(self: Box<Self>) -> RosterResult<()> {
        (*self).run().await
    }
}

/// Receiving side of the document transport.
///
/// Issues one GET and submits the decoded collection as a single batch. Any
/// transport or decode failure is logged and nothing is submitted; the failure
/// is not fatal to the process and `run` still returns cleanly.
#[derive(Debug)]
pub struct DocumentClient {
    base_url: String,
    submitter: BatchSubmitter,
}

impl DocumentClient {
    /// Creates a client fetching from the configured document server.
    pub fn new(config: &DocumentConfig, submitter: BatchSubmitter) -> Self {
        Self {
            base_url: config.base_url(),
            submitter,
        }
    }

    /// Runs one full fetch session.
    pub async fn run(self) -> RosterResult<()> {
        info!(base_url = %self.base_url, "requesting record document");

        let batch = match self.fetch_records().await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "document fetch failed, submitting nothing");
                return Ok(());
            }
        };

        info!(records = batch.len(), "received record document");

        if !batch.is_empty() {
            self.submitter.submit(batch).await;
        }

        Ok(())
    }

    async fn fetch_records(&self) -> RosterResult<Batch> {
        let url = format!("{}{}", self.base_url, RECORDS_PATH);

        let response = reqwest::get(&url).await.map_err(|err| {
            roster_error!(
                ErrorKind::TransportConnectionFailed,
                "Failed to fetch the record document",
                url,
                source: err
            )
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(roster_error!(
                ErrorKind::UnexpectedResponseStatus,
                "Document server returned a non-success status",
                status
            ));
        }

        let batch = response.json::<Batch>().await.map_err(|err| {
            roster_error!(
                ErrorKind::DeserializationError,
                "Failed to decode the record document body",
                source: err
            )
        })?;

        Ok(batch)
    }
}

#[async_trait]
impl ClientTransport for DocumentClient {
    async fn run(self: Box<Self>) -> RosterResult<()> {
        (*self).run().await
    }
}
