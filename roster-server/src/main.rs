//! Roster server binary.
//!
//! Serves the deduplicated record collection over the bus and/or document
//! transports, selected at runtime. The bus server completes after one
//! subscriber session; the document server runs until Ctrl+C.

use anyhow::{Context, anyhow};
use clap::Parser;
use roster::concurrency::shutdown::create_shutdown_channel;
use roster::config::{RosterConfig, TransportKind, load_config};
use roster::repository::RecordRepository;
use roster::telemetry::init_tracing;
use roster::transport::ServerTransport;
use roster::transport::bus::BusServer;
use roster::transport::document::DocumentServer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "roster-server",
    about = "Serves the deduplicated record collection to subscribing consumers"
)]
struct Cli {
    /// Transport to serve: bus, document or both.
    #[arg(long, default_value = "both")]
    transport: String,
}

#[derive(Debug, Clone, Copy)]
enum ServeMode {
    Single(TransportKind),
    Both,
}

fn parse_serve_mode(value: &str) -> anyhow::Result<ServeMode> {
    if value == "both" {
        return Ok(ServeMode::Both);
    }

    value
        .parse::<TransportKind>()
        .map(ServeMode::Single)
        .map_err(|err| anyhow!(err))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mode = parse_serve_mode(&cli.transport)?;

    init_tracing().context("initializing tracing")?;

    let config = load_config::<RosterConfig>().context("loading roster configuration")?;
    config
        .validate()
        .context("validating roster configuration")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(mode, config))
}

async fn async_main(mode: ServeMode, config: RosterConfig) -> anyhow::Result<()> {
    let repository = RecordRepository::new(config.sources.files.clone());

    match mode {
        ServeMode::Single(kind) => serve(kind, &config, repository).await,
        ServeMode::Both => {
            info!("starting both server transports");

            let bus_config = config.clone();
            let bus_repository = repository.clone();
            let bus = tokio::spawn(async move {
                serve(TransportKind::Bus, &bus_config, bus_repository).await
            });

            let document_config = config.clone();
            let document = tokio::spawn(async move {
                serve(TransportKind::Document, &document_config, repository).await
            });

            bus.await??;
            document.await??;

            Ok(())
        }
    }
}

async fn serve(
    kind: TransportKind,
    config: &RosterConfig,
    repository: RecordRepository,
) -> anyhow::Result<()> {
    let server = build_server(kind, config, repository).await?;
    server.run().await.context("running server transport")?;

    Ok(())
}

/// Builds the serving side of the selected transport.
async fn build_server(
    kind: TransportKind,
    config: &RosterConfig,
    repository: RecordRepository,
) -> anyhow::Result<Box<dyn ServerTransport>> {
    match kind {
        TransportKind::Bus => {
            let server = BusServer::bind(&config.bus, repository)
                .await
                .context("binding the bus server")?;
            info!(
                publish_addr = %server.publish_addr()?,
                rendezvous_addr = %server.rendezvous_addr()?,
                "bus server bound"
            );

            Ok(Box::new(server))
        }
        TransportKind::Document => {
            let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received Ctrl+C, requesting shutdown");
                    let _ = shutdown_tx.send(());
                }
            });

            let server = DocumentServer::bind(&config.document, repository, shutdown_rx)
                .context("binding the document server")?;
            info!(addr = %server.addr(), "document server bound");

            Ok(Box::new(server))
        }
    }
}
