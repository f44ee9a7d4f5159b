//! Roster client binary.
//!
//! Receives the record collection over the selected transport and hands the
//! batch to the background processing stage, which sorts and renders it.

use anyhow::{Context, anyhow};
use clap::Parser;
use roster::config::{RosterConfig, TransportKind, load_config};
use roster::pipeline::ConsumerPipeline;
use roster::sink::LogSink;
use roster::telemetry::init_tracing;
use roster::transport::ClientTransport;
use roster::transport::bus::BusClient;
use roster::transport::document::DocumentClient;
use roster::workers::batch::BatchProcessor;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "roster-client",
    about = "Receives the record collection and hands it to the processing stage"
)]
struct Cli {
    /// Transport to receive over: bus or document.
    #[arg(long)]
    transport: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let kind = cli
        .transport
        .parse::<TransportKind>()
        .map_err(|err| anyhow!(err))?;

    init_tracing().context("initializing tracing")?;

    let config = load_config::<RosterConfig>().context("loading roster configuration")?;
    config
        .validate()
        .context("validating roster configuration")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(kind, config))
}

async fn async_main(kind: TransportKind, config: RosterConfig) -> anyhow::Result<()> {
    let processor = BatchProcessor::start(LogSink);
    let submitter = processor.submitter();

    let transport: Box<dyn ClientTransport> = match kind {
        TransportKind::Bus => Box::new(BusClient::new(&config.bus, submitter)),
        TransportKind::Document => Box::new(DocumentClient::new(&config.document, submitter)),
    };

    info!(transport = ?kind, "starting consumer session");

    ConsumerPipeline::new(processor, transport)
        .run()
        .await
        .context("running the consumer session")?;

    Ok(())
}
