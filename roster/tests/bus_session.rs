//! End-to-end bus transport sessions over loopback TCP.

use std::path::PathBuf;

use roster::config::BusConfig;
use roster::pipeline::ConsumerPipeline;
use roster::repository::RecordRepository;
use roster::sink::MemorySink;
use roster::transport::bus::{BusClient, BusServer};
use roster::workers::batch::BatchProcessor;

fn write_source(lines: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("roster-bus-{}.txt", uuid::Uuid::new_v4()));
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn loopback_config() -> BusConfig {
    BusConfig {
        publish_addr: "127.0.0.1:0".to_string(),
        rendezvous_addr: "127.0.0.1:0".to_string(),
    }
}

async fn bind_server(repository: RecordRepository) -> (BusServer, BusConfig) {
    let server = BusServer::bind(&loopback_config(), repository)
        .await
        .unwrap();
    let config = BusConfig {
        publish_addr: server.publish_addr().unwrap().to_string(),
        rendezvous_addr: server.rendezvous_addr().unwrap().to_string(),
    };
    (server, config)
}

#[tokio::test]
async fn full_session_deduplicates_and_sorts_for_display() {
    let path = write_source(&[
        "1 Anna Smith 01.01.1990",
        "1 Anna Smith 01.01.1990",
        "2 Bob Jones 02.02.1980",
        "3 Carla Adams 03.03.1970",
    ]);
    let (server, config) = bind_server(RecordRepository::new(vec![path.clone()])).await;
    let server_task = tokio::spawn(server.run());

    let sink = MemorySink::new();
    let processor = BatchProcessor::start(sink.clone());
    let client = BusClient::new(&config, processor.submitter());

    ConsumerPipeline::new(processor, Box::new(client))
        .run()
        .await
        .unwrap();
    server_task.await.unwrap().unwrap();

    let batches = sink.batches().await;
    assert_eq!(batches.len(), 1);
    // Duplicate line collapsed; batch sorted by (lastName, firstName).
    let names = batches[0]
        .iter()
        .map(|r| r.last_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Adams", "Jones", "Smith"]);

    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn empty_repository_yields_sentinel_only_and_no_submission() {
    let path = write_source(&[]);
    let (server, config) = bind_server(RecordRepository::new(vec![path.clone()])).await;
    let server_task = tokio::spawn(server.run());

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = BusClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    server_task.await.unwrap().unwrap();
    processor.stop().await.unwrap();

    assert!(sink.batches().await.is_empty());

    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn records_not_fitting_the_framing_are_skipped_on_publish() {
    let path = write_source(&[
        "1 Anna Smith 01.01.1990",
        // Multi-word first name cannot be framed with four tokens.
        "2 Anna Maria Lopez 05.06.1985",
    ]);
    let (server, config) = bind_server(RecordRepository::new(vec![path.clone()])).await;
    let server_task = tokio::spawn(server.run());

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = BusClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    server_task.await.unwrap().unwrap();
    processor.stop().await.unwrap();

    let batches = sink.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].first_name, "Anna");

    std::fs::remove_file(path).unwrap();
}
