//! End-to-end document transport sessions over loopback HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use roster::concurrency::shutdown::create_shutdown_channel;
use roster::config::DocumentConfig;
use roster::repository::RecordRepository;
use roster::sink::MemorySink;
use roster::transport::document::{DocumentClient, DocumentServer};
use roster::workers::batch::BatchProcessor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn write_source(lines: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("roster-doc-{}.txt", uuid::Uuid::new_v4()));
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

/// Serves exactly one canned HTTP response, for failure-path scenarios the
/// real document server never produces.
async fn serve_canned_response(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    addr
}

#[tokio::test]
async fn full_session_fetches_and_processes_the_document() {
    let path = write_source(&[
        "1 Anna Smith 01.01.1990",
        "1 Anna Smith 01.01.1990",
        "2 Bob Jones 02.02.1980",
    ]);

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let server = DocumentServer::bind(
        &DocumentConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        RecordRepository::new(vec![path.clone()]),
        shutdown_rx,
    )
    .unwrap();
    let config = DocumentConfig {
        addr: server.addr().to_string(),
    };
    let server_task = tokio::spawn(server.run());

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = DocumentClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    processor.stop().await.unwrap();

    let batches = sink.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0].last_name, "Jones");
    assert_eq!(batches[0][1].last_name, "Smith");

    shutdown_tx.send(()).unwrap();
    server_task.await.unwrap().unwrap();

    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn empty_collection_submits_nothing() {
    let path = write_source(&[]);

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let server = DocumentServer::bind(
        &DocumentConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        RecordRepository::new(vec![path.clone()]),
        shutdown_rx,
    )
    .unwrap();
    let config = DocumentConfig {
        addr: server.addr().to_string(),
    };
    let server_task = tokio::spawn(server.run());

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = DocumentClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    processor.stop().await.unwrap();

    assert!(sink.batches().await.is_empty());

    shutdown_tx.send(()).unwrap();
    server_task.await.unwrap().unwrap();

    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn server_error_status_submits_nothing_and_returns_cleanly() {
    let addr = serve_canned_response(
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n",
    )
    .await;
    let config = DocumentConfig {
        addr: addr.to_string(),
    };

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = DocumentClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    processor.stop().await.unwrap();

    assert!(sink.batches().await.is_empty());
}

#[tokio::test]
async fn unparsable_body_submits_nothing_and_returns_cleanly() {
    let addr = serve_canned_response(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 8\r\n\r\nnot json",
    )
    .await;
    let config = DocumentConfig {
        addr: addr.to_string(),
    };

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = DocumentClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    processor.stop().await.unwrap();

    assert!(sink.batches().await.is_empty());
}

#[tokio::test]
async fn connection_refused_submits_nothing_and_returns_cleanly() {
    // Bind then drop a listener so the port is very likely unused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = DocumentConfig {
        addr: addr.to_string(),
    };

    let sink = MemorySink::new();
    let mut processor = BatchProcessor::start(sink.clone());
    let client = DocumentClient::new(&config, processor.submitter());

    client.run().await.unwrap();
    processor.stop().await.unwrap();

    assert!(sink.batches().await.is_empty());
}
