pub mod concurrency;
pub mod config;
pub mod error;
pub mod macros;
pub mod pipeline;
pub mod repository;
pub mod sink;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod workers;
