//! Configuration structures and loading for the roster services.
//!
//! Configuration is loaded from an optional `configuration/base.yaml` file
//! with `APP_`-prefixed environment variable overrides (nested keys separated
//! by `__`, e.g. `APP_BUS__PUBLISH_ADDR`). Every field has a default, so both
//! binaries run without any configuration present.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Error raised when the configuration cannot be loaded or deserialized.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Error raised when a configuration value fails validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid value for field '{field}': {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}

/// Which transport family a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Publish/subscribe bus with a rendezvous handshake.
    Bus,
    /// Single-shot HTTP document transfer.
    Document,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bus" => Ok(TransportKind::Bus),
            "document" => Ok(TransportKind::Document),
            other => Err(format!(
                "unknown transport '{other}', available transports: bus, document"
            )),
        }
    }
}

/// Record source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Line-oriented text files the repository reads records from.
    #[serde(default = "default_source_files")]
    pub files: Vec<PathBuf>,
}

impl SourcesConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "sources.files".to_string(),
                constraint: "must list at least one source file".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            files: default_source_files(),
        }
    }
}

fn default_source_files() -> Vec<PathBuf> {
    vec![PathBuf::from("records_1.txt"), PathBuf::from("records_2.txt")]
}

/// Bus transport configuration.
///
/// The publish channel carries the record stream; the rendezvous channel
/// carries the one synchronization exchange that gates publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_publish_addr")]
    pub publish_addr: String,
    #[serde(default = "default_rendezvous_addr")]
    pub rendezvous_addr: String,
}

impl BusConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.publish_addr == self.rendezvous_addr {
            return Err(ValidationError::InvalidFieldValue {
                field: "bus.rendezvous_addr".to_string(),
                constraint: "must differ from the publish address".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            publish_addr: default_publish_addr(),
            rendezvous_addr: default_rendezvous_addr(),
        }
    }
}

fn default_publish_addr() -> String {
    "127.0.0.1:5555".to_string()
}

fn default_rendezvous_addr() -> String {
    "127.0.0.1:5556".to_string()
}

/// Document transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Address the document server binds to; the client derives its base URL
    /// from the same value.
    #[serde(default = "default_document_addr")]
    pub addr: String,
}

impl DocumentConfig {
    /// Base URL the document client fetches from.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            addr: default_document_addr(),
        }
    }
}

fn default_document_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Top-level configuration shared by the server and client binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub document: DocumentConfig,
}

impl RosterConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.sources.validate()?;
        self.bus.validate()?;

        Ok(())
    }
}

/// Loads a configuration value from the optional base file and environment.
///
/// Environment variables win over file values, which makes deployments
/// overridable without editing files.
pub fn load_config<T>() -> Result<T, ConfigLoadError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    let base_file = Path::new(CONFIGURATION_DIR).join("base.yaml");
    if base_file.exists() {
        builder = builder.add_source(File::from(base_file));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR),
    );

    let settings = builder.build()?;
    Ok(settings.try_deserialize::<T>()?)
}
