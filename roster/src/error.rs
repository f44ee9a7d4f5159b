//! Error types and result definitions for the roster distribution system.
//!
//! Provides a kind-classified error type with captured callsite metadata. The
//! [`RosterError`] type carries a static description, an optional dynamic detail
//! and an optional source error, which keeps diagnostics rich without forcing
//! every call site to build formatted strings.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::io;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for roster operations using [`RosterError`] as the error type.
pub type RosterResult<T> = Result<T, RosterError>;

/// Specific categories of errors that can occur while distributing records.
///
/// Error kinds are organized by functional area and failure mode so callers can
/// decide whether a failure is recoverable for the current session.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source & parsing errors
    SourceIoError,
    InvalidData,

    // Serialization errors
    SerializationError,
    DeserializationError,

    // Transport errors
    TransportConnectionFailed,
    TransportSendFailed,
    TransportReceiveFailed,
    UnexpectedResponseStatus,

    // Configuration errors
    ConfigError,

    // State & workflow errors
    InvalidState,
    BatchWorkerPanic,

    // General errors
    IoError,
    Unknown,
}

/// Main error type for roster operations.
///
/// Errors are created through the [`crate::roster_error!`] and [`crate::bail!`]
/// macros, which capture the callsite location automatically.
#[derive(Debug, Clone)]
pub struct RosterError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<String>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

impl RosterError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<String>,
    ) -> Self {
        Self {
            kind,
            description,
            detail,
            source: None,
            location: Location::caller(),
        }
    }
}

impl From<(ErrorKind, &'static str)> for RosterError {
    #[track_caller]
    fn from((kind, description): (ErrorKind, &'static str)) -> Self {
        Self::from_components(kind, Cow::Borrowed(description), None)
    }
}

impl From<(ErrorKind, &'static str, String)> for RosterError {
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, &'static str, String)) -> Self {
        Self::from_components(kind, Cow::Borrowed(description), Some(detail))
    }
}

impl From<io::Error> for RosterError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        Self::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("An I/O operation failed"),
            Some(err.to_string()),
        )
        .with_source(err)
    }
}

impl From<serde_json::Error> for RosterError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::from_components(
            ErrorKind::DeserializationError,
            Cow::Borrowed("JSON processing failed"),
            Some(err.to_string()),
        )
        .with_source(err)
    }
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for RosterError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}
