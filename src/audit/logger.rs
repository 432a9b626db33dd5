//! Logger plugin contract.
//!
//! A plugin is a [`LoggerBuilder`] registered under a unique name. During a
//! policy load the builder parses the raw `config` of each logger entry naming it and
//! builds a [`Logger`]. Loggers are then shared by every call evaluated
//! against that policy, so they must be `Send + Sync`.

use std::sync::Arc;

use thiserror::Error;

use super::Event;

/// Error returned by a logger that failed to record an event.
///
/// The dispatcher reports it through `tracing` and moves on; it never
/// reaches the caller of the RPC.
#[derive(Debug, Error)]
#[error("audit logger failed: {message}")]
pub struct LogError {
    message: String,
    #[source]
    source: Option<std::io::Error>,
}

impl LogError {
    /// Creates an error with a message and no underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Error returned by [`LoggerBuilder::parse_config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LoggerConfigError(String);

impl LoggerConfigError {
    /// Creates a config error with the given explanation.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for LoggerConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Receives audit events.
///
/// Implementations may block on I/O but must bound their own latency: the
/// dispatcher calls loggers one after another on the request path and
/// imposes no timeout.
pub trait Logger: Send + Sync {
    /// Records one event.
    ///
    /// # Errors
    ///
    /// Returns `LogError` if the event could not be recorded. The error is
    /// reported and swallowed by the dispatcher.
    fn log(&self, event: &Event) -> Result<(), LogError>;
}

/// Names a logger plugin, parses its config and builds loggers.
///
/// # Example
///
/// ```
/// use rpc_authz::audit::{Event, LogError, Logger, LoggerBuilder, LoggerConfigError};
///
/// struct Quiet;
///
/// impl Logger for Quiet {
///     fn log(&self, _event: &Event) -> Result<(), LogError> {
///         Ok(())
///     }
/// }
///
/// struct QuietBuilder;
///
/// impl LoggerBuilder for QuietBuilder {
///     type Config = ();
///
///     fn name(&self) -> &str {
///         "quiet_logger"
///     }
///
///     fn parse_config(&self, _raw: Option<&serde_json::Value>) -> Result<(), LoggerConfigError> {
///         Ok(())
///     }
///
///     fn build(&self, _config: ()) -> Box<dyn Logger> {
///         Box::new(Quiet)
///     }
/// }
/// ```
pub trait LoggerBuilder: Send + Sync + 'static {
    /// Typed configuration produced by `parse_config`.
    type Config;

    /// Returns the globally unique name used as `audit_loggers[].name`.
    fn name(&self) -> &str;

    /// Validates and decodes the raw config of one logger spec.
    ///
    /// `raw` is `None` when the logger entry has no `config` (or it is `null`);
    /// that must yield a usable default, not an error.
    ///
    /// # Errors
    ///
    /// Returns `LoggerConfigError` if the config is invalid.
    fn parse_config(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<Self::Config, LoggerConfigError>;

    /// Builds a ready-to-use logger. Called once per logger entry on every load.
    fn build(&self, config: Self::Config) -> Box<dyn Logger>;
}

/// Object-safe view of a `LoggerBuilder`, as stored in the registry.
pub(crate) trait DynLoggerBuilder: Send + Sync {
    fn load(&self, raw: Option<&serde_json::Value>) -> Result<Arc<dyn Logger>, LoggerConfigError>;
}

impl<B: LoggerBuilder> DynLoggerBuilder for B {
    fn load(&self, raw: Option<&serde_json::Value>) -> Result<Arc<dyn Logger>, LoggerConfigError> {
        let config = self.parse_config(raw)?;
        Ok(Arc::from(self.build(config)))
    }
}
