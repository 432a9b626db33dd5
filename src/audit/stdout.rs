//! Console audit logger, registered as `stdout_logger`.
//!
//! Each event becomes one JSON line:
//!
//! ```text
//! {"fullMethodName":"/pkg.Service/Method","principal":"spiffe://foo","policyName":"authz","matchedRule":"authz_allow_all","authorized":true,"timestamp":"2023-05-01T12:00:00Z"}
//! ```

use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::{Event, LogError, Logger, LoggerBuilder, LoggerConfigError};

/// Builder name of the console logger.
pub const STDOUT_LOGGER_NAME: &str = "stdout_logger";

#[derive(Serialize)]
struct Line<'a> {
    #[serde(flatten)]
    event: &'a Event,
    timestamp: String,
}

/// Writes every event as a JSON line to standard output, or to any writer.
pub struct StdoutLogger {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StdoutLogger {
    /// Creates a logger writing to standard output.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Creates a logger writing to `out`.
    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }
}

impl Default for StdoutLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for StdoutLogger {
    fn log(&self, event: &Event) -> Result<(), LogError> {
        let line = Line {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let mut buf = serde_json::to_vec(&line).map_err(|e| LogError::new(e.to_string()))?;
        buf.push(b'\n');

        let mut out = self.out.lock();
        out.write_all(&buf)?;
        out.flush()?;
        Ok(())
    }
}

/// Config of the console logger. It has no settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdoutLoggerConfig;

/// Builds [`StdoutLogger`]s. Any config given is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutLoggerBuilder;

impl LoggerBuilder for StdoutLoggerBuilder {
    type Config = StdoutLoggerConfig;

    fn name(&self) -> &str {
        STDOUT_LOGGER_NAME
    }

    fn parse_config(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<StdoutLoggerConfig, LoggerConfigError> {
        if raw.is_some_and(|v| !v.is_null()) {
            tracing::debug!(builder = STDOUT_LOGGER_NAME, "ignoring logger config");
        }
        Ok(StdoutLoggerConfig)
    }

    fn build(&self, _config: StdoutLoggerConfig) -> Box<dyn Logger> {
        Box::new(StdoutLogger::new())
    }
}
