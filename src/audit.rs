//! Audit logging of authorization decisions.
//!
//! This module provides:
//! - `Event`: the record handed to loggers
//! - `Logger` / `LoggerBuilder`: the plugin contract
//! - `LoggerRegistry`: name-keyed builder table, plus a process-wide default
//! - `AuditDispatcher`: condition-gated fan-out to a policy's loggers
//! - `StdoutLogger` and `AuditTrail`: the built-in loggers
//!
//! Audit emission is invisible to callers. Logger failures are reported
//! through `tracing` and never turn into RPC errors.

mod dispatcher;
mod event;
mod logger;
mod registry;
mod stdout;
mod trail;

pub use dispatcher::AuditDispatcher;
pub use event::Event;
pub use logger::{LogError, Logger, LoggerBuilder, LoggerConfigError};
pub use registry::{global_registry, register_logger_builder, LoggerRegistry};
pub use stdout::{StdoutLogger, StdoutLoggerBuilder, StdoutLoggerConfig, STDOUT_LOGGER_NAME};
pub use trail::{
    AuditTrail, MemoryLoggerBuilder, MemoryLoggerConfig, MEMORY_LOGGER_NAME,
};
