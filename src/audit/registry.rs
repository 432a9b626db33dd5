//! Name-keyed table of logger builders.
//!
//! # Usage contract
//!
//! Register every builder before loading any policy that names it.
//! Registering while policies are being loaded concurrently is not a
//! supported pattern: the table stays memory-safe, but which builder a
//! racing load observes is unspecified.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::logger::{DynLoggerBuilder, LoggerBuilder};
use super::stdout::StdoutLoggerBuilder;

/// Maps builder names to logger builders.
///
/// Policies resolve their `audit_loggers` against a registry at load time
/// only; calls never touch it.
///
/// # Example
///
/// ```
/// use rpc_authz::audit::LoggerRegistry;
///
/// let registry = LoggerRegistry::with_defaults();
/// assert!(registry.contains("stdout_logger"));
/// assert!(!LoggerRegistry::new().contains("stdout_logger"));
/// ```
#[derive(Default)]
pub struct LoggerRegistry {
    builders: RwLock<HashMap<String, Arc<dyn DynLoggerBuilder>>>,
}

impl LoggerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `stdout_logger` builder.
    ///
    /// `memory_logger` is not included: its events are only reachable
    /// through a trail the caller owns, so register
    /// [`MemoryLoggerBuilder::with_trail`](super::MemoryLoggerBuilder::with_trail)
    /// explicitly.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(StdoutLoggerBuilder);
        registry
    }

    /// Registers `builder` under its own name.
    ///
    /// An existing entry with the same name is replaced (last writer wins)
    /// and `true` is returned. Policies already loaded keep the loggers
    /// they built from the old entry.
    pub fn register<B: LoggerBuilder>(&self, builder: B) -> bool {
        let name = LoggerBuilder::name(&builder).to_string();
        let replaced = self
            .builders
            .write()
            .insert(name.clone(), Arc::new(builder))
            .is_some();

        if replaced {
            tracing::warn!(builder = %name, "audit logger builder re-registered; replacing previous entry");
        } else {
            tracing::debug!(builder = %name, "registered audit logger builder");
        }
        replaced
    }

    /// Returns true if a builder is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.builders.read().contains_key(name)
    }

    /// Returns the registered builder names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.builders.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn DynLoggerBuilder>> {
        self.builders.read().get(name).cloned()
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("builders", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<LoggerRegistry> = OnceLock::new();

/// Returns the process-wide registry used by [`Policy::from_json`].
///
/// It starts out as [`LoggerRegistry::with_defaults`].
///
/// [`Policy::from_json`]: crate::Policy::from_json
pub fn global_registry() -> &'static LoggerRegistry {
    GLOBAL.get_or_init(LoggerRegistry::with_defaults)
}

/// Registers `builder` in the process-wide registry.
///
/// Returns `true` if a builder with the same name was replaced.
pub fn register_logger_builder<B: LoggerBuilder>(builder: B) -> bool {
    global_registry().register(builder)
}
