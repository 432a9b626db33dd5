//! In-memory audit trail and the `memory_logger` builder.
//!
//! Useful in tests and for embedding applications that ship events
//! elsewhere themselves. To observe the events of a loaded policy, register
//! a builder sharing your own trail:
//!
//! ```
//! use rpc_authz::audit::{AuditTrail, LoggerRegistry, MemoryLoggerBuilder};
//!
//! let trail = AuditTrail::new();
//! let registry = LoggerRegistry::new();
//! registry.register(MemoryLoggerBuilder::with_trail(trail.clone()));
//! ```

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use super::{Event, LogError, Logger, LoggerBuilder, LoggerConfigError};

/// Builder name of the in-memory logger.
pub const MEMORY_LOGGER_NAME: &str = "memory_logger";

/// In-memory recorder for audit events.
///
/// Clones share storage. A bounded trail drops its oldest event when full.
///
/// # Example
///
/// ```
/// use rpc_authz::audit::{AuditTrail, Event};
///
/// let trail = AuditTrail::new();
/// trail.record(Event::new("/a.B/C", "", "authz", "", false));
///
/// assert_eq!(trail.len(), 1);
/// assert!(!trail.last().unwrap().authorized());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    events: Arc<Mutex<VecDeque<Event>>>,
    capacity: Option<NonZeroUsize>,
}

impl AuditTrail {
    /// Creates a new empty, unbounded trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty trail keeping at most `capacity` events.
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            events: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Records an event, evicting the oldest one if the trail is full.
    pub fn record(&self, event: Event) {
        let mut events = self.events.lock();
        if let Some(cap) = self.capacity {
            while events.len() >= cap.get() {
                events.pop_front();
            }
        }
        events.push_back(event);
    }

    /// Returns a snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().cloned().collect()
    }

    /// Returns the most recent event.
    pub fn last(&self) -> Option<Event> {
        self.events.lock().back().cloned()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Logger for AuditTrail {
    fn log(&self, event: &Event) -> Result<(), LogError> {
        self.record(event.clone());
        Ok(())
    }
}

/// Config of the in-memory logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryLoggerConfig {
    /// Maximum number of retained events; unbounded when absent.
    ///
    /// Loggers built from one builder share its trail, and each applies
    /// its own capacity to that shared storage: a bounded entry also
    /// evicts events recorded by an unbounded sibling entry.
    #[serde(default)]
    pub capacity: Option<NonZeroUsize>,
}

/// Builds loggers that record into a caller-owned [`AuditTrail`].
#[derive(Debug, Clone)]
pub struct MemoryLoggerBuilder {
    trail: AuditTrail,
}

impl MemoryLoggerBuilder {
    /// Creates a builder whose loggers all record into `trail`.
    pub fn with_trail(trail: AuditTrail) -> Self {
        Self { trail }
    }

    /// Returns the trail built loggers record into.
    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }
}

impl LoggerBuilder for MemoryLoggerBuilder {
    type Config = MemoryLoggerConfig;

    fn name(&self) -> &str {
        MEMORY_LOGGER_NAME
    }

    fn parse_config(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<MemoryLoggerConfig, LoggerConfigError> {
        match raw {
            None => Ok(MemoryLoggerConfig::default()),
            Some(v) => Ok(MemoryLoggerConfig::deserialize(v)?),
        }
    }

    fn build(&self, config: MemoryLoggerConfig) -> Box<dyn Logger> {
        Box::new(AuditTrail {
            events: Arc::clone(&self.trail.events),
            capacity: config.capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: u32) -> Event {
        Event::new(format!("/svc/M{n}"), "", "authz", "", n % 2 == 0)
    }

    #[test]
    fn audit_trail_starts_empty() {
        let trail = AuditTrail::new();
        assert!(trail.is_empty());
        assert_eq!(trail.len(), 0);
        assert!(trail.last().is_none());
    }

    #[test]
    fn audit_trail_records_in_order() {
        let trail = AuditTrail::new();
        trail.record(event(1));
        trail.record(event(2));

        let events = trail.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].full_method_name(), "/svc/M1");
        assert_eq!(events[1].full_method_name(), "/svc/M2");
    }

    #[test]
    fn bounded_trail_evicts_oldest() {
        let trail = AuditTrail::bounded(NonZeroUsize::new(2).unwrap());
        for n in 1..=3 {
            trail.record(event(n));
        }
        let methods: Vec<_> = trail
            .events()
            .iter()
            .map(|e| e.full_method_name().to_string())
            .collect();
        assert_eq!(methods, ["/svc/M2", "/svc/M3"]);
    }

    #[test]
    fn audit_trail_can_be_cleared() {
        let trail = AuditTrail::new();
        trail.record(event(1));
        trail.clear();
        assert!(trail.is_empty());
    }

    #[test]
    fn built_loggers_share_the_builder_trail() {
        let trail = AuditTrail::new();
        let builder = MemoryLoggerBuilder::with_trail(trail.clone());

        let config = builder.parse_config(None).unwrap();
        let logger = builder.build(config);
        logger.log(&event(4)).unwrap();

        assert_eq!(trail.len(), 1);
        assert!(trail.last().unwrap().authorized());
    }

    #[test]
    fn config_parsing() {
        let builder = MemoryLoggerBuilder::with_trail(AuditTrail::new());

        let raw = serde_json::json!({ "capacity": 10 });
        let config = builder.parse_config(Some(&raw)).unwrap();
        assert_eq!(config.capacity.map(NonZeroUsize::get), Some(10));
        assert!(builder.parse_config(Some(&serde_json::json!({}))).is_ok());

        let zero = serde_json::json!({ "capacity": 0 });
        assert!(builder.parse_config(Some(&zero)).is_err());

        let unknown = serde_json::json!({ "size": 3 });
        assert!(builder.parse_config(Some(&unknown)).is_err());
    }

    #[test]
    fn bounded_trail_of_one_keeps_only_the_latest() {
        let trail = AuditTrail::bounded(NonZeroUsize::MIN);
        trail.record(event(1));
        trail.record(event(2));
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.last().unwrap().full_method_name(), "/svc/M2");
    }

    #[test]
    fn builder_exposes_its_trail() {
        let trail = AuditTrail::new();
        let builder = MemoryLoggerBuilder::with_trail(trail.clone());
        let logger = builder.build(MemoryLoggerConfig::default());
        logger.log(&event(1)).unwrap();

        assert_eq!(builder.trail().len(), 1);
        assert_eq!(trail.events(), builder.trail().events());
    }

    #[test]
    fn sibling_loggers_share_storage_and_bounds_apply_to_it() {
        let trail = AuditTrail::new();
        let builder = MemoryLoggerBuilder::with_trail(trail.clone());
        let unbounded = builder.build(MemoryLoggerConfig::default());
        let bounded = builder.build(MemoryLoggerConfig {
            capacity: NonZeroUsize::new(2),
        });

        for n in 1..=4 {
            unbounded.log(&event(n)).unwrap();
        }
        assert_eq!(trail.len(), 4);

        bounded.log(&event(5)).unwrap();
        let methods: Vec<_> = trail
            .events()
            .iter()
            .map(|e| e.full_method_name().to_string())
            .collect();
        assert_eq!(methods, ["/svc/M4", "/svc/M5"]);
    }
}
