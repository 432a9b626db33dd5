//! Condition-gated fan-out of audit events to a policy's loggers.

use std::panic::{self, AssertUnwindSafe};

use super::Event;
use crate::engine::Decision;
use crate::policy::Policy;
use crate::request::CallInfo;

/// Emits audit events for decisions made against a policy.
///
/// The dispatcher is stateless; it reads the condition and loggers from the
/// policy it is given. Loggers run synchronously, one after another, in the
/// order of `audit_loggers`, and all receive the same event. A logger that
/// returns an error or panics is reported through `tracing` and skipped;
/// the call itself is never affected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditDispatcher;

impl AuditDispatcher {
    /// Creates a dispatcher.
    pub fn new() -> Self {
        Self
    }

    /// Audits `decision` if the policy's condition selects it.
    ///
    /// Returns the event that was dispatched, or `None` when the condition
    /// filtered the decision out.
    pub fn dispatch(&self, policy: &Policy, call: &CallInfo, decision: &Decision) -> Option<Event> {
        if !policy.audit_condition().should_audit(decision.authorized) {
            return None;
        }

        let event = Event::new(
            call.method(),
            call.principal(),
            policy.name(),
            decision.matched_rule.as_str(),
            decision.authorized,
        );

        for (index, logger) in policy.loggers().iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| logger.log(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        target: "rpc_authz::audit",
                        policy = %policy.name(),
                        logger = index,
                        error = %err,
                        "audit logger failed"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        target: "rpc_authz::audit",
                        policy = %policy.name(),
                        logger = index,
                        "audit logger panicked"
                    );
                }
            }
        }

        Some(event)
    }
}
