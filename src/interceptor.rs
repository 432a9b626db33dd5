//! Unary and streaming call adapters.
//!
//! The adapters are framework-agnostic: the caller supplies [`CallInfo`]
//! and a handler, and gets back either the handler's output or
//! [`PermissionDenied`]. Framework glue maps the latter onto its own
//! permission-denied status (see the `tonic` feature).
//!
//! # Call flow
//!
//! ```text
//! CallInfo
//!   ↓
//! evaluate(policy, call) → Decision
//!   ↓
//! AuditDispatcher::dispatch (if the audit condition selects it)
//!   ↓
//! authorized?  → handler(request | stream)
//! otherwise    → PermissionDenied, handler never runs
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::audit::{AuditDispatcher, LoggerRegistry};
use crate::engine::{evaluate, Decision};
use crate::error::PolicyError;
use crate::policy::Policy;
use crate::request::CallInfo;

/// The call was rejected by policy.
///
/// Carries nothing about which rule or policy decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unauthorized RPC request rejected")]
pub struct PermissionDenied {
    _private: (),
}

impl PermissionDenied {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(feature = "tonic")]
impl From<PermissionDenied> for tonic::Status {
    fn from(denied: PermissionDenied) -> Self {
        tonic::Status::permission_denied(denied.to_string())
    }
}

/// Authorizes calls against the active policy and audits the decisions.
///
/// Holds the active policy behind an `Arc`; every call clones the `Arc`
/// once and then evaluates and dispatches without locking. A reload swaps
/// the `Arc` only after the new document has loaded completely, so calls
/// already in flight finish against the policy they started with.
///
/// # Examples
///
/// ```
/// use rpc_authz::{AuthzInterceptor, CallInfo};
///
/// let interceptor = AuthzInterceptor::new_static(r#"{
///     "name": "authz",
///     "allow_rules": [{ "name": "allow_echo", "request": { "paths": ["/echo.Echo/Say"] } }]
/// }"#).unwrap();
///
/// let reply = interceptor.unary(&CallInfo::new("/echo.Echo/Say"), "hi", |msg| msg.len());
/// assert_eq!(reply, Ok(2));
///
/// let rejected = interceptor.unary(&CallInfo::new("/echo.Echo/Shout"), "hi", |msg| msg.len());
/// assert!(rejected.is_err());
/// ```
#[derive(Debug)]
pub struct AuthzInterceptor {
    policy: RwLock<Arc<Policy>>,
    dispatcher: AuditDispatcher,
}

impl AuthzInterceptor {
    /// Creates an interceptor enforcing `policy`.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
            dispatcher: AuditDispatcher::new(),
        }
    }

    /// Loads `json` through the process-wide registry and enforces it.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if the document fails to load.
    pub fn new_static(json: &str) -> Result<Self, PolicyError> {
        Policy::from_json(json).map(Self::new)
    }

    /// Returns the active policy.
    pub fn policy(&self) -> Arc<Policy> {
        Arc::clone(&*self.policy.read())
    }

    /// Replaces the active policy with `json`, loaded through the
    /// process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if the document fails to load; the previous
    /// policy then stays active.
    pub fn reload(&self, json: &str) -> Result<(), PolicyError> {
        self.install(Policy::from_json(json))
    }

    /// Like [`reload`](Self::reload), resolving loggers through `registry`.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if the document fails to load; the previous
    /// policy then stays active.
    pub fn reload_with_registry(
        &self,
        json: &str,
        registry: &LoggerRegistry,
    ) -> Result<(), PolicyError> {
        self.install(Policy::from_json_with_registry(json, registry))
    }

    fn install(&self, loaded: Result<Policy, PolicyError>) -> Result<(), PolicyError> {
        match loaded {
            Ok(policy) => {
                *self.policy.write() = Arc::new(policy);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    active = %self.policy.read().name(),
                    error = %err,
                    "policy reload failed; keeping active policy"
                );
                Err(err)
            }
        }
    }

    /// Decides and audits one call. This is the single audit point shared
    /// by the unary and streaming adapters.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the policy does not authorize the call.
    pub fn check(&self, call: &CallInfo) -> Result<Decision, PermissionDenied> {
        let policy = self.policy();
        let decision = evaluate(&policy, call);
        self.dispatcher.dispatch(&policy, call, &decision);

        if decision.authorized {
            Ok(decision)
        } else {
            tracing::debug!(method = %call.method(), "rejecting unauthorized call");
            Err(PermissionDenied::new())
        }
    }

    /// Authorizes a unary call, then runs `handler` on the request.
    ///
    /// `handler` is not invoked when the call is rejected. Its output is
    /// returned unchanged, so an async handler's future can be passed
    /// straight through.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the policy does not authorize the call.
    pub fn unary<Req, Out, H>(
        &self,
        call: &CallInfo,
        request: Req,
        handler: H,
    ) -> Result<Out, PermissionDenied>
    where
        H: FnOnce(Req) -> Out,
    {
        self.check(call)?;
        Ok(handler(request))
    }

    /// Authorizes a stream once, at establishment, then hands the whole
    /// stream to `handler`.
    ///
    /// Individual messages are not re-evaluated: the one decision and its
    /// single audit event cover the stream's lifetime. A rejected stream
    /// never reaches `handler`, so no message is exchanged.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the policy does not authorize the call.
    pub fn stream<S, Out, H>(
        &self,
        call: &CallInfo,
        stream: S,
        handler: H,
    ) -> Result<Out, PermissionDenied>
    where
        H: FnOnce(S) -> Out,
    {
        self.check(call)?;
        Ok(handler(stream))
    }
}
