//! Request-time authorization for RPC servers, with conditional audit logging.
//!
//! For every inbound call this crate:
//! - **Decides** allow/deny against a declarative JSON policy: deny rules
//!   first, then allow rules, first match wins, default-deny otherwise
//! - **Audits** the decision when the policy's audit condition selects it
//! - **Dispatches** the resulting [`audit::Event`] to each configured logger
//!   plugin, without letting a failing logger affect the call
//!
//! # Core Types
//!
//! - [`Policy`]: a loaded, validated, immutable policy document
//! - [`CallInfo`]: the attributes of one call that rules match on
//! - [`evaluate`] / [`Decision`]: the pure decision function and its result
//! - [`AuthzInterceptor`]: unary and streaming adapters that decide, audit,
//!   then run or reject the handler
//! - [`audit::LoggerBuilder`] / [`audit::Logger`]: the logger plugin contract
//!
//! # Examples
//!
//! ```
//! use rpc_authz::{AuthzInterceptor, CallInfo};
//!
//! let interceptor = AuthzInterceptor::new_static(r#"{
//!     "name": "authz",
//!     "allow_rules": [{ "name": "allow_all", "request": { "paths": ["*"] } }],
//!     "deny_rules": [{ "name": "deny_admin", "request": { "paths": ["/svc.Admin/Drop"] } }],
//!     "audit_logging_options": {
//!         "audit_condition": "ON_DENY",
//!         "audit_loggers": [{ "name": "stdout_logger", "is_optional": false }]
//!     }
//! }"#).expect("valid policy");
//!
//! let call = CallInfo::new("/svc.Admin/Drop").with_principal("spiffe://example.org/ops");
//! assert!(interceptor.check(&call).is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod engine;
mod error;
mod interceptor;
mod policy;
mod request;

pub use audit::{register_logger_builder, LoggerRegistry};
pub use engine::{evaluate, Decision};
pub use error::{PolicyError, Violation, ViolationKind};
pub use interceptor::{AuthzInterceptor, PermissionDenied};
pub use policy::{
    AuditCondition, HeaderMatcher, HostMatcher, LoggerSpec, PathMatcher, Policy, PrincipalMatcher,
    Rule,
};
pub use request::CallInfo;
