//! Audit event schema.

use std::fmt;

use serde::Serialize;

/// One authorization outcome, as handed to every configured logger.
///
/// Events carry no timestamp; each logger stamps the time of emission in
/// its own format.
///
/// # Example
///
/// ```
/// use rpc_authz::audit::Event;
///
/// let event = Event::new("/pkg.Service/Method", "spiffe://foo", "authz", "authz_allow_all", true);
///
/// assert_eq!(event.policy_name(), "authz");
/// assert!(event.authorized());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    full_method_name: String,
    principal: String,
    policy_name: String,
    matched_rule: String,
    authorized: bool,
}

impl Event {
    /// Creates an event from its five fields.
    ///
    /// `principal` and `matched_rule` are empty for unauthenticated callers
    /// and default-deny outcomes respectively.
    pub fn new(
        full_method_name: impl Into<String>,
        principal: impl Into<String>,
        policy_name: impl Into<String>,
        matched_rule: impl Into<String>,
        authorized: bool,
    ) -> Self {
        Self {
            full_method_name: full_method_name.into(),
            principal: principal.into(),
            policy_name: policy_name.into(),
            matched_rule: matched_rule.into(),
            authorized,
        }
    }

    /// Returns the fully qualified RPC method.
    pub fn full_method_name(&self) -> &str {
        &self.full_method_name
    }

    /// Returns the caller identity, empty if unauthenticated.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Returns the name of the policy that decided.
    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    /// Returns `<policy>_<rule>`, or empty on default-deny.
    pub fn matched_rule(&self) -> &str {
        &self.matched_rule
    }

    /// Returns whether the call was authorized.
    pub fn authorized(&self) -> bool {
        self.authorized
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[method={}, principal={}, policy={}, matched_rule={}, authorized={}]",
            self.full_method_name,
            if self.principal.is_empty() {
                "<none>"
            } else {
                self.principal.as_str()
            },
            self.policy_name,
            if self.matched_rule.is_empty() {
                "<none>"
            } else {
                self.matched_rule.as_str()
            },
            self.authorized
        )
    }
}
