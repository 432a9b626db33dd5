//! Wire schema of the JSON policy document.
//!
//! These types mirror the document one-to-one and carry no validation
//! beyond what serde enforces. `Policy` compiles them into matchers.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PolicyDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deny_rules: Vec<RuleDocument>,
    #[serde(default)]
    pub allow_rules: Vec<RuleDocument>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audit_logging_options: AuditLoggingOptions,
}

/// Treats an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RuleDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: SourceDocument,
    #[serde(default)]
    pub request: RequestDocument,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SourceDocument {
    #[serde(default)]
    pub principals: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RequestDocument {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub headers: Vec<HeaderDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HeaderDocument {
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AuditLoggingOptions {
    #[serde(default)]
    pub audit_condition: AuditCondition,
    #[serde(default)]
    pub audit_loggers: Vec<LoggerSpec>,
}

/// Which decision outcomes produce an audit event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCondition {
    /// Never audit
    #[default]
    None,
    /// Audit authorized calls only
    OnAllow,
    /// Audit denied calls only
    OnDeny,
    /// Audit every call
    OnDenyAndAllow,
}

impl AuditCondition {
    /// Returns whether a decision with the given outcome is audited.
    ///
    /// ```
    /// use rpc_authz::AuditCondition;
    ///
    /// assert!(AuditCondition::OnDeny.should_audit(false));
    /// assert!(!AuditCondition::OnDeny.should_audit(true));
    /// ```
    pub fn should_audit(self, authorized: bool) -> bool {
        match self {
            AuditCondition::None => false,
            AuditCondition::OnAllow => authorized,
            AuditCondition::OnDeny => !authorized,
            AuditCondition::OnDenyAndAllow => true,
        }
    }
}

/// Reference from a policy to a named logger builder plus its raw config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSpec {
    /// Registry key of the builder
    #[serde(rename = "name")]
    pub builder_name: String,
    /// Opaque config handed to the builder; `None` when absent or `null`
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    /// Skip this logger instead of failing the load when it cannot be built
    #[serde(default)]
    pub is_optional: bool,
}
