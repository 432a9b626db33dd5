//! Policy documents: parsing, validation and logger resolution.
//!
//! A [`Policy`] is built once per load and is immutable afterwards. It owns
//! its compiled rules and the loggers resolved from its `audit_loggers`,
//! so evaluating and auditing against it needs no locking.

mod document;
mod rule;

use std::fmt;
use std::sync::Arc;

pub use document::{AuditCondition, LoggerSpec};
pub use rule::{HeaderMatcher, HostMatcher, PathMatcher, PrincipalMatcher, Rule};

use crate::audit::{global_registry, Logger, LoggerRegistry};
use crate::error::{PolicyError, Violation, ViolationKind};
use document::PolicyDocument;

/// A loaded, validated authorization policy.
///
/// # Examples
///
/// ```
/// use rpc_authz::{AuditCondition, Policy};
///
/// let policy = Policy::from_json(r#"{
///     "name": "authz",
///     "allow_rules": [{ "name": "allow_all", "request": { "paths": ["*"] } }]
/// }"#).unwrap();
///
/// assert_eq!(policy.name(), "authz");
/// assert_eq!(policy.audit_condition(), AuditCondition::None);
/// ```
pub struct Policy {
    name: String,
    deny_rules: Vec<Rule>,
    allow_rules: Vec<Rule>,
    audit_condition: AuditCondition,
    logger_specs: Vec<LoggerSpec>,
    loggers: Vec<Arc<dyn Logger>>,
}

impl Policy {
    /// Loads a policy, resolving loggers through the process-wide registry.
    ///
    /// # Errors
    ///
    /// See [`Policy::from_json_with_registry`].
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        Self::from_json_with_registry(json, global_registry())
    }

    /// Loads a policy, resolving loggers through `registry`.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if the document is malformed, violates a
    /// structural rule, or names a non-optional logger that cannot be
    /// built. Nothing is partially applied on error.
    pub fn from_json_with_registry(
        json: &str,
        registry: &LoggerRegistry,
    ) -> Result<Self, PolicyError> {
        let doc: PolicyDocument = serde_json::from_str(json)?;

        if doc.name.is_empty() {
            return Err(Violation::new(
                ViolationKind::MissingName,
                "\"name\" must be a non-empty string",
            )
            .into());
        }
        if doc.allow_rules.is_empty() && doc.deny_rules.is_empty() {
            return Err(Violation::new(
                ViolationKind::NoRules,
                format!("policy \"{}\" has neither allow_rules nor deny_rules", doc.name),
            )
            .into());
        }

        let deny_rules = rule::compile_rules(&doc.deny_rules, "deny_rules")?;
        let allow_rules = rule::compile_rules(&doc.allow_rules, "allow_rules")?;

        let options = doc.audit_logging_options;
        let loggers = resolve_loggers(&options.audit_loggers, registry)?;

        tracing::info!(
            policy = %doc.name,
            deny_rules = deny_rules.len(),
            allow_rules = allow_rules.len(),
            audit_condition = ?options.audit_condition,
            audit_loggers = loggers.len(),
            "loaded authorization policy"
        );

        Ok(Self {
            name: doc.name,
            deny_rules,
            allow_rules,
            audit_condition: options.audit_condition,
            logger_specs: options.audit_loggers,
            loggers,
        })
    }

    /// Returns the policy name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the deny rules in document order.
    pub fn deny_rules(&self) -> &[Rule] {
        &self.deny_rules
    }

    /// Returns the allow rules in document order.
    pub fn allow_rules(&self) -> &[Rule] {
        &self.allow_rules
    }

    /// Returns which outcomes are audited.
    pub fn audit_condition(&self) -> AuditCondition {
        self.audit_condition
    }

    /// Returns the logger specs as written, including skipped optional ones.
    pub fn logger_specs(&self) -> &[LoggerSpec] {
        &self.logger_specs
    }

    /// Returns the loggers that were built, in spec order.
    pub fn loggers(&self) -> &[Arc<dyn Logger>] {
        &self.loggers
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("name", &self.name)
            .field("deny_rules", &self.deny_rules)
            .field("allow_rules", &self.allow_rules)
            .field("audit_condition", &self.audit_condition)
            .field("logger_specs", &self.logger_specs)
            .field("loggers", &self.loggers.len())
            .finish()
    }
}

/// Builds one logger per `LoggerSpec`, in order.
///
/// Optional specs that cannot be built are skipped; required ones fail the
/// whole load.
fn resolve_loggers(
    specs: &[LoggerSpec],
    registry: &LoggerRegistry,
) -> Result<Vec<Arc<dyn Logger>>, PolicyError> {
    let mut loggers = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        let Some(builder) = registry.get(&spec.builder_name) else {
            if spec.is_optional {
                tracing::warn!(
                    index,
                    builder = %spec.builder_name,
                    "skipping optional audit logger: builder not registered"
                );
                continue;
            }
            return Err(PolicyError::UnknownLogger {
                index,
                name: spec.builder_name.clone(),
            });
        };

        match builder.load(spec.config.as_ref()) {
            Ok(logger) => loggers.push(logger),
            Err(source) if spec.is_optional => {
                tracing::warn!(
                    index,
                    builder = %spec.builder_name,
                    error = %source,
                    "skipping optional audit logger: invalid config"
                );
            }
            Err(source) => {
                return Err(PolicyError::LoggerConfig {
                    index,
                    name: spec.builder_name.clone(),
                    source,
                });
            }
        }
    }

    Ok(loggers)
}
