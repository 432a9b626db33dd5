use thiserror::Error;

use crate::audit::LoggerConfigError;

/// Errors raised while loading a policy document.
///
/// Every variant is fatal to the load that produced it. A failed load never
/// replaces a policy that is already active.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The document is not valid JSON or does not match the schema.
    #[error("failed to parse policy document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but violates a structural rule.
    #[error("invalid policy: {0}")]
    Invalid(Violation),

    /// A non-optional audit logger names a builder nobody registered.
    #[error("audit logger {index} references unregistered builder \"{name}\"")]
    UnknownLogger {
        /// Position of the logger in `audit_loggers`.
        index: usize,
        /// The builder name that failed to resolve.
        name: String,
    },

    /// A non-optional audit logger rejected its configuration.
    #[error("audit logger {index} (\"{name}\") has invalid config: {source}")]
    LoggerConfig {
        /// Position of the logger in `audit_loggers`.
        index: usize,
        /// The builder that rejected the config.
        name: String,
        /// The builder's own error.
        #[source]
        source: LoggerConfigError,
    },
}

impl From<Violation> for PolicyError {
    fn from(v: Violation) -> Self {
        PolicyError::Invalid(v)
    }
}

/// A structural problem found while validating a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable detail, naming the offending rule or field
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The kind of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViolationKind {
    /// `name` is missing or empty
    #[error("missing policy name")]
    MissingName,
    /// Neither `allow_rules` nor `deny_rules` contains a rule
    #[error("no rules")]
    NoRules,
    /// A rule has an empty name
    #[error("unnamed rule")]
    UnnamedRule,
    /// Two rules in the same list share a name
    #[error("duplicate rule name")]
    DuplicateRule,
    /// A path, host, principal or header value pattern is malformed
    #[error("bad pattern")]
    BadPattern,
    /// A header matcher names a reserved key or lists no values
    #[error("bad header matcher")]
    BadHeader,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display_includes_kind_and_message() {
        let v = Violation::new(ViolationKind::DuplicateRule, "allow_rules: \"a\"");
        assert_eq!(v.to_string(), "duplicate rule name: allow_rules: \"a\"");
    }

    #[test]
    fn invalid_error_wraps_violation() {
        let err: PolicyError = Violation::new(ViolationKind::MissingName, "name").into();
        assert!(err.to_string().starts_with("invalid policy: missing policy name"));
    }

    #[test]
    fn unknown_logger_names_builder() {
        let err = PolicyError::UnknownLogger {
            index: 2,
            name: "nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "audit logger 2 references unregistered builder \"nope\""
        );
    }
}
