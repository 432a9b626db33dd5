use crate::policy::{Policy, Rule};
use crate::request::CallInfo;

/// Outcome of evaluating one call against a policy.
///
/// `matched_rule` is `<policy>_<rule>` for the rule that decided, or empty
/// when nothing matched and the call fell through to default-deny.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the call may proceed
    pub authorized: bool,
    /// Qualified name of the deciding rule, empty on default-deny
    pub matched_rule: String,
}

impl Decision {
    /// An allow decision made by `matched_rule`.
    pub fn allow(matched_rule: impl Into<String>) -> Self {
        Self {
            authorized: true,
            matched_rule: matched_rule.into(),
        }
    }

    /// A deny decision made by `matched_rule`.
    pub fn deny(matched_rule: impl Into<String>) -> Self {
        Self {
            authorized: false,
            matched_rule: matched_rule.into(),
        }
    }

    /// The decision when no rule matches.
    pub fn default_deny() -> Self {
        Self::deny(String::new())
    }

    /// Returns whether the call may proceed.
    pub fn is_authorized(&self) -> bool {
        self.authorized
    }
}

/// Evaluates `call` against `policy`.
///
/// Deny rules are tried first, in document order, and the first match
/// denies. Otherwise allow rules are tried in document order and the first
/// match allows. If neither list matches, the call is denied with an empty
/// `matched_rule`.
///
/// Evaluation is pure and cannot fail; everything that could go wrong was
/// rejected when the policy was loaded.
///
/// # Examples
///
/// ```
/// use rpc_authz::{evaluate, CallInfo, Policy};
///
/// let policy = Policy::from_json(r#"{
///     "name": "authz",
///     "allow_rules": [{ "name": "allow_all", "request": { "paths": ["*"] } }],
///     "deny_rules": [{ "name": "deny_stream", "request": { "paths": ["/pkg.Svc/Stream"] } }]
/// }"#).unwrap();
///
/// let allowed = evaluate(&policy, &CallInfo::new("/pkg.Svc/Unary"));
/// assert!(allowed.authorized);
/// assert_eq!(allowed.matched_rule, "authz_allow_all");
///
/// let denied = evaluate(&policy, &CallInfo::new("/pkg.Svc/Stream"));
/// assert!(!denied.authorized);
/// assert_eq!(denied.matched_rule, "authz_deny_stream");
/// ```
pub fn evaluate(policy: &Policy, call: &CallInfo) -> Decision {
    if let Some(rule) = first_match(policy.deny_rules(), call) {
        return Decision::deny(qualified(policy, rule));
    }
    if let Some(rule) = first_match(policy.allow_rules(), call) {
        return Decision::allow(qualified(policy, rule));
    }
    Decision::default_deny()
}

fn first_match<'a>(rules: &'a [Rule], call: &CallInfo) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(call))
}

fn qualified(policy: &Policy, rule: &Rule) -> String {
    format!("{}_{}", policy.name(), rule.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LoggerRegistry;

    fn policy(json: &str) -> Policy {
        Policy::from_json_with_registry(json, &LoggerRegistry::new()).unwrap()
    }

    #[test]
    fn deny_beats_allow() {
        let p = policy(
            r#"{"name":"authz",
                "allow_rules":[{"name":"allow_all","request":{"paths":["*"]}}],
                "deny_rules":[{"name":"deny_one","request":{"paths":["/a.B/C"]}}]}"#,
        );
        assert_eq!(
            evaluate(&p, &CallInfo::new("/a.B/C")),
            Decision::deny("authz_deny_one")
        );
        assert_eq!(
            evaluate(&p, &CallInfo::new("/a.B/D")),
            Decision::allow("authz_allow_all")
        );
    }

    #[test]
    fn first_match_wins_within_a_list() {
        let p = policy(
            r#"{"name":"p","allow_rules":[
                {"name":"specific","request":{"paths":["/a.B/C"]}},
                {"name":"all","request":{"paths":["*"]}}]}"#,
        );
        assert_eq!(evaluate(&p, &CallInfo::new("/a.B/C")).matched_rule, "p_specific");
        assert_eq!(evaluate(&p, &CallInfo::new("/x.Y/Z")).matched_rule, "p_all");
    }

    #[test]
    fn no_match_is_default_deny() {
        let p = policy(
            r#"{"name":"authz","allow_rules":[{"name":"allow_UnaryCall",
                "request":{"paths":["/grpc.testing.TestService/UnaryCall_Z"]}}]}"#,
        );
        let d = evaluate(&p, &CallInfo::new("/grpc.testing.TestService/UnaryCall"));
        assert_eq!(d, Decision::default_deny());
        assert!(!d.is_authorized());
        assert!(d.matched_rule.is_empty());
    }

    #[test]
    fn deny_only_policy_denies_everything() {
        let p = policy(r#"{"name":"p","deny_rules":[{"name":"d","request":{"paths":["/a.B/C"]}}]}"#);
        assert_eq!(evaluate(&p, &CallInfo::new("/a.B/C")), Decision::deny("p_d"));
        assert_eq!(evaluate(&p, &CallInfo::new("/a.B/D")), Decision::default_deny());
    }

    #[test]
    fn principal_scoped_allow() {
        let p = policy(
            r#"{"name":"p","allow_rules":[{"name":"workload",
                "source":{"principals":["spiffe://foo.bar.com/client/workload/1"]},
                "request":{"paths":["*"]}}]}"#,
        );
        let trusted = CallInfo::new("/a.B/C").with_principal("spiffe://foo.bar.com/client/workload/1");
        assert!(evaluate(&p, &trusted).authorized);
        assert!(!evaluate(&p, &CallInfo::new("/a.B/C")).authorized);
    }
}
