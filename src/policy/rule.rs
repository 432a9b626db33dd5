//! Compiled rules and the per-category matchers.
//!
//! Every pattern is either the whole-pattern wildcard `*` or an exact
//! literal. Anything else containing `*` is rejected when the rule is
//! compiled, so matching itself cannot fail.

use std::collections::HashSet;

use super::document::{HeaderDocument, RuleDocument};
use crate::error::{Violation, ViolationKind};
use crate::request::CallInfo;

const WILDCARD: &str = "*";

/// A single compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Any,
    Exact(String),
}

impl Pattern {
    fn parse(raw: &str, what: &str, rule: &str) -> Result<Self, Violation> {
        if raw == WILDCARD {
            return Ok(Pattern::Any);
        }
        if raw.is_empty() {
            return Err(Violation::new(
                ViolationKind::BadPattern,
                format!("rule \"{rule}\": empty {what} pattern"),
            ));
        }
        if raw.contains('*') {
            return Err(Violation::new(
                ViolationKind::BadPattern,
                format!("rule \"{rule}\": {what} pattern \"{raw}\" uses a partial wildcard"),
            ));
        }
        Ok(Pattern::Exact(raw.to_string()))
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Exact(expected) => expected == value,
        }
    }
}

/// A list of alternatives. Empty means the category was not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Alternatives(Vec<Pattern>);

impl Alternatives {
    fn parse(raw: &[String], what: &str, rule: &str) -> Result<Self, Violation> {
        raw.iter()
            .map(|p| Pattern::parse(p, what, rule))
            .collect::<Result<Vec<_>, _>>()
            .map(Alternatives)
    }

    fn is_unset(&self) -> bool {
        self.0.is_empty()
    }

    fn matches(&self, value: &str) -> bool {
        self.is_unset() || self.0.iter().any(|p| p.matches(value))
    }
}

/// Matches the fully qualified method name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatcher(Alternatives);

impl PathMatcher {
    fn parse(raw: &[String], rule: &str) -> Result<Self, Violation> {
        if let Some(bad) = raw.iter().find(|p| *p != WILDCARD && !p.starts_with('/')) {
            return Err(Violation::new(
                ViolationKind::BadPattern,
                format!("rule \"{rule}\": path \"{bad}\" must start with '/'"),
            ));
        }
        Alternatives::parse(raw, "path", rule).map(PathMatcher)
    }

    /// Returns true if the method equals any pattern or any pattern is `*`.
    pub fn matches(&self, method: &str) -> bool {
        self.0.matches(method)
    }
}

/// Matches the call's authority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostMatcher(Alternatives);

impl HostMatcher {
    /// A call with no authority only satisfies an unset matcher.
    pub fn matches(&self, authority: Option<&str>) -> bool {
        match authority {
            Some(host) => self.0.matches(host),
            None => self.0.is_unset(),
        }
    }
}

/// Matches the resolved principal of the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalMatcher(Alternatives);

impl PrincipalMatcher {
    /// Returns true if the principal equals any pattern or any pattern is `*`.
    pub fn matches(&self, principal: &str) -> bool {
        self.0.matches(principal)
    }
}

/// Requires a metadata key to carry one of the listed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatcher {
    key: String,
    values: Alternatives,
}

impl HeaderMatcher {
    fn parse(raw: &HeaderDocument, rule: &str) -> Result<Self, Violation> {
        let key = raw.key.to_ascii_lowercase();
        if key.is_empty() || key.starts_with(':') || key.starts_with("grpc-") {
            return Err(Violation::new(
                ViolationKind::BadHeader,
                format!("rule \"{rule}\": header key \"{}\" cannot be matched", raw.key),
            ));
        }
        if raw.values.is_empty() {
            return Err(Violation::new(
                ViolationKind::BadHeader,
                format!("rule \"{rule}\": header \"{key}\" lists no values"),
            ));
        }
        let values = Alternatives::parse(&raw.values, "header value", rule)?;
        Ok(Self { key, values })
    }

    /// Returns true if any value recorded for the key matches. A `*`
    /// pattern only requires the key to be present.
    pub fn matches(&self, call: &CallInfo) -> bool {
        call.header(&self.key).any(|v| self.values.0.iter().any(|p| p.matches(v)))
    }

    /// Returns the lowercased key this matcher inspects.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A named, compiled allow or deny rule.
///
/// A call matches when every category matches: the principal, the path,
/// the host and each header matcher in turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    principals: PrincipalMatcher,
    paths: PathMatcher,
    hosts: HostMatcher,
    headers: Vec<HeaderMatcher>,
}

impl Rule {
    pub(crate) fn compile(raw: &RuleDocument) -> Result<Self, Violation> {
        if raw.name.is_empty() {
            return Err(Violation::new(
                ViolationKind::UnnamedRule,
                "every rule needs a non-empty name",
            ));
        }
        let name = raw.name.as_str();

        Ok(Self {
            name: raw.name.clone(),
            principals: PrincipalMatcher(Alternatives::parse(
                &raw.source.principals,
                "principal",
                name,
            )?),
            paths: PathMatcher::parse(&raw.request.paths, name)?,
            hosts: HostMatcher(Alternatives::parse(&raw.request.hosts, "host", name)?),
            headers: raw
                .request
                .headers
                .iter()
                .map(|h| HeaderMatcher::parse(h, name))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Returns the rule's name as written in the document.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the principal matcher (`source.principals`).
    pub fn principals(&self) -> &PrincipalMatcher {
        &self.principals
    }

    /// Returns the path matcher (`request.paths`).
    pub fn paths(&self) -> &PathMatcher {
        &self.paths
    }

    /// Returns the host matcher (`request.hosts`).
    pub fn hosts(&self) -> &HostMatcher {
        &self.hosts
    }

    /// Returns the header matchers (`request.headers`), all of which must match.
    pub fn headers(&self) -> &[HeaderMatcher] {
        &self.headers
    }

    /// Returns true if every present matcher category accepts the call.
    pub fn matches(&self, call: &CallInfo) -> bool {
        self.principals.matches(call.principal())
            && self.paths.matches(call.method())
            && self.hosts.matches(call.authority())
            && self.headers.iter().all(|h| h.matches(call))
    }
}

/// Compiles one rule list, rejecting duplicate names.
pub(crate) fn compile_rules(raw: &[RuleDocument], list: &str) -> Result<Vec<Rule>, Violation> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|doc| {
            let rule = Rule::compile(doc)?;
            if !seen.insert(rule.name.clone()) {
                return Err(Violation::new(
                    ViolationKind::DuplicateRule,
                    format!("{list}: \"{}\"", rule.name),
                ));
            }
            Ok(rule)
        })
        .collect()
}
