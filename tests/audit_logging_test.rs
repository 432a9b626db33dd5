//! End-to-end audit logging through the interceptor adapters.
//!
//! Each case enforces a policy, then makes two unary calls to
//! `/grpc.testing.TestService/UnaryCall` and opens one client stream to
//! `/grpc.testing.TestService/StreamingInputCall`, all from the same
//! SPIFFE principal.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rpc_authz::audit::{Event, LogError, Logger, LoggerBuilder, LoggerConfigError};
use rpc_authz::{AuthzInterceptor, CallInfo, LoggerRegistry, Policy};

const PRINCIPAL: &str = "spiffe://foo.bar.com/client/workload/1";
const UNARY: &str = "/grpc.testing.TestService/UnaryCall";
const STREAMING: &str = "/grpc.testing.TestService/StreamingInputCall";

#[derive(Default)]
struct Stats {
    decisions: HashMap<bool, usize>,
    last_event: HashMap<&'static str, String>,
}

/// Counts decisions and remembers the fields of the last event.
struct StatLogger {
    stats: Arc<Mutex<Stats>>,
}

impl Logger for StatLogger {
    fn log(&self, event: &Event) -> Result<(), LogError> {
        let mut stats = self.stats.lock();
        *stats.decisions.entry(event.authorized()).or_default() += 1;
        let last = &mut stats.last_event;
        last.insert("rpc_method", event.full_method_name().to_string());
        last.insert("principal", event.principal().to_string());
        last.insert("policy_name", event.policy_name().to_string());
        last.insert("matched_rule", event.matched_rule().to_string());
        last.insert("authorized", event.authorized().to_string());
        Ok(())
    }
}

struct StatLoggerBuilder {
    stats: Arc<Mutex<Stats>>,
}

impl LoggerBuilder for StatLoggerBuilder {
    type Config = ();

    fn name(&self) -> &str {
        "stat_logger"
    }

    fn parse_config(&self, _raw: Option<&serde_json::Value>) -> Result<(), LoggerConfigError> {
        Ok(())
    }

    fn build(&self, _config: ()) -> Box<dyn Logger> {
        Box::new(StatLogger {
            stats: Arc::clone(&self.stats),
        })
    }
}

struct Outcome {
    allowed: usize,
    denied: usize,
    last_event: HashMap<&'static str, String>,
}

fn run(policy_json: &str) -> Outcome {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let stats = Arc::new(Mutex::new(Stats::default()));
    let registry = LoggerRegistry::with_defaults();
    registry.register(StatLoggerBuilder {
        stats: Arc::clone(&stats),
    });

    let policy = Policy::from_json_with_registry(policy_json, &registry).expect("policy loads");
    let interceptor = AuthzInterceptor::new(policy);

    let unary = CallInfo::new(UNARY).with_principal(PRINCIPAL);
    let _ = interceptor.unary(&unary, (), |_| "unary reply");
    let _ = interceptor.unary(&unary, (), |_| "unary reply");

    let stream = CallInfo::new(STREAMING).with_principal(PRINCIPAL);
    let payloads = vec![b"hi".to_vec()];
    let _ = interceptor.stream(&stream, payloads.into_iter(), |messages| {
        messages.map(|m| m.len()).sum::<usize>()
    });

    let stats = stats.lock();
    Outcome {
        allowed: stats.decisions.get(&true).copied().unwrap_or(0),
        denied: stats.decisions.get(&false).copied().unwrap_or(0),
        last_event: stats.last_event.clone(),
    }
}

#[test]
fn no_audit() {
    let outcome = run(r#"{
        "name": "authz",
        "allow_rules": [
            { "name": "allow_UnaryCall", "request": { "paths": ["/grpc.testing.TestService/UnaryCall"] } }
        ],
        "audit_logging_options": {
            "audit_condition": "NONE",
            "audit_loggers": [ { "name": "stat_logger", "config": {}, "is_optional": false } ]
        }
    }"#);

    assert_eq!((outcome.allowed, outcome.denied), (0, 0));
    assert!(outcome.last_event.is_empty());
}

#[test]
fn allow_all_deny_streaming_audit_all() {
    let outcome = run(r#"{
        "name": "authz",
        "allow_rules": [
            { "name": "allow_all", "request": { "paths": ["*"] } }
        ],
        "deny_rules": [
            { "name": "deny_all", "request": { "paths": ["/grpc.testing.TestService/StreamingInputCall"] } }
        ],
        "audit_logging_options": {
            "audit_condition": "ON_DENY_AND_ALLOW",
            "audit_loggers": [
                { "name": "stat_logger", "config": {}, "is_optional": false },
                { "name": "stdout_logger", "is_optional": false }
            ]
        }
    }"#);

    assert_eq!((outcome.allowed, outcome.denied), (2, 1));

    let want: HashMap<&str, String> = [
        ("rpc_method", STREAMING),
        ("principal", PRINCIPAL),
        ("policy_name", "authz"),
        ("matched_rule", "authz_deny_all"),
        ("authorized", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect();
    assert_eq!(outcome.last_event, want);
}

#[test]
fn allow_unary_audit_allow() {
    let outcome = run(r#"{
        "name": "authz",
        "allow_rules": [
            { "name": "allow_UnaryCall", "request": { "paths": ["/grpc.testing.TestService/UnaryCall"] } }
        ],
        "audit_logging_options": {
            "audit_condition": "ON_ALLOW",
            "audit_loggers": [ { "name": "stat_logger", "config": {}, "is_optional": false } ]
        }
    }"#);

    assert_eq!((outcome.allowed, outcome.denied), (2, 0));
    assert_eq!(outcome.last_event["matched_rule"], "authz_allow_UnaryCall");
}

#[test]
fn allow_typo_audit_deny() {
    let outcome = run(r#"{
        "name": "authz",
        "allow_rules": [
            { "name": "allow_UnaryCall", "request": { "paths": ["/grpc.testing.TestService/UnaryCall_Z"] } }
        ],
        "audit_logging_options": {
            "audit_condition": "ON_DENY",
            "audit_loggers": [ { "name": "stat_logger", "config": {}, "is_optional": false } ]
        }
    }"#);

    assert_eq!((outcome.allowed, outcome.denied), (0, 3));
    assert_eq!(outcome.last_event["matched_rule"], "");
    assert_eq!(outcome.last_event["rpc_method"], STREAMING);
}

#[test]
fn optional_unknown_logger_does_not_block_load() {
    let outcome = run(r#"{
        "name": "authz",
        "allow_rules": [ { "name": "allow_all", "request": { "paths": ["*"] } } ],
        "audit_logging_options": {
            "audit_condition": "ON_ALLOW",
            "audit_loggers": [
                { "name": "not_linked_in", "is_optional": true },
                { "name": "stat_logger" }
            ]
        }
    }"#);

    assert_eq!((outcome.allowed, outcome.denied), (3, 0));
}

#[test]
fn required_unknown_logger_fails_load() {
    let err = Policy::from_json_with_registry(
        r#"{
            "name": "authz",
            "allow_rules": [ { "name": "allow_all", "request": { "paths": ["*"] } } ],
            "audit_logging_options": {
                "audit_condition": "ON_ALLOW",
                "audit_loggers": [ { "name": "not_linked_in" } ]
            }
        }"#,
        &LoggerRegistry::with_defaults(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("not_linked_in"), "{err}");
}
