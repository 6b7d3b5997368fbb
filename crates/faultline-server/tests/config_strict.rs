#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use faultline_server::config::{self, LogFormat};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8000"
latency:
  min_ms: 100
  spred_ms: 2000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:8000");
    assert_eq!(cfg.latency.min_ms, 100);
    assert_eq!(cfg.latency.spread_ms, 2000);
    assert_eq!(cfg.failure.gateway_timeout_ms, 3000);
    assert!(cfg.metrics.default_metrics);
    assert_eq!(cfg.log.format, LogFormat::Text);
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9000"
latency:
  min_ms: 5
  spread_ms: 10
failure:
  gateway_timeout_ms: 50
metrics:
  default_metrics: false
  collect_interval_ms: 1000
log:
  format: json
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen_addr().unwrap().port(), 9000);
    assert_eq!(cfg.latency.min_ms, 5);
    assert_eq!(cfg.failure.gateway_timeout().as_millis(), 50);
    assert!(!cfg.metrics.default_metrics);
    assert_eq!(cfg.log.format, LogFormat::Json);
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn rejects_out_of_range_values() {
    for bad in [
        "version: 1\nserver: { listen: \"not-an-addr\" }\n",
        "version: 1\nlatency: { spread_ms: 0 }\n",
        "version: 1\nlatency: { min_ms: 0 }\n",
        "version: 1\nlatency: { min_ms: 60001 }\n",
        "version: 1\nfailure: { gateway_timeout_ms: 600000 }\n",
        "version: 1\nmetrics: { collect_interval_ms: 10 }\n",
        "version: 1\nlog: { format: xml }\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{bad}");
    }
}
