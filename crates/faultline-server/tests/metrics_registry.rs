#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use faultline_core::error::{ClientCode, FaultlineError};
use faultline_server::obs::{
    self, metrics::MetricsRegistry, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS,
};

fn registry() -> MetricsRegistry {
    let r = MetricsRegistry::new();
    obs::register_http_metrics(&r).unwrap();
    r
}

fn labels<'a>(route: &'a str, status: &'a str) -> [(&'static str, &'a str); 3] {
    [("method", "GET"), ("route", route), ("status_code", status)]
}

#[test]
fn counter_line_matches_exposition_format() {
    let r = registry();
    r.increment(HTTP_REQUESTS_TOTAL, &labels("/api/success", "200")).unwrap();

    let body = r.export().unwrap();
    assert!(body.contains("# HELP http_requests_total Total number of HTTP requests\n"));
    assert!(body.contains("# TYPE http_requests_total counter\n"));
    assert!(body.contains(
        "http_requests_total{method=\"GET\",route=\"/api/success\",status_code=\"200\"} 1\n"
    ));
}

#[test]
fn label_order_does_not_matter() {
    let r = registry();
    r.increment(
        HTTP_REQUESTS_TOTAL,
        &[("status_code", "404"), ("route", "/x"), ("method", "GET")],
    )
    .unwrap();
    r.increment(HTTP_REQUESTS_TOTAL, &labels("/x", "404")).unwrap();
    assert_eq!(r.counter_value(HTTP_REQUESTS_TOTAL, &labels("/x", "404")), Some(2));
}

#[test]
fn histogram_buckets_are_cumulative() {
    let r = registry();
    let l = labels("/api/success", "200");
    for v in [0.01, 0.2, 0.75, 1.5, 9.0] {
        r.observe(HTTP_REQUEST_DURATION_SECONDS, &l, v).unwrap();
    }

    let body = r.export().unwrap();
    let prefix = "http_request_duration_seconds_bucket{method=\"GET\",route=\"/api/success\",status_code=\"200\",";
    for (le, n) in [("0.05", 1), ("0.1", 1), ("0.3", 2), ("0.5", 2), ("1", 3), ("2", 4), ("5", 4), ("+Inf", 5)] {
        let line = format!("{prefix}le=\"{le}\"}} {n}\n");
        assert!(body.contains(&line), "missing {line} in\n{body}");
    }
    assert!(body.contains(
        "http_request_duration_seconds_count{method=\"GET\",route=\"/api/success\",status_code=\"200\"} 5\n"
    ));
    assert!(body.contains("http_request_duration_seconds_sum{"));
    assert_eq!(r.histogram_count(HTTP_REQUEST_DURATION_SECONDS, &l), Some(5));
}

#[test]
fn families_render_in_registration_order() {
    let r = MetricsRegistry::new();
    r.register_gauge("zzz_first", "first", &[]).unwrap();
    r.register_counter("aaa_second", "second", &["k"]).unwrap();
    r.set("zzz_first", &[], 1.5).unwrap();
    r.increment("aaa_second", &[("k", "v")]).unwrap();

    let body = r.export().unwrap();
    let first = body.find("# HELP zzz_first").unwrap();
    let second = body.find("# HELP aaa_second").unwrap();
    assert!(first < second);
    assert!(body.contains("zzz_first 1.5\n"));
    assert!(body.contains("aaa_second{k=\"v\"} 1\n"));
}

#[test]
fn label_values_are_escaped() {
    let r = MetricsRegistry::new();
    r.register_counter("escaped_total", "help with \\ and\nnewline", &["path"]).unwrap();
    r.increment("escaped_total", &[("path", "a\"b\\c\nd")]).unwrap();

    let body = r.export().unwrap();
    assert!(body.contains("# HELP escaped_total help with \\\\ and\\nnewline\n"));
    assert!(body.contains("escaped_total{path=\"a\\\"b\\\\c\\nd\"} 1\n"));
}

#[test]
fn misuse_is_an_error_not_a_panic() {
    let r = registry();

    let err = r.register_counter(HTTP_REQUESTS_TOTAL, "again", &[]).unwrap_err();
    assert!(matches!(err, FaultlineError::DuplicateMetric(_)));

    let err = r.increment("nope_total", &[]).unwrap_err();
    assert!(matches!(err, FaultlineError::UnknownMetric(_)));

    let err = r.observe(HTTP_REQUESTS_TOTAL, &labels("/", "200"), 1.0).unwrap_err();
    assert!(matches!(err, FaultlineError::MetricKind { expected: "histogram", actual: "counter", .. }));

    let err = r.increment(HTTP_REQUESTS_TOTAL, &[("method", "GET")]).unwrap_err();
    assert!(matches!(err, FaultlineError::LabelMismatch { .. }));
    assert_eq!(err.client_code(), ClientCode::Metrics);

    assert!(r.register_counter("bad name", "x", &[]).is_err());
    assert!(r.register_counter("ok_total", "x", &["le", "le"]).is_err());
    assert!(r.register_histogram("h", "x", &[], &[]).is_err());
    assert!(r.register_histogram("h", "x", &[], &[1.0, 0.5]).is_err());
    assert!(r.register_histogram("h", "x", &["le"], &[1.0]).is_err());
}

#[test]
fn concurrent_increments_are_not_lost() {
    let r = registry();
    let threads = 8;
    let per_thread = 5_000;
    let statuses = ["400", "500", "503", "504"];

    std::thread::scope(|s| {
        for t in 0..threads {
            let r = &r;
            s.spawn(move || {
                for i in 0..per_thread {
                    let status = statuses[(t + i) % statuses.len()];
                    let l = labels("/api/failure", status);
                    r.increment(HTTP_REQUESTS_TOTAL, &l).unwrap();
                    r.observe(HTTP_REQUEST_DURATION_SECONDS, &l, 0.001).unwrap();
                }
            });
        }
    });

    let total: u64 = statuses
        .iter()
        .map(|s| r.counter_value(HTTP_REQUESTS_TOTAL, &labels("/api/failure", s)).unwrap())
        .sum();
    assert_eq!(total, (threads * per_thread) as u64);

    let observed: u64 = statuses
        .iter()
        .map(|s| r.histogram_count(HTTP_REQUEST_DURATION_SECONDS, &labels("/api/failure", s)).unwrap())
        .sum();
    assert_eq!(observed, (threads * per_thread) as u64);
}

#[test]
fn export_is_stable_without_traffic() {
    let r = registry();
    r.increment(HTTP_REQUESTS_TOTAL, &labels("/api/success", "200")).unwrap();
    let a = r.export().unwrap();
    let b = r.export().unwrap();
    assert_eq!(a, b);
}

#[test]
fn float_counters_render_as_counters_and_never_decrease() {
    let r = MetricsRegistry::new();
    r.register_float_counter("cpu_seconds_total", "cpu", &[]).unwrap();

    r.set_total("cpu_seconds_total", &[], 0.25).unwrap();
    r.set_total("cpu_seconds_total", &[], 0.125).unwrap();
    assert_eq!(r.float_counter_value("cpu_seconds_total", &[]), Some(0.25));

    r.set_total("cpu_seconds_total", &[], 1.5).unwrap();
    let body = r.export().unwrap();
    assert!(body.contains("# TYPE cpu_seconds_total counter\n"));
    assert!(body.contains("cpu_seconds_total 1.5\n"));

    let err = r.set("cpu_seconds_total", &[], 2.0).unwrap_err();
    assert!(matches!(err, FaultlineError::MetricKind { expected: "gauge", .. }));
    let err = r.increment("cpu_seconds_total", &[]).unwrap_err();
    assert!(matches!(err, FaultlineError::MetricKind { expected: "counter", .. }));
}
