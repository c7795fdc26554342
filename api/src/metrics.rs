use once_cell::sync::Lazy;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! histogram_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| {
            HistogramVec::new(HistogramOpts::new($name, $help).buckets(LATENCY_BUCKETS.to_vec()), $labels)
                .unwrap()
        })
    };
}
macro_rules! counter {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntCounter::new($name, $help).unwrap())
    };
}
macro_rules! gauge {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntGauge::new($name, $help).unwrap())
    };
}

const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "path", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> =
    histogram_vec!("http_request_duration_seconds", "HTTP request latency", &["method", "path"]);
pub static HTTP_IN_FLIGHT: Lazy<IntGauge> = gauge!("http_requests_in_flight", "In-flight HTTP requests");
pub static RATE_LIMITED_TOTAL: Lazy<IntCounter> =
    counter!("http_rate_limited_total", "Requests rejected by the rate limiter");

// ── Responses ───────────────────────────────────────────────────────────────
pub static ERROR_RESPONSES_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("error_responses_total", "Non-success responses by envelope type", &["type"]);
pub static VALIDATION_FAILURES_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("validation_failures_total", "Failed validation rules by code", &["code"]);

// ── Users ───────────────────────────────────────────────────────────────────
pub static USERS_REGISTERED: Lazy<IntCounter> =
    counter!("users_registered_total", "Successful user registrations");
pub static LOGINS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("logins_total", "Login attempts by result", &["result"]);

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(HTTP_IN_FLIGHT.clone()))?;
    r.register(Box::new(RATE_LIMITED_TOTAL.clone()))?;
    r.register(Box::new(ERROR_RESPONSES_TOTAL.clone()))?;
    r.register(Box::new(VALIDATION_FAILURES_TOTAL.clone()))?;
    r.register(Box::new(USERS_REGISTERED.clone()))?;
    r.register(Box::new(LOGINS_TOTAL.clone()))?;
    Ok(())
}

pub fn gather_metrics(r: &Registry) -> String {
    let encoder = TextEncoder::new();
    let families = r.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).unwrap_or_default();
    String::from_utf8(buf).unwrap_or_default()
}

pub fn observe_http(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn observe_error_response(kind: &str) {
    ERROR_RESPONSES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_validation_failure(code: &str) {
    VALIDATION_FAILURES_TOTAL.with_label_values(&[code]).inc();
}

pub fn observe_login(success: bool) {
    let result = if success { "success" } else { "failure" };
    LOGINS_TOTAL.with_label_values(&[result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_registry() -> Registry {
        let r = Registry::new_custom(Some("t".into()), None).unwrap();
        register_all(&r).unwrap();
        r
    }

    #[test]
    fn test_http_request_counter() {
        let r = fresh_registry();
        observe_http("GET", "/health", 200, 0.002);
        let text = gather_metrics(&r);
        assert!(text.contains("t_http_requests_total"));
        assert!(text.contains("t_http_request_duration_seconds"));
    }

    #[test]
    fn test_error_and_validation_counters() {
        let r = fresh_registry();
        observe_error_response("metrics_test");
        observe_validation_failure("REQUIRED");
        assert_eq!(ERROR_RESPONSES_TOTAL.with_label_values(&["metrics_test"]).get(), 1);
        let text = gather_metrics(&r);
        assert!(text.contains("t_validation_failures_total"));
        assert!(text.contains("code=\"REQUIRED\""));
    }

    #[test]
    fn test_metric_names_prefixed() {
        let r = fresh_registry();
        observe_login(true);
        for fam in r.gather() {
            assert!(fam.get_name().starts_with("t_"), "metric {} missing prefix", fam.get_name());
        }
    }
}
