//! Fixed-window, per-client-IP request limiter for the `/api` surface.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RateLimitSettings;
use crate::metrics;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

const HEADER_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const HEADER_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const HEADER_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Clone)]
pub struct RateLimitState {
    max_requests: u32,
    window: Duration,
    trust_proxy: bool,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimitState {
    pub fn new(settings: &RateLimitSettings) -> Self {
        tracing::info!(
            max_requests = settings.max_requests,
            window_secs = settings.window.as_secs(),
            trust_proxy = settings.trust_proxy,
            "Rate limiter configured"
        );
        Self {
            max_requests: settings.max_requests,
            window: settings.window,
            trust_proxy: settings.trust_proxy,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_request<B>(&self, request: &Request<B>) -> RateLimitDecision {
        let ip = extract_client_ip(request, self.trust_proxy);
        let now = Instant::now();

        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Expired windows go first; a returning client starts fresh.
        let window = self.window;
        buckets.retain(|_, bucket| now.duration_since(bucket.window_start) < window);

        let bucket = buckets.entry(ip).or_insert_with(|| BucketState {
            window_start: now,
            count: 0,
        });

        let remaining_window = self
            .window
            .saturating_sub(now.duration_since(bucket.window_start));
        let reset_seconds = ceil_duration_to_seconds(remaining_window).max(1);

        if bucket.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_seconds,
            };
        }

        bucket.count += 1;

        RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(bucket.count),
            reset_seconds,
        }
    }
}

struct BucketState {
    window_start: Instant,
    count: u32,
}

struct RateLimitDecision {
    allowed: bool,
    limit: u32,
    remaining: u32,
    reset_seconds: u64,
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = rate_limiter.check_request(&request);

    if !decision.allowed {
        tracing::warn!(
            path = %request.uri().path(),
            ip = %extract_client_ip(&request, rate_limiter.trust_proxy),
            "rate limit exceeded"
        );
        metrics::RATE_LIMITED_TOTAL.inc();

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "type": "too_many_requests", "message": RATE_LIMIT_MESSAGE })),
        )
            .into_response();
        attach_rate_limit_headers(&mut response, &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&decision.reset_seconds.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("1")),
        );
        return response;
    }

    let mut response = next.run(request).await;
    attach_rate_limit_headers(&mut response, &decision);
    response
}

fn attach_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert(HEADER_RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RATE_LIMIT_RESET, HeaderValue::from(decision.reset_seconds));
}

/// Forwarding headers are client-controlled, so they are only read when
/// the server sits behind a trusted proxy.
fn extract_client_ip<B>(request: &Request<B>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_x_forwarded_for)
        {
            return ip.to_string();
        }

        if let Some(ip) = request
            .headers()
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_ip_addr)
        {
            return ip.to_string();
        }
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

fn parse_x_forwarded_for(raw: &str) -> Option<IpAddr> {
    raw.split(',').map(str::trim).find_map(parse_ip_addr)
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn ceil_duration_to_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
