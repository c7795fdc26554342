//! Router assembly and the middleware stack around it.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    middleware, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
};

use crate::handlers::{self, PanicResponder};
use crate::rate_limit::{self, RateLimitState};
use crate::routes;
use crate::state::AppState;

pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("x-dns-prefetch-control", "off"),
    ("x-xss-protection", "0"),
    ("cross-origin-opener-policy", "same-origin"),
];

/// Full application: `/health`, `/metrics`, `/api/v1/*` and the 404 fallback.
pub fn build_app(state: AppState) -> Router {
    let environment = state.config.environment;
    let rate_limit_state = RateLimitState::new(&state.config.rate_limit);

    let api = Router::new()
        .nest("/api/v1", routes::api_v1_routes(state.clone()))
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit::rate_limit_middleware,
        ));

    let mut app = Router::new()
        .merge(routes::observability_routes())
        .merge(api)
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn(handlers::track_http_metrics));

    if !environment.is_production() {
        app = app.layer(middleware::from_fn(handlers::request_logger));
    }

    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    app.layer(SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    ))
    .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
    .layer(CorsLayer::permissive())
    .layer(CatchPanicLayer::custom(PanicResponder { environment }))
    .with_state(state)
}
