use std::any::Any;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, OriginalUri, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::Environment;
use crate::error::{error_code, ApiError, ErrorObject};
use crate::metrics;
use crate::response::handle_error;
use crate::state::AppState;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log an unexpected failure and answer with a generic `bad_request`.
pub(crate) fn internal_error(operation: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!(operation = operation, error = %err, "operation failed");
    handle_error(ErrorObject::new(
        error_code::DEFAULT,
        "An unexpected error occurred",
    ))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs_f64();
    let now = chrono::Utc::now().to_rfc3339();
    let environment = state.config.environment.to_string();

    match state.users.ping().await {
        Ok(()) => {
            tracing::debug!(uptime_secs = uptime, "health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "timestamp": now,
                    "uptime": uptime,
                    "environment": environment,
                    "version": SERVICE_VERSION,
                })),
            )
        }
        Err(err) => {
            tracing::warn!(uptime_secs = uptime, error = %err, "health check degraded, database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "uptime": uptime,
                    "environment": environment,
                    "version": SERVICE_VERSION,
                })),
            )
        }
    }
}

pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    tracing::warn!(path = %uri.path(), "route not found");
    metrics::observe_error_response("not_found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "type": "not_found",
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}

/// Outermost error boundary, used with `CatchPanicLayer::custom`.
///
/// The panic payload is only echoed outside production.
#[derive(Clone, Copy)]
pub struct PanicResponder {
    pub environment: Environment,
}

impl tower_http::catch_panic::ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let detail = panic_message(err.as_ref());
        tracing::error!(panic = %detail, "Global error handler caught a panic");
        metrics::observe_error_response("server_error");

        let message = if self.environment.is_production() {
            "Internal server error".to_string()
        } else {
            detail
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "type": "server_error", "message": message })),
        )
            .into_response()
    }
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

/// Records request count and latency per matched route.
pub async fn track_http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    metrics::HTTP_IN_FLIGHT.inc();
    let response = next.run(req).await;
    metrics::HTTP_IN_FLIGHT.dec();

    metrics::observe_http(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed().as_millis();
    let status = response.status().as_u16();

    tracing::info!("{method} {uri} {status} {elapsed}ms");

    response
}
