use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics;

/// Numeric error codes carried in `error.code` of failure envelopes.
pub mod error_code {
    pub const DEFAULT: i64 = 40000;

    // Authentication & Authorization
    pub const AUTH_USER_ID_REQUIRED: i64 = 40001;
    pub const AUTH_UNAUTHORIZED_USER: i64 = 40100;
    pub const AUTH_UNAUTHORIZED_USER_LOGIN: i64 = 40101;
    pub const AUTH_USER_NOT_FOUND: i64 = 40401;
}

/// Error payload with optional code, message and attached data.
///
/// Anything that can describe itself this way can be routed through
/// [`crate::response::handle_error`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Every failure outcome a handler can terminate a request with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {}", .message.as_deref().unwrap_or("<none>"))]
    BadRequest {
        message: Option<String>,
        code: Option<i64>,
        info: Option<Value>,
    },
    #[error("unauthorized")]
    Unauthorized(Option<ErrorObject>),
    #[error("forbidden")]
    Forbidden(Option<ErrorObject>),
    #[error("not found: {}", .0.as_deref().unwrap_or("<none>"))]
    NotFound(Option<String>),
    #[error("server error")]
    ServerError(Option<Value>),
}

#[derive(Debug, Serialize)]
struct BadRequestDetail<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<E: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<E>,
}

#[derive(Debug, Serialize)]
struct MessageEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the envelope's `type` member
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServerError(_) => "server_error",
        }
    }

    /// Wire body of this outcome.
    pub fn body(&self) -> Value {
        let body = match self {
            ApiError::BadRequest {
                message,
                code,
                info,
            } => serde_json::to_value(ErrorEnvelope {
                kind: self.kind(),
                error: Some(BadRequestDetail {
                    message: message.as_deref(),
                    code: *code,
                    info: info.as_ref(),
                }),
            }),
            ApiError::Unauthorized(error) | ApiError::Forbidden(error) => {
                serde_json::to_value(ErrorEnvelope {
                    kind: self.kind(),
                    error: error.as_ref(),
                })
            }
            ApiError::NotFound(message) => serde_json::to_value(MessageEnvelope {
                kind: self.kind(),
                message: message.as_deref(),
            }),
            ApiError::ServerError(error) => serde_json::to_value(ErrorEnvelope {
                kind: self.kind(),
                error: error.as_ref(),
            }),
        };
        body.unwrap_or_else(|_| serde_json::json!({ "type": self.kind() }))
    }

    fn log(&self) {
        match self {
            ApiError::BadRequest {
                message,
                code,
                info,
            } => {
                tracing::error!(
                    code = code.unwrap_or(error_code::DEFAULT),
                    error_message = message.as_deref().unwrap_or_default(),
                    info = ?info,
                    "bad_request"
                );
            }
            ApiError::Unauthorized(error) => {
                let error = error.clone().unwrap_or_default();
                tracing::error!(code = ?error.code, error_message = ?error.message, data = ?error.data, "unauthorized");
            }
            ApiError::Forbidden(error) => {
                let error = error.clone().unwrap_or_default();
                tracing::error!(code = ?error.code, error_message = ?error.message, data = ?error.data, "forbidden");
            }
            // Not-found is an expected outcome, kept off the error channel.
            ApiError::NotFound(message) => {
                tracing::warn!(error_message = message.as_deref().unwrap_or_default(), "not_found");
            }
            ApiError::ServerError(error) => {
                tracing::error!(error = ?error, "server_error");
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        metrics::observe_error_response(self.kind());

        let correlation_id = Uuid::new_v4().to_string();
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static("x-correlation-id"), value);
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
