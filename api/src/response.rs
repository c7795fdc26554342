//! Response contract shared by every endpoint.
//!
//! Handlers return `ApiResult<Success<T>>`, so each request is answered by
//! exactly one of the functions below. Failure constructors build an
//! [`ApiError`]; logging of the payload happens when it is turned into a
//! response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{error_code, ApiError, ErrorObject};
use crate::metrics;
use crate::validation::ValidationResult;

/// Successful outcome: `{message?, data?}` with status 200 unless overridden.
#[derive(Debug)]
pub struct Success<T> {
    status: StatusCode,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Serialize)]
struct SuccessBody<'a, T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}

impl<T: Serialize> Success<T> {
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Value {
        serde_json::to_value(SuccessBody {
            message: self.message.as_deref(),
            data: self.data.as_ref(),
        })
        .unwrap_or(Value::Null)
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> Success<T> {
    Success {
        status: StatusCode::OK,
        message: Some(message.into()),
        data: Some(data),
    }
}

/// Success carrying only a message.
pub fn success_message(message: impl Into<String>) -> Success<()> {
    Success {
        status: StatusCode::OK,
        message: Some(message.into()),
        data: None,
    }
}

pub fn bad_request(
    message: impl Into<String>,
    code: Option<i64>,
    info: Option<Value>,
) -> ApiError {
    ApiError::BadRequest {
        message: Some(message.into()),
        code,
        info,
    }
}

pub fn unauthorized(error: ErrorObject) -> ApiError {
    ApiError::Unauthorized(Some(error))
}

pub fn forbidden(error: ErrorObject) -> ApiError {
    ApiError::Forbidden(Some(error))
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    ApiError::NotFound(Some(message.into()))
}

pub fn server_error(error: Option<Value>) -> ApiError {
    ApiError::ServerError(error)
}

/// Route any error-like value through `bad_request`, defaulting the code.
pub fn handle_error(error: impl Into<ErrorObject>) -> ApiError {
    let error = error.into();
    ApiError::BadRequest {
        message: error.message,
        code: Some(error.code.unwrap_or(error_code::DEFAULT)),
        info: error.data,
    }
}

/// `bad_request("Validation failed", code, errors)` for a failed rule set.
pub fn validation_failed(result: ValidationResult, code: i64) -> ApiError {
    for error in result.errors() {
        tracing::debug!(field = %error.field, code = %error.code, "validation rule failed");
        metrics::observe_validation_failure(error.code.as_str());
    }
    let info = serde_json::to_value(result.into_errors()).unwrap_or(Value::Null);
    bad_request("Validation failed", Some(code), Some(info))
}
