use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{error_code, ErrorObject};
use crate::response::unauthorized;
use crate::state::AppState;

/// Identity of the caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return reject("Missing or invalid Authorization header");
    };

    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "bearer token rejected");
            return reject("Invalid or expired token");
        }
    };

    request.extensions_mut().insert(AuthUser { id: claims.sub });

    next.run(request).await
}

fn reject(message: &str) -> Response {
    unauthorized(ErrorObject::new(error_code::AUTH_UNAUTHORIZED_USER, message)).into_response()
}
