use axum::{extract::State, Extension};
use serde::Serialize;
use shared::{NewUser, PageRequest, Pagination, PublicUser, User, UserChanges};

use crate::auth_middleware::AuthUser;
use crate::db::StoreError;
use crate::error::{error_code, ApiError, ApiResult, ErrorObject};
use crate::handlers::internal_error;
use crate::metrics;
use crate::password::{hash_password, verify_password};
use crate::request::RequestContext;
use crate::response::{
    bad_request, handle_error, not_found, success, success_message, unauthorized,
    validation_failed, Success,
};
use crate::state::AppState;
use crate::validation::{validate, RuleSet, ValidationRule};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
    pub pagination: Pagination,
}

fn register_rules() -> RuleSet {
    RuleSet::new()
        .field("email", ValidationRule::required().email())
        .field("password", ValidationRule::required().password())
        .field("name", ValidationRule::required().string().min_length(2))
}

fn update_rules() -> RuleSet {
    RuleSet::new()
        .field("name", ValidationRule::optional().string().min_length(2))
        .field("email", ValidationRule::optional().email())
        .field("password", ValidationRule::optional().password())
}

fn user_id(ctx: &RequestContext) -> ApiResult<i64> {
    ctx.param_id("id")
        .filter(|id| *id != 0)
        .ok_or_else(|| bad_request("User ID is required", None, None))
}

/// Users are keyed by `i32`; an id outside that range cannot exist.
async fn load_user(state: &AppState, id: i64) -> ApiResult<User> {
    let Ok(id) = i32::try_from(id) else {
        return Err(not_found("User not found"));
    };
    state
        .users
        .find_user(id)
        .await
        .map_err(handle_error)?
        .ok_or_else(|| not_found("User not found"))
}

fn email_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => bad_request("Email already exists", Some(error_code::DEFAULT), None),
        other => handle_error(other),
    }
}

fn invalid_credentials() -> ApiError {
    metrics::observe_login(false);
    unauthorized(ErrorObject::new(
        error_code::AUTH_UNAUTHORIZED_USER_LOGIN,
        "Invalid email or password",
    ))
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    state
        .tokens
        .generate(user.id.to_string())
        .map_err(|err| internal_error("issue token", err))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<AuthResponse>> {
    let result = validate(ctx.body(), &register_rules());
    if !result.is_valid() {
        return Err(validation_failed(result, error_code::DEFAULT));
    }

    let (Some(email), Some(password), Some(name)) = (
        ctx.present_text("email"),
        ctx.body_value::<String>("password"),
        ctx.present_text("name"),
    ) else {
        return Err(internal_error("register", "fields missing after validation"));
    };

    let password_hash = hash_password(&password)
        .await
        .map_err(|err| internal_error("hash password", err))?;

    let user = state
        .users
        .create_user(NewUser {
            email,
            password_hash,
            name,
        })
        .await
        .map_err(email_conflict)?;

    let token = issue_token(&state, &user)?;
    metrics::USERS_REGISTERED.inc();
    tracing::info!(user_id = user.id, "user registered");

    Ok(success(
        "User registered successfully",
        AuthResponse {
            user: user.to_public(),
            token,
        },
    ))
}

/// Exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<AuthResponse>> {
    let (Some(email), Some(password)) = (
        ctx.present_text("email"),
        ctx.body_value::<String>("password").filter(|p| !p.is_empty()),
    ) else {
        return Err(bad_request(
            "Email and password are required",
            Some(error_code::DEFAULT),
            None,
        ));
    };

    let Some(user) = state
        .users
        .find_user_by_email(&email)
        .await
        .map_err(handle_error)?
    else {
        return Err(invalid_credentials());
    };

    let valid = verify_password(&password, &user.password)
        .await
        .map_err(|err| internal_error("verify password", err))?;
    if !valid {
        return Err(invalid_credentials());
    }

    let token = issue_token(&state, &user)?;
    metrics::observe_login(true);
    tracing::info!(user_id = user.id, "user logged in");

    Ok(success(
        "Login successful",
        AuthResponse {
            user: user.to_public(),
            token,
        },
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<UserListResponse>> {
    let page = PageRequest::new(ctx.query_value("page"), ctx.query_value("limit"));

    let (users, total) = state.users.list_users(page).await.map_err(handle_error)?;

    Ok(success(
        "Users retrieved successfully",
        UserListResponse {
            users: users.iter().map(User::to_public).collect(),
            pagination: Pagination::new(page, total),
        },
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<PublicUser>> {
    let id = user_id(&ctx)?;
    let user = load_user(&state, id).await?;

    Ok(success("User retrieved successfully", user.to_public()))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ctx: RequestContext,
) -> ApiResult<Success<PublicUser>> {
    let id = user_id(&ctx)?;
    let user = load_user(&state, id).await?;

    let result = validate(ctx.body(), &update_rules());
    if !result.is_valid() {
        return Err(validation_failed(result, error_code::DEFAULT));
    }

    let password_hash = match ctx.body_value::<String>("password").filter(|p| !p.trim().is_empty()) {
        Some(password) => Some(
            hash_password(&password)
                .await
                .map_err(|err| internal_error("hash password", err))?,
        ),
        None => None,
    };

    let changes = UserChanges {
        email: ctx.present_text("email"),
        name: ctx.present_text("name"),
        password_hash,
        is_active: ctx.body_value::<bool>("isActive"),
    };

    let updated = state
        .users
        .update_user(user.id, changes)
        .await
        .map_err(email_conflict)?
        .ok_or_else(|| not_found("User not found"))?;

    tracing::info!(user_id = updated.id, caller = %caller.id, "user updated");
    Ok(success("User updated successfully", updated.to_public()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ctx: RequestContext,
) -> ApiResult<Success<()>> {
    let id = user_id(&ctx)?;
    let user = load_user(&state, id).await?;

    let deleted = state.users.delete_user(user.id).await.map_err(handle_error)?;
    if !deleted {
        return Err(not_found("User not found"));
    }

    tracing::info!(user_id = user.id, caller = %caller.id, "user deleted");
    Ok(success_message("User deleted successfully"))
}
