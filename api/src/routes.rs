use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    auth_middleware::require_auth, example_handlers, handlers, metrics_handler, state::AppState,
    user_handlers,
};

pub fn observability_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler::metrics_endpoint))
}

pub fn example_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/example",
            get(example_handlers::list_items).post(example_handlers::create_item),
        )
        .route(
            "/example/:id",
            get(example_handlers::get_item)
                .put(example_handlers::update_item)
                .delete(example_handlers::delete_item),
        )
}

/// Registration and login are public; everything else needs a bearer token.
pub fn user_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users", get(user_handlers::list_users))
        .route(
            "/users/:id",
            get(user_handlers::get_user)
                .put(user_handlers::update_user)
                .delete(user_handlers::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/users/register", post(user_handlers::register))
        .route("/users/login", post(user_handlers::login))
        .merge(protected)
}

/// Everything mounted under `/api/v1`.
pub fn api_v1_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(example_routes())
        .merge(user_routes(state))
}
