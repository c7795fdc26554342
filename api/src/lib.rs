pub mod auth;
pub mod auth_middleware;
pub mod config;
pub mod db;
pub mod error;
pub mod example_handlers;
pub mod handlers;
pub mod metrics;
pub mod metrics_handler;
pub mod migration_cli;
pub mod observability;
pub mod password;
pub mod rate_limit;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;
pub mod user_handlers;
pub mod validation;
