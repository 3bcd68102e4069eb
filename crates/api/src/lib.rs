//! HTTP API for the agency operations platform.
//!
//! JSON endpoints per role (telecaller, business developer, brand head,
//! writer, designer, digital marketer, client). Authentication is handled by
//! the fronting proxy.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

/// Build the application with all routes and request tracing.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
