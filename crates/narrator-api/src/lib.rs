//! Narrator API — HTTP surface for the narrator's client.
//!
//! The server hosts the privileged controller and publisher. Observers read
//! the shared state or follow it as a server-sent-event stream.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router. Layers are added by the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/narrator",
            routes::narrator::router().merge(routes::stream::router()),
        )
        .with_state(state)
}
