//! Server-sent-event stream of the shared state, for observers.

use std::convert::Infallible;

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::Stream;
use narrator_core::store::StateStore;
use tracing::{info, warn};

use crate::state::AppState;

/// Name of the SSE event carrying a [`SharedState`](narrator_core::state::SharedState).
pub const STATE_EVENT: &str = "state";

/// GET /stream
///
/// Sends the current state first, then every change in write order. The
/// stream ends when the store shuts down.
async fn stream_state(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("observer attached to state stream");
    let subscription = state.store.subscribe();
    let events = futures::stream::unfold(subscription, |mut subscription| async move {
        let shared = subscription.recv().await?;
        let event = Event::default()
            .event(STATE_EVENT)
            .json_data(&shared)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to encode shared state");
                Event::default().comment("encoding error")
            });
        Some((Ok(event), subscription))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Returns the router for the state stream.
pub fn router() -> Router<AppState> {
    Router::new().route("/stream", get(stream_state))
}
