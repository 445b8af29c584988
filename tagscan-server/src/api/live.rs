//! Live new-tag stream (Server-Sent Events)
//!
//! `GET /api/tags/stream?token=<jwt>&all=<bool>`
//!
//! Connection lifecycle:
//! - **Authenticating**: the token comes from the query string because the
//!   browser EventSource API cannot set headers. Placeholder values
//!   (`null`, `undefined`) and bad tokens are rejected with 401 before any
//!   channel is allocated.
//! - **Active**: a channel is registered under the caller's own scope, or the
//!   `All` scope when `all` is set, and a `connected` event is sent first.
//! - **Closed**: when the client goes away the stream is dropped and its
//!   [`SubscriptionGuard`] unsubscribes the channel. That drop is the only
//!   teardown path.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tagscan_common::api::{credential_from_query, verify_token, AuthError};
use tagscan_common::TagEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::{SubscriptionRegistry, SubscriptionScope};
use crate::AppState;

/// Query parameters for the live stream
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
    /// `true`/`1`/`yes` selects the all-users scope
    pub all: Option<String>,
}

impl StreamQuery {
    fn wants_all(&self) -> bool {
        matches!(
            self.all.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
            Some("true") | Some("1") | Some("yes")
        )
    }
}

/// Unsubscribes its channel when the stream is dropped
struct SubscriptionGuard {
    registry: Arc<SubscriptionRegistry>,
    scope: SubscriptionScope,
    channel_id: Uuid,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.scope, self.channel_id);
        info!(scope = %self.scope, channel = %self.channel_id, "Live listener disconnected");
    }
}

/// GET /api/tags/stream
pub async fn tag_stream(
    State(state): State<AppState>,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // An unparsable query (e.g. a repeated `token`) is a bad credential, not a bad request
    let Query(query) = query.map_err(|e| {
        warn!(reason = "malformed_token", error = %e, "Rejected live stream query");
        ApiError::Unauthorized(AuthError::Malformed(e.body_text()))
    })?;

    let claims = credential_from_query(query.token.as_deref())
        .and_then(|token| verify_token(token, &state.jwt_secret))
        .map_err(|e| {
            warn!(reason = e.code(), "Rejected live stream credential");
            ApiError::Unauthorized(e)
        })?;

    let scope = if query.wants_all() {
        SubscriptionScope::All
    } else {
        SubscriptionScope::User(claims.id)
    };

    let (channel, rx) = state.registry.open_channel();
    let guard = SubscriptionGuard {
        registry: state.registry.clone(),
        scope,
        channel_id: channel.id(),
    };
    state.registry.subscribe(scope, channel);

    info!(
        user_id = claims.id,
        scope = %scope,
        channel = %guard.channel_id,
        listeners = state.registry.listener_count(),
        "Live listener connected"
    );

    let stream = listener_stream(rx, guard, state.live.idle_timeout);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.live.keep_alive)
            .text("heartbeat"),
    ))
}

/// `connected` first, then every event routed to this channel
///
/// Ends when the registry drops the channel or the idle timeout elapses.
fn listener_stream(
    mut rx: mpsc::Receiver<TagEvent>,
    guard: SubscriptionGuard,
    idle_timeout: Option<Duration>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;

        let greeting = TagEvent::connected("Listening for new asset tags");
        if let Some(event) = to_sse_event(&greeting) {
            yield Ok(event);
        }

        loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        info!(idle_secs = limit.as_secs(), "Closing idle live stream");
                        break;
                    }
                },
                None => rx.recv().await,
            };

            let Some(event) = next else {
                debug!("Live channel closed by registry");
                break;
            };

            if let Some(event) = to_sse_event(&event) {
                yield Ok(event);
            }
        }
    }
}

/// Serialize as a bare `data:` frame; the JSON carries its own `type`
fn to_sse_event(event: &TagEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Build live stream routes
pub fn live_routes() -> Router<AppState> {
    Router::new().route("/api/tags/stream", get(tag_stream))
}
