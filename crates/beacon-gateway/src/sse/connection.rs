use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures_util::Stream;
use tracing::debug;

use crate::app::AppState;
use crate::sse::registry::Subscription;

/// Axum handler for GET /events: one subscriber per open connection.
///
/// The subscriber is registered before the response is returned, so any
/// event recorded after this handler completes reaches the client.
pub async fn events_handler(State(state): State<Arc<AppState>>) -> Response {
    let subscription = state.registry.register();

    let sse = Sse::new(relay(subscription));
    let body = match state.keep_alive {
        Some(interval) => sse
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response(),
        None => sse.into_response(),
    };

    // axum's Sse already sets `text/event-stream` and `no-cache`.
    ([(header::CONNECTION, "keep-alive")], body).into_response()
}

/// Relay loop: forward queued payloads as `data: <payload>\n\n` frames.
///
/// The stream ends when the registry closes the queue. When hyper fails to
/// write a frame, or the client goes away, it drops the stream instead;
/// either way the owned [`Subscription`] is dropped and unregisters itself.
pub fn relay(mut subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(payload) = subscription.recv().await {
            yield Ok(Event::default().data(payload));
        }
        debug!(subscriber = %subscription.id(), "queue closed, ending stream");
    }
}
