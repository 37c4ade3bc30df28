//! Server-Sent Events (SSE) stream of background job updates.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::SharedState;

/// SSE endpoint. Each event is one `JobUpdate` as JSON, named by job kind.
pub async fn sse_handler(State(state): State<SharedState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    // lagged receivers skip the missed updates; clients re-poll job status
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let update = result.ok()?;
        let data = serde_json::to_string(&update).ok()?;
        let name = match update.kind {
            euclid_tutor::JobKind::Diagram => "diagram",
            euclid_tutor::JobKind::Animation => "animation",
        };
        Some(Ok(Event::default().event(name).data(data)))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}
