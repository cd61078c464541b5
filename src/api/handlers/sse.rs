use crate::events::Event;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::warn;

fn to_sse(result: Result<Event, BroadcastStreamRecvError>) -> Option<Result<SseEvent, Infallible>> {
    match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).ok()?;
            Some(Ok(SseEvent::default().event(event.event_type()).data(json)))
        }
        Err(e) => {
            warn!("SSE subscriber dropped events: {}", e);
            None
        }
    }
}

pub(crate) async fn sse_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = BroadcastStream::new(state.event_hub.subscribe()).filter_map(to_sse);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
