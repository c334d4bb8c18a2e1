use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use duel::{DuelError, DuelId, DuelStatus, Notification, Topic};

use crate::routes::{ApiError, Caller};
use crate::state::AppState;

/// Per-user topic: challenge notifications for the caller.
pub async fn user_events(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.service.hub().subscribe(Topic::User(user));
    event_stream(rx)
}

/// Per-duel topic: round and completion events, participants only, while the
/// duel is in progress. A terminal duel has no further events; clients read
/// its final state with a plain GET.
pub async fn duel_events(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<DuelId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (duel, _) = state.service.get(id, user)?;
    if duel.status != DuelStatus::InProgress {
        return Err(ApiError::Duel(DuelError::InvalidState {
            expected: DuelStatus::InProgress,
            actual: duel.status,
        }));
    }
    let rx = state.service.hub().subscribe(Topic::Duel(id));
    Ok(event_stream(rx))
}

fn event_stream(
    rx: broadcast::Receiver<Notification>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(note) => match Event::default().json_data(&note) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                log::debug!("failed to encode notification: {}", err);
                None
            }
        },
        // Lagged subscriber: events were dropped. At-most-once delivery is
        // the contract; the client re-fetches the duel to catch up.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
