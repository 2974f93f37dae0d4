use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
    store::{ChangeEvent, SessionStore, fold_code, models::SessionSnapshot},
};

/// Open the event stream for one session: a `snapshot` event first, then
/// every change notification in write order, until the client disconnects.
pub async fn session_stream(
    state: &SharedState,
    code: &str,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let store = state.store();
    let (snapshot, receiver) = store.resume(code).await?;
    info!(code = %fold_code(code), "new session SSE connection");
    Ok(to_sse_stream(store, fold_code(code), snapshot, receiver))
}

/// Convert a resumed subscription into an SSE response, forwarding events
/// and cleaning up once the client disconnects.
fn to_sse_stream(
    store: Arc<dyn SessionStore>,
    code: String,
    snapshot: SessionSnapshot,
    mut receiver: broadcast::Receiver<ChangeEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: catch-up snapshot first, then the live feed
    tokio::spawn(async move {
        if let Some(payload) = sse_events::snapshot_event(&snapshot) {
            if tx.send(Ok(to_axum_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(change) => {
                            let Some(payload) = sse_events::change_event(&change) else {
                                continue;
                            };
                            if tx.send(Ok(to_axum_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(missed)) => {
                            // Dropped notifications are never replayed, so the
                            // only safe recovery is a fresh catch-up snapshot.
                            warn!(%code, missed, "SSE subscriber lagged; resending snapshot");
                            match store.resume(&code).await {
                                Ok((snapshot, fresh)) => {
                                    receiver = fresh;
                                    if let Some(payload) = sse_events::snapshot_event(&snapshot) {
                                        if tx.send(Ok(to_axum_event(payload))).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                                Err(err) => {
                                    warn!(%code, error = %err, "catch-up after lag failed");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }

        info!(%code, "session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_axum_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
