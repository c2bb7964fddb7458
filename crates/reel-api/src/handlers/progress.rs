//! Server-sent progress stream for one run.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use reel_models::RunId;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Stream progress events for a run.
///
/// GET /api/progress/:run_id
///
/// The first frame replays the run's last-known event. The stream ends after
/// a terminal event. Opening a second stream for the same run detaches the
/// first one, which then ends without a terminal frame.
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let id = RunId::from_string(run_id);
    if state.registry.get(&id).await.is_none() {
        return Err(ApiError::not_found(format!("Run {id} not found")));
    }

    let registry = state.registry.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let Some(subscriber) = registry.channel().subscribe(&id, tx).await else {
        return Err(ApiError::not_found(format!("Run {id} not found")));
    };

    // The run may have expired between the lookup and the subscribe
    if registry.get(&id).await.is_none() {
        registry.channel().remove(&id).await;
        return Err(ApiError::not_found(format!("Run {id} not found")));
    }

    info!(run_id = %id, "Progress stream opened");
    metrics::record_sse_connected();

    // Dropped with the stream, whether or not it was ever polled
    let detach = scopeguard::guard(
        (registry, id.clone(), subscriber),
        |(registry, id, subscriber)| {
            metrics::record_sse_disconnected();
            debug!(run_id = %id, "Progress stream closed");
            tokio::spawn(async move {
                registry.channel().detach(&id, subscriber).await;
            });
        },
    );

    let stream = async_stream::stream! {
        let _detach = detach;

        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            match event.to_json() {
                Ok(json) => {
                    metrics::record_sse_event(event.stage.as_str());
                    yield Ok::<_, Infallible>(Event::default().data(json));
                }
                Err(e) => warn!(run_id = %id, error = %e, "Failed to serialize progress event"),
            }
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
