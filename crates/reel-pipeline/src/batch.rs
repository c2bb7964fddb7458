//! Concurrency-capped batch execution.
//!
//! At most `limit` tasks are in flight at once. The first failure ends the
//! batch: tasks not yet dispatched never start, and in-flight futures are
//! dropped (FFmpeg children are spawned with `kill_on_drop`).

use std::future::Future;

use futures_util::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;

/// First failure of a batch, tagged with the task's position.
#[derive(Debug, Error)]
#[error("task {index} failed: {error}")]
pub struct BatchError<E> {
    pub index: usize,
    pub error: E,
}

/// Run `op` over `tasks` with at most `limit` in flight.
///
/// `on_dispatch(index, total)` runs right before a task starts; dispatches
/// happen in index order, so a progress value derived from `index` never
/// goes backwards. A failing hook aborts the batch like a failing task.
///
/// Results come back in input order regardless of completion order.
/// A `limit` of zero is treated as one.
pub async fn run_bounded<T, R, E, F, Fut, D, DFut>(
    tasks: Vec<T>,
    limit: usize,
    mut on_dispatch: D,
    mut op: F,
) -> Result<Vec<R>, BatchError<E>>
where
    F: FnMut(usize, T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    D: FnMut(usize, usize) -> DFut,
    DFut: Future<Output = Result<(), E>>,
{
    let total = tasks.len();
    let limit = limit.max(1);
    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

    let mut pending = tasks.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();

    loop {
        while in_flight.len() < limit {
            let Some((index, task)) = pending.next() else {
                break;
            };
            on_dispatch(index, total)
                .await
                .map_err(|error| BatchError { index, error })?;

            let fut = op(index, task);
            in_flight.push(async move { (index, fut.await) });
        }

        match in_flight.next().await {
            Some((index, Ok(value))) => results[index] = Some(value),
            Some((index, Err(error))) => return Err(BatchError { index, error }),
            None => break,
        }
    }

    Ok(results.into_iter().flatten().collect())
}

/// Progress percent for dispatching task `index` of `total` inside a stage
/// that spans `span` points starting at `base`.
pub fn dispatch_percent(base: u8, span: u8, index: usize, total: usize) -> u8 {
    if total == 0 {
        return base;
    }
    let offset = (index.min(total) * span as usize) / total;
    (base as usize + offset).min(100) as u8
}
