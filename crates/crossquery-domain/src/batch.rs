//! Batch partitioning and bounded-concurrency execution.
//!
//! The runner uses a fixed worker pool over a shared work queue: `limit`
//! workers each claim the next unclaimed item until the queue is empty, so
//! peak concurrency is exactly `min(limit, items)` rather than a throughput cap.

use std::future::Future;

use futures::future::try_join_all;
use tokio::sync::Mutex;
use tracing::trace;

/// Splits `ids` into consecutive batches of at most `max_batch_size` items.
///
/// Order is preserved within and across batches. Empty input yields no batches.
pub fn partition<T: Clone>(ids: &[T], max_batch_size: usize) -> Vec<Vec<T>> {
    ids.chunks(max_batch_size.max(1))
        .map(<[T]>::to_vec)
        .collect()
}

/// Runs `work` once per item with at most `limit` invocations in flight.
///
/// The first error is returned to the caller and the remaining workers are
/// dropped. Results come back in completion order, not input order.
pub async fn run_bounded<T, R, E, F, Fut>(items: Vec<T>, limit: usize, work: F) -> Result<Vec<R>, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let workers = limit.max(1).min(items.len());
    let queue = Mutex::new(items.into_iter());
    let queue = &queue;
    let work = &work;

    let pool = (0..workers).map(|worker| async move {
        let mut produced = Vec::new();
        loop {
            let next = queue.lock().await.next();
            let Some(item) = next else {
                break;
            };
            produced.push(work(item).await?);
        }
        trace!(worker, completed = produced.len(), "worker drained queue");
        Ok::<_, E>(produced)
    });

    let per_worker = try_join_all(pool).await?;
    Ok(per_worker.into_iter().flatten().collect())
}
