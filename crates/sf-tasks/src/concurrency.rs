//! Concurrency-capped execution of a batch of async tasks.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::future::try_join_all;

use crate::error::RunError;

/// Run `tasks` with at most `limit` in flight, returning their results in
/// input order.
///
/// `min(limit, tasks.len())` workers each claim the next unstarted task and
/// await it before claiming another. Everything runs on the calling task, so
/// the futures need not be `Send`.
///
/// The first failure ends the run: unfinished tasks are dropped and nothing
/// further is started. Effects of tasks that already completed remain.
///
/// # Errors
///
/// - [`RunError::InvalidConcurrency`] if `limit` is zero (no task runs).
/// - [`RunError::Task`] with the index and error of the first failing task.
pub async fn run_bounded<T, E, F, Fut>(tasks: Vec<F>, limit: usize) -> Result<Vec<T>, RunError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if limit == 0 {
        return Err(RunError::InvalidConcurrency);
    }

    let len = tasks.len();
    let queue = Mutex::new(tasks.into_iter().enumerate());
    let queue = &queue;

    let workers = (0..limit.min(len)).map(move |_| async move {
        let mut finished = Vec::new();
        loop {
            let claimed = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
            let Some((index, task)) = claimed else {
                break;
            };
            let value = task()
                .await
                .map_err(|source| RunError::Task { index, source })?;
            finished.push((index, value));
        }
        Ok::<_, RunError<E>>(finished)
    });

    let batches = try_join_all(workers).await?;

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
    for (index, value) in batches.into_iter().flatten() {
        slots[index] = Some(value);
    }
    Ok(slots.into_iter().flatten().collect())
}
