//! Bounded fan-out for embarrassingly parallel batches (matching, backtesting).

use std::num::NonZeroUsize;
use std::thread;

/// Batches smaller than this run on the calling thread.
const MIN_ITEMS_PER_WORKER: usize = 8;

pub fn worker_count() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// Applies `f` to every item on at most `worker_count()` scoped threads.
///
/// Output order matches input order; workers share nothing but the read-only inputs.
pub fn map_bounded<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = worker_count().min(items.len() / MIN_ITEMS_PER_WORKER).max(1);
    if workers == 1 {
        return items.iter().map(&f).collect();
    }

    let chunk_size = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(f).collect::<Vec<R>>()))
            .collect();

        let mut results = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => results.extend(chunk),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        results
    })
}
