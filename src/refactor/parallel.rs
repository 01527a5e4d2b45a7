//! Bounded per-environment execution on a Rayon pool.
use std::sync::Arc;

use crate::logging::{BufferedLog, Log, Logger};

/// Run `work` once per item on a pool of at most `concurrency` threads.
///
/// Each invocation logs through its own [`BufferedLog`], flushed as soon as
/// that item finishes, so output from different environments never
/// interleaves. Results come back in input order.
///
/// A pool size of one (or a single item) runs inline on the calling thread.
/// If the pool cannot be built the items are processed sequentially.
pub(super) fn run_bounded<T, R>(
    concurrency: usize,
    logger: &Arc<Logger>,
    items: &[T],
    work: impl Fn(&T, &dyn Log) -> R + Sync + Send,
) -> Vec<R>
where
    T: Sync,
    R: Send,
{
    use rayon::prelude::*;

    let run_one = |item: &T| {
        let buf = BufferedLog::new(Arc::clone(logger));
        let result = work(item, &buf);
        buf.flush();
        result
    };

    if concurrency <= 1 || items.len() <= 1 {
        return items.iter().map(run_one).collect();
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .build()
    {
        Ok(pool) => pool.install(|| items.par_iter().map(run_one).collect()),
        Err(e) => {
            logger.warn(&format!(
                "could not start {concurrency} workers ({e}); running sequentially"
            ));
            items.iter().map(run_one).collect()
        }
    }
}
