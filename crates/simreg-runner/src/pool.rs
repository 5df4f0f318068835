use crate::error::{RegressionError, RegressionResult};
use rayon::ThreadPool;

/// Worker-count resolution and the fixed-size case pool
///
/// The worker count is computed once, before anything is dispatched:
/// - `-1` (or `0`): one less than the available cores, at least 1
/// - `> 0`: the request, capped at the available cores
/// - `< -1`: configuration error
///
/// The result is further capped at the number of cases.
pub fn resolve_jobs(requested: i64, available: usize, cases: usize) -> RegressionResult<usize> {
    if requested < -1 {
        return Err(RegressionError::config(format!(
            "invalid value given for 'jobs': {requested} (expected -1 or a positive count)"
        )));
    }
    let available = available.max(1);
    let requested = if requested == 0 { -1 } else { requested };

    let jobs = if requested == -1 {
        available.saturating_sub(1).max(1)
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX).min(available)
    };

    Ok(jobs.min(cases).max(1))
}

/// Cores usable by this process
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Build a pool with exactly `workers` named threads
pub fn build_pool(workers: usize) -> RegressionResult<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("simreg-worker-{index}"))
        .panic_handler(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%message, "case worker panicked");
        })
        .build()
        .map_err(|e| RegressionError::pool(format!("failed to build worker pool: {e}")))
}
