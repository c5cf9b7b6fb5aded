use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::pipeline::PipelineGraph;
use crate::rewrite::config::RewriteConfiguration;
use crate::types::{RewriteError, RewriteResult};

/// Default time budget for one rewrite attempt.
pub const DEFAULT_REWRITE_BUDGET: Duration = Duration::from_secs(60);

/// External rewrite engine seam.
///
/// The engine owns the pass implementations; this crate only submits work to
/// it. An engine may signal its own deadline handling through
/// [`RewriteError::DeadlineExceeded`], which the invoker treats the same as a
/// local budget elapse.
#[async_trait]
pub trait RewriteEngine: Send + Sync {
    async fn rewrite(
        &self,
        pipeline: Arc<PipelineGraph>,
        config: &RewriteConfiguration,
    ) -> RewriteResult<Arc<PipelineGraph>>;
}

/// Submits `pipeline` to the engine under a bounded time budget.
///
/// The rewrite is an optimization, not a correctness requirement. A rewrite
/// that ran out of time must not abort the caller's request: on deadline
/// exceeded the caller gets its own pipeline back, shared, never copied.
/// Every other engine failure propagates verbatim; the allow-list is exactly
/// one error kind wide.
pub async fn rewrite_pipeline(
    engine: &dyn RewriteEngine,
    pipeline: Arc<PipelineGraph>,
    config: &RewriteConfiguration,
    budget: Duration,
    record_fingerprint: bool,
) -> RewriteResult<Arc<PipelineGraph>> {
    if record_fingerprint {
        log::debug!(
            "Rewriting pipeline {:?} with fingerprint {:016x}",
            pipeline.name,
            pipeline.fingerprint(),
        );
    }

    let attempt = tokio::time::timeout(budget, engine.rewrite(Arc::clone(&pipeline), config)).await;
    let result = match attempt {
        Ok(result) => result,
        Err(_elapsed) => Err(RewriteError::deadline_exceeded(format!(
            "pipeline {:?} rewrite did not finish within {budget:?}",
            pipeline.name,
        ))),
    };

    match result {
        Ok(rewritten) => Ok(rewritten),
        Err(err) if err.is_deadline_exceeded() => {
            log::warn!("{err}");
            Ok(pipeline)
        }
        Err(err) => Err(err),
    }
}
