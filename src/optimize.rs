use std::env;
use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::experiments::live_experiments;
use crate::metrics::ExperimentRecorder;
use crate::pipeline::PipelineGraph;
use crate::rewrite::config::RewriteConfiguration;
use crate::rewrite::invoker::{DEFAULT_REWRITE_BUDGET, RewriteEngine, rewrite_pipeline};
use crate::selection::{SelectionInput, select_optimizations};
use crate::types::{OptimizationConfig, OptimizationId, RewriteError, RewriteResult};

/// Environment variable holding the job name used as the bucketing context.
pub const JOB_NAME_ENV: &str = "FLOWOPT_JOB_NAME";

/// The two wire shapes of the optimization arguments, one per operator
/// version at the pipeline-construction boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationArgs {
    /// Version 1: a verbatim list of passes.
    Explicit { optimizations: Vec<OptimizationId> },
    /// Version 2: policy lists resolved against live experiment rollouts.
    Policy {
        optimizations_enabled: Vec<OptimizationId>,
        optimizations_disabled: Vec<OptimizationId>,
        optimizations_default: Vec<OptimizationId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct OptimizeOptions {
    pub args: OptimizationArgs,
    /// Free-form `key=value` strings, positionally aligned with the resolved
    /// selection.
    #[serde(default)]
    #[validate(custom = "validate_optimization_configs")]
    pub optimization_configs: Vec<OptimizationConfig>,
    /// Upper bound on one rewrite attempt.
    #[serde(default = "default_rewrite_budget")]
    pub rewrite_budget: Duration,
}

impl OptimizeOptions {
    pub fn new(args: OptimizationArgs) -> OptimizeOptions {
        OptimizeOptions {
            args,
            optimization_configs: Vec::new(),
            rewrite_budget: DEFAULT_REWRITE_BUDGET,
        }
    }

    pub fn with_configs(mut self, configs: Vec<OptimizationConfig>) -> OptimizeOptions {
        self.optimization_configs = configs;
        self
    }
}

fn default_rewrite_budget() -> Duration {
    DEFAULT_REWRITE_BUDGET
}

fn validate_optimization_configs(configs: &[OptimizationConfig]) -> Result<(), ValidationError> {
    for config in configs {
        // The engine splits on the first '='; anything else is unusable.
        if !config.contains('=') {
            return Err(ValidationError::new(
                "optimization config must be of the form key=value",
            ));
        }
    }
    Ok(())
}

/// Job or run name of the current process, used as the bucketing context.
/// Unset or empty means reproducible identity is unavailable and bucketing
/// is skipped.
pub fn job_context_key() -> String {
    env::var(JOB_NAME_ENV).unwrap_or_default()
}

/// End-to-end entry point for the pipeline-construction boundary:
/// validate the arguments, resolve the selection, build the rewrite
/// configuration and submit it with the fail-open contract of
/// [`rewrite_pipeline`].
pub async fn optimize(
    engine: &dyn RewriteEngine,
    pipeline: Arc<PipelineGraph>,
    options: &OptimizeOptions,
    recorder: &dyn ExperimentRecorder,
) -> RewriteResult<Arc<PipelineGraph>> {
    options
        .validate()
        .map_err(|err| RewriteError::bad_input(format!("invalid optimize options: {err}")))?;

    let input = match &options.args {
        OptimizationArgs::Explicit { optimizations } => {
            SelectionInput::Explicit(optimizations.clone())
        }
        OptimizationArgs::Policy {
            optimizations_enabled,
            optimizations_disabled,
            optimizations_default,
        } => SelectionInput::Policy {
            enabled: optimizations_enabled.clone(),
            disabled: optimizations_disabled.clone(),
            default: optimizations_default.clone(),
            context_key: job_context_key(),
        },
    };

    let selection = select_optimizations(&input, &live_experiments(), recorder);
    let config =
        RewriteConfiguration::for_selection(selection, options.optimization_configs.clone());
    rewrite_pipeline(
        engine,
        pipeline,
        &config,
        options.rewrite_budget,
        /* record_fingerprint */ true,
    )
    .await
}
