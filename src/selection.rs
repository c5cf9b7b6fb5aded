use std::hash::Hasher;

use fnv::FnvHasher;
use itertools::Itertools;

use crate::experiments::ExperimentTable;
use crate::metrics::ExperimentRecorder;
use crate::types::OptimizationId;

/// How the caller describes which optimization passes to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionInput {
    /// Apply exactly this list, in this order.
    Explicit(Vec<OptimizationId>),
    /// Resolve the effective set from policy lists and experiment rollouts.
    Policy {
        enabled: Vec<OptimizationId>,
        disabled: Vec<OptimizationId>,
        default: Vec<OptimizationId>,
        /// Stable caller identity (job or run name) used for rollout
        /// bucketing. Empty opts out of bucketing entirely.
        context_key: String,
    },
}

/// Stable 64-bit hash used for rollout bucketing. FNV-1a does not depend on
/// per-process keys, so the same input buckets the same way on every run.
pub fn stable_hash(value: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(value.as_bytes());
    hasher.finish()
}

/// Resolves the effective ordered, de-duplicated set of optimization passes.
///
/// In policy mode the result is `enabled`, then `default` survivors, then
/// bucketed-in experiments in identifier order; anything in `disabled` is
/// excluded unconditionally. Every experiment that ends up selected is
/// reported to `recorder`.
pub fn select_optimizations(
    input: &SelectionInput,
    experiments: &ExperimentTable,
    recorder: &dyn ExperimentRecorder,
) -> Vec<OptimizationId> {
    select_optimizations_with_hash(input, experiments, recorder, &stable_hash)
}

/// Same as [`select_optimizations`], with an injectable hash function.
pub fn select_optimizations_with_hash(
    input: &SelectionInput,
    experiments: &ExperimentTable,
    recorder: &dyn ExperimentRecorder,
    hash: &dyn Fn(&str) -> u64,
) -> Vec<OptimizationId> {
    let (enabled, disabled, default, context_key) = match input {
        SelectionInput::Explicit(optimizations) => return optimizations.clone(),
        SelectionInput::Policy {
            enabled,
            disabled,
            default,
            context_key,
        } => (enabled, disabled, default, context_key.as_str()),
    };

    let mut bucketed: Vec<&str> = Vec::new();
    if !context_key.is_empty() {
        for (name, entry) in experiments.iter_sorted() {
            // Explicit user choice beats the rollout either way.
            if enabled.iter().any(|id| id == name) || disabled.iter().any(|id| id == name) {
                continue;
            }
            if bucketed_in(hash, context_key, name, entry.rollout_percent) {
                bucketed.push(name);
            }
        }
    }

    let resolved: Vec<OptimizationId> = enabled
        .iter()
        .map(String::as_str)
        .chain(default.iter().map(String::as_str))
        .chain(bucketed)
        .filter(|id| !disabled.iter().any(|disabled_id| disabled_id == id))
        .unique()
        .map(str::to_string)
        .collect();

    if !context_key.is_empty() && !experiments.is_empty() {
        log::debug!("The input pipeline is subject to experiment rollouts");
        for (name, _) in experiments.iter_sorted() {
            if resolved.iter().any(|id| id == name) {
                recorder.record_experiment(name);
            }
        }
    }

    resolved
}

/// Deterministically decides whether `context_key` falls into the rollout
/// bucket of the experiment `name`.
fn bucketed_in(
    hash: &dyn Fn(&str) -> u64,
    context_key: &str,
    name: &str,
    rollout_percent: u64,
) -> bool {
    hash(&format!("{context_key}{name}")) % 100 < rollout_percent
}
