use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{OptimizationConfig, OptimizationId};

/// Name of the meta-pass the engine runs; all selected passes execute from
/// inside it.
pub const META_OPTIMIZER_NAME: &str = "flowopt_meta_optimizer";
/// Parameter key holding the resolved pass list.
pub const PARAM_OPTIMIZERS: &str = "optimizers";
/// Parameter key holding the positional per-pass configuration strings.
pub const PARAM_OPTIMIZER_CONFIGS: &str = "optimizer_configs";

/// How many times the engine iterates the meta-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetaPassIterations {
    One,
}

/// One custom pass entry: a pass name plus free-form list parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CustomPass {
    pub name: String,
    pub parameters: BTreeMap<String, Vec<String>>,
}

/// Configuration submitted to the rewrite engine: a single meta-pass wrapping
/// the resolved optimization list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct RewriteConfiguration {
    pub passes: Vec<String>,
    pub meta_pass_iterations: MetaPassIterations,
    /// Engine-side pass failures abort the rewrite. Which failure kinds get
    /// softened is decided at the invoker boundary, never here.
    pub fail_on_pass_errors: bool,
    pub custom_passes: Vec<CustomPass>,
}

impl RewriteConfiguration {
    /// Builds the configuration for one resolved selection.
    ///
    /// `configs` is positional; its alignment with `selection` is the engine's
    /// contract and is deliberately not validated here.
    pub fn for_selection(
        selection: Vec<OptimizationId>,
        configs: Vec<OptimizationConfig>,
    ) -> RewriteConfiguration {
        let mut parameters = BTreeMap::new();
        parameters.insert(PARAM_OPTIMIZERS.to_string(), selection);
        parameters.insert(PARAM_OPTIMIZER_CONFIGS.to_string(), configs);
        RewriteConfiguration {
            passes: vec![META_OPTIMIZER_NAME.to_string()],
            meta_pass_iterations: MetaPassIterations::One,
            fail_on_pass_errors: true,
            custom_passes: vec![CustomPass {
                name: META_OPTIMIZER_NAME.to_string(),
                parameters,
            }],
        }
    }

    /// The embedded meta-pass. There is exactly one per configuration.
    pub fn meta_pass(&self) -> Option<&CustomPass> {
        self.custom_passes.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_exactly_one_meta_pass() {
        let config = RewriteConfiguration::for_selection(
            vec!["map_fusion".to_string()],
            vec!["map_fusion:parallelism=4".to_string()],
        );

        assert_eq!(config.passes, vec![META_OPTIMIZER_NAME.to_string()]);
        assert_eq!(config.custom_passes.len(), 1);
        assert_eq!(config.meta_pass_iterations, MetaPassIterations::One);
        assert!(config.fail_on_pass_errors);

        let meta_pass = config.meta_pass().unwrap();
        assert_eq!(meta_pass.name, META_OPTIMIZER_NAME);
        assert_eq!(
            meta_pass.parameters[PARAM_OPTIMIZERS],
            vec!["map_fusion".to_string()],
        );
        assert_eq!(
            meta_pass.parameters[PARAM_OPTIMIZER_CONFIGS],
            vec!["map_fusion:parallelism=4".to_string()],
        );
    }

    #[test]
    fn accepts_mismatched_parallel_list_lengths() {
        let config = RewriteConfiguration::for_selection(
            vec!["noop_elimination".to_string(), "map_fusion".to_string()],
            vec![],
        );

        let meta_pass = config.meta_pass().unwrap();
        assert_eq!(meta_pass.parameters[PARAM_OPTIMIZERS].len(), 2);
        assert!(meta_pass.parameters[PARAM_OPTIMIZER_CONFIGS].is_empty());
    }
}
