use std::hash::Hasher;

use fnv::FnvHasher;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One node of a pipeline description: a named application of an operation
/// to the outputs of earlier nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct PipelineNode {
    pub name: String,
    pub op: String,
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// Pipeline description submitted to the rewrite engine.
///
/// This crate never interprets the graph beyond fingerprinting it; applying
/// passes to it is entirely the engine's business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct PipelineGraph {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<PipelineNode>,
}

impl PipelineGraph {
    pub fn new(name: impl Into<String>, nodes: Vec<PipelineNode>) -> PipelineGraph {
        PipelineGraph {
            name: name.into(),
            nodes,
        }
    }

    /// Stable 64-bit structural fingerprint: same graph, same value, across
    /// processes and runs.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write(self.name.as_bytes());
        for node in &self.nodes {
            hasher.write(node.name.as_bytes());
            hasher.write(&[0]);
            hasher.write(node.op.as_bytes());
            hasher.write(&[0]);
            for input in &node.inputs {
                hasher.write(input.as_bytes());
                hasher.write(&[0]);
            }
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_pipeline() -> PipelineGraph {
        PipelineGraph::new(
            "ingest",
            vec![
                PipelineNode {
                    name: "source".to_string(),
                    op: "range".to_string(),
                    inputs: vec![],
                },
                PipelineNode {
                    name: "mapped".to_string(),
                    op: "map".to_string(),
                    inputs: vec!["source".to_string()],
                },
            ],
        )
    }

    #[test]
    fn fingerprint_is_stable_for_equal_graphs() {
        assert_eq!(
            range_pipeline().fingerprint(),
            range_pipeline().fingerprint(),
        );
    }

    #[test]
    fn fingerprint_changes_with_structure() {
        let base = range_pipeline();
        let mut renamed = base.clone();
        renamed.nodes[1].op = "filter".to_string();
        assert_ne!(base.fingerprint(), renamed.fingerprint());
    }
}
