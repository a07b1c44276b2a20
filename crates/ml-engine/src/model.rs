//! GBDT model artifact
//!
//! The artifact is a JSON forest: per tree an ordered node array, each
//! node carrying its split (absent for leaves) and the expected margin
//! value at that node. Expected values make decision-path attribution
//! exact without revisiting training data.

use linkguard_features::{FEATURE_COUNT, SCHEMA};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::ModelError;

#[derive(Debug, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub num_features: usize,
    pub base_score: f64,
    pub feature_names: Vec<String>,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<NodeArtifact>,
}

#[derive(Debug, Deserialize)]
pub struct NodeArtifact {
    pub feature: Option<usize>,
    pub threshold: Option<f64>,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub value: f64,
}

/// One decision node after validation
#[derive(Debug, Clone, Copy)]
pub(crate) enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        value: f64,
    },
    Leaf {
        value: f64,
    },
}

impl Node {
    pub(crate) fn value(&self) -> f64 {
        match self {
            Node::Split { value, .. } => *value,
            Node::Leaf { value } => *value,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Tree {
    pub(crate) nodes: Vec<Node>,
}

impl Tree {
    /// Index path from root to the leaf this instance lands in
    pub(crate) fn decision_path(&self, x: &[f64]) -> Vec<usize> {
        let mut path = vec![0];
        let mut current = 0;
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = self.nodes[current]
        {
            current = if x[feature] < threshold { left } else { right };
            path.push(current);
        }
        path
    }

    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut current = 0;
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = self.nodes[current]
        {
            current = if x[feature] < threshold { left } else { right };
        }
        self.nodes[current].value()
    }
}

/// Immutable, thread-safe gradient-boosted forest.
#[derive(Debug)]
pub struct GbdtModel {
    pub(crate) trees: Vec<Tree>,
    base_score: f64,
    expected_value: f64,
    version: String,
}

impl GbdtModel {
    /// Load and validate an artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))?;
        let artifact: ModelArtifact =
            serde_json::from_str(&content).map_err(|e| ModelError::Load(e.to_string()))?;
        let model = Self::from_artifact(artifact)?;
        info!(path = %path.display(), trees = model.trees.len(), version = %model.version, "model loaded");
        Ok(model)
    }

    /// Model compiled into the binary, used when no path is configured.
    pub fn builtin() -> Result<Self, ModelError> {
        let artifact: ModelArtifact =
            serde_json::from_str(include_str!("../data/default_model.json"))
                .map_err(|e| ModelError::Load(e.to_string()))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.num_features != FEATURE_COUNT || artifact.feature_names.len() != FEATURE_COUNT {
            return Err(ModelError::SchemaMismatch {
                expected: FEATURE_COUNT,
                found: artifact.num_features,
            });
        }
        for (i, (artifact_name, spec)) in
            artifact.feature_names.iter().zip(SCHEMA.iter()).enumerate()
        {
            if artifact_name != spec.name {
                return Err(ModelError::Malformed(format!(
                    "feature {} is '{}' in the artifact but '{}' in the schema",
                    i, artifact_name, spec.name
                )));
            }
        }

        let mut trees = Vec::with_capacity(artifact.trees.len());
        for (tree_idx, tree) in artifact.trees.iter().enumerate() {
            let node_count = tree.nodes.len();
            let mut nodes = Vec::with_capacity(node_count);
            for (node_idx, node) in tree.nodes.iter().enumerate() {
                let parsed = match (node.feature, node.threshold, node.left, node.right) {
                    (Some(feature), Some(threshold), Some(left), Some(right)) => {
                        if feature >= FEATURE_COUNT || left >= node_count || right >= node_count {
                            return Err(ModelError::Malformed(format!(
                                "tree {} node {} references out-of-range indices",
                                tree_idx, node_idx
                            )));
                        }
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                            value: node.value,
                        }
                    }
                    (None, None, None, None) => Node::Leaf { value: node.value },
                    _ => {
                        return Err(ModelError::Malformed(format!(
                            "tree {} node {} is neither a full split nor a leaf",
                            tree_idx, node_idx
                        )));
                    }
                };
                nodes.push(parsed);
            }
            if nodes.is_empty() {
                return Err(ModelError::Malformed(format!("tree {} is empty", tree_idx)));
            }
            trees.push(Tree { nodes });
        }

        // SHAP-style base value: each tree contributes its root
        // expectation before any split is taken.
        let expected_value = artifact.base_score
            + trees.iter().map(|t| t.nodes[0].value()).sum::<f64>();

        Ok(Self {
            trees,
            base_score: artifact.base_score,
            expected_value,
            version: artifact.version,
        })
    }

    /// Raw additive margin (log-odds space)
    pub fn predict_margin(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.leaf_value(x)).sum::<f64>()
    }

    /// Probability in [0, 1]
    #[inline]
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.predict_margin(x))
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Expected margin before any feature is observed: the base score
    /// plus every tree's root expectation. Per-feature attributions sum
    /// with this to the predicted margin.
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

#[inline]
pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_model_loads() {
        let model = GbdtModel::builtin().unwrap();
        assert!(model.num_trees() > 0);
        assert_eq!(model.version(), "1.0.0");
    }

    #[test]
    fn test_probability_bounds() {
        let model = GbdtModel::builtin().unwrap();
        let zeros = vec![0.0; FEATURE_COUNT];
        let ones = vec![1.0; FEATURE_COUNT];
        for x in [&zeros, &ones] {
            let p = model.predict_proba(x);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let artifact = ModelArtifact {
            version: "x".to_string(),
            num_features: 3,
            base_score: 0.0,
            feature_names: vec!["a".to_string(); 3],
            trees: vec![],
        };
        assert!(matches!(
            GbdtModel::from_artifact(artifact),
            Err(ModelError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_renamed_feature_rejected() {
        let mut names: Vec<String> = SCHEMA.iter().map(|s| s.name.to_string()).collect();
        names[0] = "not_a_feature".to_string();
        let artifact = ModelArtifact {
            version: "x".to_string(),
            num_features: FEATURE_COUNT,
            base_score: 0.0,
            feature_names: names,
            trees: vec![],
        };
        assert!(matches!(
            GbdtModel::from_artifact(artifact),
            Err(ModelError::Malformed(_))
        ));
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }
}
