//! Gradient-boosted tree ensemble read from a JSON artifact.
//!
//! Artifact layout:
//!
//! ```json
//! {
//!   "feature_names": ["age", "hypertension", ...],
//!   "base_margin": -2.0,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 0, "threshold": 65.0, "left": 1, "right": 2, "cover": 100.0 },
//!         { "leaf": -0.4, "cover": 80.0 },
//!         { "leaf": 0.8, "cover": 20.0 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! A split sends a row left when `x[feature] < threshold`. Children always
//! sit after their parent, so node 0 is the root.
//!
//! Attributions follow the decision path (Saabas), so the factor ranking can
//! differ from TreeSHAP values for the same trees.

use std::path::Path;

use log::{debug, info};
use serde::Deserialize;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::classifier::{check_width, rows, RiskClassifier};
use crate::error::{ExplanationUnavailable, ModelError, ScoringError};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        leaf: f64,
        cover: f64,
    },
}

impl Node {
    fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeArtifact {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    feature_names: Vec<String>,
    #[serde(default)]
    base_margin: f64,
    trees: Vec<TreeArtifact>,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
    // cover-weighted mean leaf value under each node
    expected: Vec<f64>,
}

impl Tree {
    fn compile(index: usize, nodes: Vec<Node>) -> Result<Tree, ModelError> {
        let malformed = |node: usize, message: String| ModelError::MalformedTree {
            tree: index,
            node,
            message,
        };
        if nodes.is_empty() {
            return Err(malformed(0, "tree has no nodes".to_string()));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.cover() < 0.0 {
                return Err(malformed(i, format!("negative cover {}", node.cover())));
            }
            if let Node::Split {
                feature, left, right, ..
            } = *node
            {
                if feature >= FEATURE_COUNT {
                    return Err(malformed(i, format!("feature index {} out of range", feature)));
                }
                for child in [left, right] {
                    if child <= i || child >= nodes.len() {
                        return Err(malformed(i, format!("child index {} out of order", child)));
                    }
                }
            }
        }

        let mut expected = vec![0.0; nodes.len()];
        for i in (0..nodes.len()).rev() {
            expected[i] = match nodes[i] {
                Node::Leaf { leaf, .. } => leaf,
                Node::Split { left, right, .. } => {
                    let (cl, cr) = (nodes[left].cover(), nodes[right].cover());
                    if cl + cr > 0.0 {
                        (cl * expected[left] + cr * expected[right]) / (cl + cr)
                    } else {
                        (expected[left] + expected[right]) / 2.0
                    }
                }
            };
        }
        Ok(Tree { nodes, expected })
    }

    fn leaf_value(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match self.nodes[node] {
                Node::Leaf { leaf, .. } => return leaf,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => node = if row[feature] < threshold { left } else { right },
            }
        }
    }

    /// Credits each split on the decision path with the change in expected
    /// value it causes.
    fn contribute(&self, row: &[f64], contributions: &mut [f64]) {
        let mut node = 0;
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = self.nodes[node]
        {
            let child = if row[feature] < threshold { left } else { right };
            contributions[feature] += self.expected[child] - self.expected[node];
            node = child;
        }
    }
}

/// Binary tree ensemble with a logistic link.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    base_margin: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Parses an artifact and checks its feature schema against the encoder's.
    pub fn from_json(json: &str) -> Result<TreeEnsemble, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;

        if artifact.feature_names.len() != FEATURE_COUNT {
            return Err(ModelError::FeatureCount {
                expected: FEATURE_COUNT,
                found: artifact.feature_names.len(),
            });
        }
        for (index, (found, expected)) in artifact
            .feature_names
            .iter()
            .zip(FEATURE_NAMES.iter())
            .enumerate()
        {
            if found != expected {
                return Err(ModelError::SchemaMismatch {
                    index,
                    expected: *expected,
                    found: found.clone(),
                });
            }
        }

        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::compile(i, t.nodes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TreeEnsemble {
            base_margin: artifact.base_margin,
            trees,
        })
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<TreeEnsemble, ModelError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ModelError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let model = TreeEnsemble::from_json(&json)?;
        info!(
            "loaded tree ensemble from {} ({} trees)",
            path.display(),
            model.n_trees()
        );
        Ok(model)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw log-odds for one row.
    pub fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.leaf_value(row)).sum::<f64>()
    }

    /// Margin of an average row: what the attributions are measured against.
    pub fn expected_margin(&self) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.expected[0]).sum::<f64>()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RiskClassifier for TreeEnsemble {
    fn predict_proba(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ScoringError> {
        check_width(features, FEATURE_COUNT)?;
        Ok(rows(features)
            .iter()
            .map(|row| {
                let margin = self.margin(row);
                let p = sigmoid(margin);
                debug!("margin {:.4} -> p {:.4}", margin, p);
                vec![1.0 - p, p]
            })
            .collect())
    }

    fn attribute(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ExplanationUnavailable> {
        check_width(features, FEATURE_COUNT).map_err(|e| ExplanationUnavailable::new(e.to_string()))?;
        Ok(rows(features)
            .iter()
            .map(|row| {
                let mut contributions = vec![0.0; FEATURE_COUNT];
                for tree in &self.trees {
                    tree.contribute(row, &mut contributions);
                }
                contributions
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FeatureVector};

    fn artifact(trees: &str) -> String {
        let names: Vec<String> = FEATURE_NAMES.iter().map(|n| format!("\"{}\"", n)).collect();
        format!(
            "{{\"feature_names\": [{}], \"base_margin\": -1.0, \"trees\": {}}}",
            names.join(","),
            trees
        )
    }

    const AGE_STUMP: &str = r#"[{"nodes": [
        {"feature": 0, "threshold": 65.0, "left": 1, "right": 2, "cover": 100.0},
        {"leaf": -0.4, "cover": 80.0},
        {"leaf": 0.8, "cover": 20.0}
    ]}]"#;

    fn row_with_age(age: f64) -> DenseMatrix<f64> {
        let mut v = [0.0; FEATURE_COUNT];
        v[Feature::Age.index()] = age;
        FeatureVector::from_array(v).to_matrix()
    }

    #[test]
    fn stump_predicts_through_logistic_link() {
        let model = TreeEnsemble::from_json(&artifact(AGE_STUMP)).unwrap();
        let proba = model.predict_proba(&row_with_age(70.0)).unwrap();
        assert!((proba[0][1] - sigmoid(-0.2)).abs() < 1e-12);
        assert!((proba[0][0] + proba[0][1] - 1.0).abs() < 1e-12);

        let young = model.predict_proba(&row_with_age(30.0)).unwrap();
        assert!((young[0][1] - sigmoid(-1.4)).abs() < 1e-12);
    }

    #[test]
    fn attributions_sum_to_margin() {
        let model = TreeEnsemble::from_json(&artifact(AGE_STUMP)).unwrap();
        let x = row_with_age(70.0);
        let attributions = model.attribute(&x).unwrap();
        let contributions = &attributions[0];

        // expected root value is (80 * -0.4 + 20 * 0.8) / 100 = -0.16
        assert!((contributions[Feature::Age.index()] - 0.96).abs() < 1e-12);
        let total: f64 = contributions.iter().sum::<f64>() + model.expected_margin();
        assert!((total - model.margin(&rows(&x)[0])).abs() < 1e-12);
    }

    #[test]
    fn wrong_width_is_a_scoring_error() {
        let model = TreeEnsemble::from_json(&artifact(AGE_STUMP)).unwrap();
        let narrow = DenseMatrix::new(1, 3, vec![70.0, 1.0, 0.0], false);
        assert_eq!(
            model.predict_proba(&narrow).unwrap_err(),
            ScoringError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: 3
            }
        );
        assert!(model.attribute(&narrow).is_err());
    }

    #[test]
    fn renamed_feature_is_rejected() {
        let json = artifact(AGE_STUMP).replace("\"smoking_status_smokes\"", "\"smoking_status_smokes_now\"");
        match TreeEnsemble::from_json(&json) {
            Err(ModelError::SchemaMismatch { index, .. }) => assert_eq!(index, 15),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn backwards_child_is_rejected() {
        let trees = r#"[{"nodes": [
            {"feature": 0, "threshold": 65.0, "left": 0, "right": 1, "cover": 10.0},
            {"leaf": 0.1, "cover": 10.0}
        ]}]"#;
        assert!(matches!(
            TreeEnsemble::from_json(&artifact(trees)),
            Err(ModelError::MalformedTree { tree: 0, node: 0, .. })
        ));
    }

    #[test]
    fn empty_ensemble_scores_base_margin() {
        let model = TreeEnsemble::from_json(&artifact("[]")).unwrap();
        assert_eq!(model.n_trees(), 0);
        let proba = model.predict_proba(&row_with_age(50.0)).unwrap();
        assert!((proba[0][1] - sigmoid(-1.0)).abs() < 1e-12);
    }
}
