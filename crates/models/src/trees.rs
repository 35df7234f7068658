//! Tree ensemble model
//!
//! score = sum over trees of tree.weight * tree.root.evaluate(features)
//!
//! Definition format (`trees` param):
//!
//! ```json
//! [
//!   { "weight": 1.0,
//!     "root": { "feature": "matchedTitle", "threshold": 0.5,
//!               "left":  { "value": -10.0 },
//!               "right": { "value": 50.0 } } }
//! ]
//! ```
//!
//! `tree` is accepted in place of `root`. A node with a `feature` is a split,
//! otherwise it is a leaf. A split goes left iff the feature value is
//! `<= threshold + NODE_SPLIT_SLACK`.
//!
//! A split on a feature that is not one of the model's features contributes
//! zero for the whole subtree. This is not an error.

use crate::model::ScoringAlgorithm;
use crate::model_feature::ModelFeature;
use ltrank_core::{to_f32, Explanation, LtrError, LtrResult, Params};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Added to every configured split threshold
pub const NODE_SPLIT_SLACK: f32 = 1e-6;

// ============================================================================
// TreeNode
// ============================================================================

/// A regression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Terminal node
    Leaf {
        /// Output of the tree when this leaf is reached
        value: f32,
    },
    /// Binary split on one feature
    Split {
        /// Feature name
        feature: String,
        /// Position of the feature among the model features; None when the
        /// model has no such feature
        feature_index: Option<usize>,
        /// Effective threshold (configured + `NODE_SPLIT_SLACK`)
        threshold: Option<f32>,
        /// Taken when value <= threshold
        left: Option<Box<TreeNode>>,
        /// Taken when value > threshold
        right: Option<Box<TreeNode>>,
    },
}

impl TreeNode {
    fn parse(
        model_name: &str,
        map: &Map<String, Value>,
        feature_index: &HashMap<&str, usize>,
    ) -> LtrResult<Self> {
        let float = |key: &str| -> LtrResult<Option<f32>> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => to_f32(v).map(Some).ok_or_else(|| {
                    LtrError::ModelConfig(format!(
                        "Model {} tree node has invalid {} {}",
                        model_name, key, v
                    ))
                }),
            }
        };
        let child = |key: &str| -> LtrResult<Option<Box<TreeNode>>> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Object(child)) => Ok(Some(Box::new(TreeNode::parse(
                    model_name,
                    child,
                    feature_index,
                )?))),
                Some(other) => Err(LtrError::ModelConfig(format!(
                    "Model {} tree node has invalid {} {}",
                    model_name, key, other
                ))),
            }
        };

        match map.get("feature") {
            None | Some(Value::Null) => Ok(TreeNode::Leaf {
                value: float("value")?.unwrap_or(0.0),
            }),
            Some(Value::String(feature)) => Ok(TreeNode::Split {
                feature: feature.clone(),
                feature_index: feature_index.get(feature.as_str()).copied(),
                threshold: float("threshold")?.map(|t| t + NODE_SPLIT_SLACK),
                left: child("left")?,
                right: child("right")?,
            }),
            Some(other) => Err(LtrError::ModelConfig(format!(
                "Model {} tree node has invalid feature {}",
                model_name, other
            ))),
        }
    }

    /// Whether this node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Output of the subtree rooted here
    pub fn evaluate(&self, features: &[f32]) -> f32 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let Some(value) = feature_index.and_then(|i| features.get(i)) else {
                        return 0.0;
                    };
                    let next = if *value <= threshold.unwrap_or(f32::INFINITY) {
                        left
                    } else {
                        right
                    };
                    match next {
                        Some(child) => node = &**child,
                        None => return 0.0,
                    }
                }
            }
        }
    }

    fn explain(&self, features: &[f32], out: &mut String) {
        match self {
            TreeNode::Leaf { value } => out.push_str(&format!("val: {:?}", value)),
            TreeNode::Split {
                feature,
                feature_index,
                threshold,
                left,
                right,
            } => {
                let Some(value) = feature_index.and_then(|i| features.get(i)) else {
                    out.push_str(&format!("'{}' does not exist in FV, Return Zero", feature));
                    return;
                };
                let threshold = threshold.unwrap_or(f32::INFINITY);
                let next = if *value <= threshold {
                    out.push_str(&format!("'{}':{:?} <= {:?}, Go Left | ", feature, value, threshold));
                    left
                } else {
                    out.push_str(&format!("'{}':{:?} > {:?}, Go Right | ", feature, value, threshold));
                    right
                };
                match next {
                    Some(child) => child.explain(features, out),
                    None => out.push_str("val: 0.0"),
                }
            }
        }
    }

    fn validate(&self, model_name: &str) -> LtrResult<()> {
        let TreeNode::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = self
        else {
            return Ok(());
        };
        let missing = |what: &str| {
            LtrError::ModelConfig(format!(
                "Model {} tree node is missing {}",
                model_name, what
            ))
        };
        if threshold.is_none() {
            return Err(missing("threshold"));
        }
        let left = left.as_deref().ok_or_else(|| missing("left"))?;
        left.validate(model_name)?;
        let right = right.as_deref().ok_or_else(|| missing("right"))?;
        right.validate(model_name)?;
        if left.is_leaf() && right.is_leaf() {
            warn!(
                target: "ltrank::models",
                model = model_name,
                feature = %feature,
                "Tree node has two leaves"
            );
        }
        Ok(())
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeNode::Leaf { value } => write!(f, "{:?}", value),
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                write!(f, "(feature={}", feature)?;
                match threshold {
                    Some(t) => write!(f, ",threshold={:?}", t - NODE_SPLIT_SLACK)?,
                    None => f.write_str(",threshold=null")?,
                }
                match left {
                    Some(l) => write!(f, ",left={}", l)?,
                    None => f.write_str(",left=null")?,
                }
                match right {
                    Some(r) => write!(f, ",right={})", r),
                    None => f.write_str(",right=null)"),
                }
            }
        }
    }
}

// ============================================================================
// RegressionTree
// ============================================================================

/// A weighted regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    /// Multiplier applied to the tree output
    pub weight: Option<f32>,
    /// Root node
    pub root: Option<TreeNode>,
}

impl RegressionTree {
    /// Weighted output of the tree
    pub fn score(&self, features: &[f32]) -> f32 {
        match (self.weight, &self.root) {
            (Some(weight), Some(root)) => weight * root.evaluate(features),
            _ => 0.0,
        }
    }

    fn explain(&self, features: &[f32]) -> String {
        let mut out = String::new();
        match &self.root {
            Some(root) => root.explain(features, &mut out),
            None => out.push_str("tree missing"),
        }
        out
    }

    fn validate(&self, model_name: &str) -> LtrResult<()> {
        if self.weight.is_none() {
            return Err(LtrError::ModelConfig(format!(
                "Model {} tree doesn't contain a weight",
                model_name
            )));
        }
        match &self.root {
            Some(root) => root.validate(model_name),
            None => Err(LtrError::ModelConfig(format!(
                "Model {} tree doesn't contain a tree",
                model_name
            ))),
        }
    }
}

// ============================================================================
// TreeEnsembleModel
// ============================================================================

/// Sum of weighted regression trees
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsembleModel {
    /// None when the definition declares no `trees`
    trees: Option<Vec<RegressionTree>>,
}

impl TreeEnsembleModel {
    /// Parse the `trees` param, resolving split features against `features`
    pub fn from_params(model_name: &str, features: &[ModelFeature], params: &Params) -> LtrResult<Self> {
        let feature_index: HashMap<&str, usize> = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name(), i))
            .collect();

        let trees = match params.get("trees") {
            None | Some(Value::Null) => None,
            Some(Value::Array(list)) => {
                let mut trees = Vec::with_capacity(list.len());
                for entry in list {
                    let Value::Object(tree) = entry else {
                        return Err(LtrError::ModelConfig(format!(
                            "Model {} has invalid tree {}",
                            model_name, entry
                        )));
                    };
                    let weight = match tree.get("weight") {
                        None | Some(Value::Null) => None,
                        Some(w) => Some(to_f32(w).ok_or_else(|| {
                            LtrError::ModelConfig(format!(
                                "Model {} has invalid tree weight {}",
                                model_name, w
                            ))
                        })?),
                    };
                    let root = match tree.get("root").or_else(|| tree.get("tree")) {
                        None | Some(Value::Null) => None,
                        Some(Value::Object(node)) => {
                            Some(TreeNode::parse(model_name, node, &feature_index)?)
                        }
                        Some(other) => {
                            return Err(LtrError::ModelConfig(format!(
                                "Model {} has invalid tree root {}",
                                model_name, other
                            )))
                        }
                    };
                    trees.push(RegressionTree { weight, root });
                }
                Some(trees)
            }
            Some(other) => {
                return Err(LtrError::ModelConfig(format!(
                    "Model {} has invalid trees {}",
                    model_name, other
                )))
            }
        };

        Ok(TreeEnsembleModel { trees })
    }

    /// The trees of the ensemble
    pub fn trees(&self) -> &[RegressionTree] {
        self.trees.as_deref().unwrap_or(&[])
    }
}

impl ScoringAlgorithm for TreeEnsembleModel {
    fn score(&self, normalized: &[f32]) -> f32 {
        self.trees().iter().map(|t| t.score(normalized)).sum()
    }

    fn explain_details(&self, feature_explanations: &[Explanation]) -> Vec<Explanation> {
        let values: Vec<f32> = feature_explanations.iter().map(|e| e.value).collect();
        self.trees()
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                Explanation::new(
                    tree.score(&values),
                    format!("tree {} | {}", i, tree.explain(&values)),
                )
            })
            .collect()
    }

    fn validate(&self, model_name: &str) -> LtrResult<()> {
        let trees = self.trees.as_ref().ok_or_else(|| {
            LtrError::ModelConfig(format!("no trees declared for model {}", model_name))
        })?;
        for tree in trees {
            tree.validate(model_name)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeEnsembleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(trees) = &self.trees else {
            return f.write_str("trees=null");
        };
        f.write_str("trees=[")?;
        for (i, tree) in trees.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match tree.weight {
                Some(w) => write!(f, "(weight={:?}", w)?,
                None => f.write_str("(weight=null")?,
            }
            match &tree.root {
                Some(root) => write!(f, ",root={})", root)?,
                None => f.write_str(",root=null)")?,
            }
        }
        f.write_str("]")
    }
}
