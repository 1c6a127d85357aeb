//! Regression tree ensemble evaluated from an exported node table.

use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::error::{Error, Result};

/// One node of an exported regression tree. Index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidModel("tree without nodes".to_string()));
        }
        for node in &self.nodes {
            if let TreeNode::Split { feature, left, right, .. } = node {
                if *feature >= n_features || *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(Error::InvalidModel("tree node points outside the model".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Walk from the root; `x[feature] <= threshold` goes left
    pub fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let mut index = 0;
        // a well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..=self.nodes.len() {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split { feature, threshold, left, right } => {
                    // a missing input compares false and goes right
                    let value = x.get(*feature).copied().unwrap_or(f64::NAN);
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
        Err(Error::InvalidModel("cycle in regression tree".to_string()))
    }
}

/// Mean of the predictions of its trees (random forest regressor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestRegressor {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl ForestRegressor {
    pub fn new(n_features: usize, trees: Vec<RegressionTree>) -> Result<Self> {
        let forest = Self { n_features, trees };
        forest.validate()?;
        Ok(forest)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::InvalidModel("forest without trees".to_string()));
        }
        self.trees.iter().try_for_each(|t| t.validate(self.n_features))
    }
}

impl Regressor for ForestRegressor {
    fn predict(&self, inputs: &[f64]) -> Result<f64> {
        if inputs.len() != self.n_features {
            return Err(Error::InvalidInput(format!(
                "forest expects {} features, got {}",
                self.n_features,
                inputs.len()
            )));
        }
        let total = self.trees.iter().map(|t| t.evaluate(inputs)).sum::<Result<f64>>()?;
        Ok(total / self.trees.len() as f64)
    }

    fn name(&self) -> &str {
        "Random Forest"
    }
}
