//! JSON scorecard artifacts.
//!
//! Two classifier shapes are understood, both ending in a logistic link:
//! a sparse linear model over numeric and one-hot categorical inputs, and an
//! additive ensemble of regression trees over numeric inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{InferenceError, LoadError},
    model::{FeatureRow, FeatureSchema, Predictor},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Probability,
    /// Hard 0/1 class decision at `threshold`.
    Label,
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scorecard {
    Logistic(LogisticScorecard),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticScorecard {
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub numeric: BTreeMap<String, f64>,
    /// Per-category weights; unknown categories contribute nothing.
    #[serde(default)]
    pub categorical: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub output: OutputKind,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
    #[serde(default)]
    pub output: OutputKind,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Nodes are stored flat with node 0 as root. Children always sit after
/// their parent, which keeps traversal acyclic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl Scorecard {
    /// Checks the artifact against the schema it will be served under.
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), LoadError> {
        let (output_threshold, features): (f64, Vec<&str>) = match self {
            Scorecard::Logistic(model) => (
                model.threshold,
                model
                    .numeric
                    .keys()
                    .chain(model.categorical.keys())
                    .map(String::as_str)
                    .collect(),
            ),
            Scorecard::TreeEnsemble(model) => {
                for (index, tree) in model.trees.iter().enumerate() {
                    tree.validate()
                        .map_err(|reason| LoadError::Invalid(format!("tree {index}: {reason}")))?;
                }
                (
                    model.threshold,
                    model
                        .trees
                        .iter()
                        .flat_map(|tree| tree.nodes.iter())
                        .filter_map(|node| match node {
                            TreeNode::Split { feature, .. } => Some(feature.as_str()),
                            TreeNode::Leaf { .. } => None,
                        })
                        .collect(),
                )
            }
        };

        if !(0.0..=1.0).contains(&output_threshold) {
            return Err(LoadError::Invalid(format!(
                "threshold {output_threshold} outside [0, 1]"
            )));
        }
        if let Some(unknown) = features.iter().find(|name| !schema.contains(name)) {
            return Err(LoadError::Invalid(format!(
                "feature '{unknown}' is not part of the request schema"
            )));
        }
        Ok(())
    }

    fn margin(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        match self {
            Scorecard::Logistic(model) => model.margin(row),
            Scorecard::TreeEnsemble(model) => model.margin(row),
        }
    }

    fn decision(&self) -> (OutputKind, f64) {
        match self {
            Scorecard::Logistic(model) => (model.output, model.threshold),
            Scorecard::TreeEnsemble(model) => (model.output, model.threshold),
        }
    }
}

impl Predictor for Scorecard {
    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let probability = sigmoid(self.margin(row)?);
        if !probability.is_finite() {
            return Err(InferenceError(format!(
                "non-finite probability {probability}"
            )));
        }
        Ok(match self.decision() {
            (OutputKind::Probability, _) => probability,
            (OutputKind::Label, threshold) if probability >= threshold => 1.0,
            (OutputKind::Label, _) => 0.0,
        })
    }
}

impl LogisticScorecard {
    fn margin(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let mut margin = self.intercept;
        for (feature, weight) in &self.numeric {
            margin += weight * numeric(row, feature)?;
        }
        for (feature, weights) in &self.categorical {
            let category = row
                .get(feature)
                .ok_or_else(|| missing(feature))?
                .to_string();
            margin += weights.get(&category).copied().unwrap_or(0.0);
        }
        Ok(margin)
    }
}

impl TreeEnsemble {
    fn margin(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += tree.evaluate(row)?;
        }
        Ok(margin)
    }
}

impl RegressionTree {
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".into());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    left,
                    right,
                    threshold,
                    ..
                } => {
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {index} has invalid child {child}"));
                        }
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has non-finite threshold"));
                    }
                }
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(format!("node {index} has non-finite leaf"));
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    fn evaluate(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if numeric(row, feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => {
                    return Err(InferenceError(format!("tree node {index} out of range")));
                }
            }
        }
    }
}

fn numeric(row: &FeatureRow, feature: &str) -> Result<f64, InferenceError> {
    let value = row.get(feature).ok_or_else(|| missing(feature))?;
    value.as_f64().ok_or_else(|| {
        InferenceError(format!(
            "feature '{feature}' expects a number, got {} '{value}'",
            value.kind()
        ))
    })
}

fn missing(feature: &str) -> InferenceError {
    InferenceError(format!("feature '{feature}' missing from row"))
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureMap;
    use serde_json::json;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(["age", "renta", "sexo"])
    }

    fn row(age: i64, sexo: &str) -> FeatureRow {
        let mut features = FeatureMap::new();
        features.insert("age", age);
        features.insert("renta", 45000.0);
        features.insert("sexo", sexo);
        schema().row(&features)
    }

    fn parse(value: serde_json::Value) -> Scorecard {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn logistic_zero_margin_is_one_half() {
        let model = parse(json!({"kind": "logistic"}));
        assert_eq!(model.predict(&row(30, "V")).unwrap(), 0.5);
    }

    #[test]
    fn logistic_combines_numeric_and_categorical_weights() {
        let model = parse(json!({
            "kind": "logistic",
            "intercept": -1.0,
            "numeric": {"age": 0.05},
            "categorical": {"sexo": {"H": 0.5}}
        }));
        let with_category = model.predict(&row(20, "H")).unwrap();
        assert!((with_category - sigmoid(0.5)).abs() < 1e-12);

        // unknown category adds nothing
        let without = model.predict(&row(20, "V")).unwrap();
        assert!((without - sigmoid(0.0)).abs() < 1e-12);
    }

    #[test]
    fn label_output_thresholds_probability() {
        let model = parse(json!({
            "kind": "logistic",
            "numeric": {"age": 1.0},
            "output": "label",
            "threshold": 0.7
        }));
        assert_eq!(model.predict(&row(1, "V")).unwrap(), 1.0);
        assert_eq!(model.predict(&row(0, "V")).unwrap(), 0.0);
    }

    #[test]
    fn non_numeric_value_fails_inference() {
        let model = parse(json!({"kind": "logistic", "numeric": {"sexo": 1.0}}));
        let err = model.predict(&row(30, "V")).unwrap_err();
        assert!(err.0.contains("'sexo' expects a number"));
    }

    #[test]
    fn tree_ensemble_walks_splits() {
        let model = parse(json!({
            "kind": "tree_ensemble",
            "base_score": 0.0,
            "trees": [
                {"nodes": [
                    {"feature": "age", "threshold": 40.0, "left": 1, "right": 2},
                    {"value": -1.0},
                    {"value": 1.0}
                ]},
                {"nodes": [{"value": 0.25}]}
            ]
        }));
        model.validate(&schema()).unwrap();

        let young = model.predict(&row(30, "V")).unwrap();
        let old = model.predict(&row(50, "V")).unwrap();
        assert!((young - sigmoid(-0.75)).abs() < 1e-12);
        assert!((old - sigmoid(1.25)).abs() < 1e-12);
    }

    #[test]
    fn validation_rejects_unknown_features_and_bad_trees() {
        let unknown = parse(json!({"kind": "logistic", "numeric": {"height": 1.0}}));
        assert!(matches!(
            unknown.validate(&schema()),
            Err(LoadError::Invalid(msg)) if msg.contains("height")
        ));

        let cyclic = parse(json!({
            "kind": "tree_ensemble",
            "trees": [{"nodes": [
                {"feature": "age", "threshold": 1.0, "left": 0, "right": 1},
                {"value": 0.0}
            ]}]
        }));
        assert!(cyclic.validate(&schema()).is_err());

        let threshold = parse(json!({"kind": "logistic", "threshold": 1.5}));
        assert!(threshold.validate(&schema()).is_err());
    }

    #[test]
    fn unknown_kind_does_not_parse() {
        let parsed: Result<Scorecard, _> = serde_json::from_value(json!({"kind": "svm"}));
        assert!(parsed.is_err());
    }
}
