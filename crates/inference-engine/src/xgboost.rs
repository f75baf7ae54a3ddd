//! XGBoost JSON Model Evaluation
//!
//! Reads the native JSON model format written by `Booster.save_model` and
//! evaluates its regression trees for binary classification. Only numeric
//! splits on a `gbtree` booster are supported.

use crate::classifier::{sigmoid, Classifier};
use crate::InferenceError;
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    learner_model_param: LearnerModelParam,
    gradient_booster: GradientBooster,
    objective: ObjectiveParam,
}

#[derive(Deserialize, Default)]
struct LearnerModelParam {
    #[serde(default)]
    base_score: Option<String>,
    #[serde(default)]
    num_class: Option<String>,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModel>,
}

#[derive(Deserialize)]
struct GbTreeModel {
    trees: Vec<RawTree>,
}

#[derive(Deserialize)]
struct ObjectiveParam {
    name: String,
}

#[derive(Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    #[serde(default)]
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older models store flags as 0/1, newer ones as booleans
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: RawTree, index: usize) -> Result<Self, String> {
        let n = raw.left_children.len();
        if n == 0 {
            return Err(format!("tree {index} has no nodes"));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || (!raw.default_left.is_empty() && raw.default_left.len() != n)
        {
            return Err(format!("tree {index} has inconsistent node arrays"));
        }
        if raw.split_type.iter().any(|&t| t != 0) {
            return Err(format!("tree {index} uses categorical splits"));
        }

        let child = |c: i64, parent: usize| -> Result<usize, String> {
            usize::try_from(c)
                .ok()
                .filter(|&c| c > parent && c < n)
                .ok_or_else(|| format!("tree {index} node {parent} has invalid child {c}"))
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (raw.left_children[i], raw.right_children[i]);
            if left == -1 && right == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i] as f32));
                continue;
            }
            let feature = usize::try_from(raw.split_indices[i])
                .map_err(|_| format!("tree {index} node {i} has negative split index"))?;
            nodes.push(Node::Split {
                feature,
                threshold: raw.split_conditions[i] as f32,
                left: child(left, i)?,
                right: child(right, i)?,
                default_left: raw.default_left.get(i).map_or(false, |f| f.is_set()),
            });
        }

        Ok(Self { nodes })
    }

    /// Walk from the root to a leaf. Missing (NaN or absent) values follow
    /// the node's default direction.
    fn leaf_value(&self, row: &[f64]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    idx = match row.get(feature).copied().filter(|v| !v.is_nan()) {
                        Some(x) if (x as f32) < threshold => left,
                        Some(_) => right,
                        None if default_left => left,
                        None => right,
                    };
                }
            }
        }
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf(_) => None,
            })
            .max()
    }
}

/// How the objective stores its base score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    /// `binary:logistic` / `reg:logistic`: base score is a probability
    Logistic,
    /// `binary:logitraw`: base score is already a margin
    LogitRaw,
}

/// Binary gradient-boosted tree ensemble loaded from XGBoost JSON
#[derive(Debug, Clone)]
pub struct XgbClassifier {
    trees: Vec<Tree>,
    base_margin: f32,
    num_feature: usize,
}

impl XgbClassifier {
    /// Parse a model from its JSON bytes. The error is a human-readable reason.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, String> {
        let file: ModelFile = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        let learner = file.learner;

        let link = match learner.objective.name.as_str() {
            "binary:logistic" | "reg:logistic" => Link::Logistic,
            "binary:logitraw" => Link::LogitRaw,
            other => return Err(format!("unsupported objective '{other}'")),
        };

        let num_class = parse_param(learner.learner_model_param.num_class.as_deref(), "num_class")?;
        if num_class > 1.0 {
            return Err(format!("multi-class models are not supported (num_class={num_class})"));
        }

        if learner.gradient_booster.name != "gbtree" {
            return Err(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            ));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| "gbtree booster has no model".to_string())?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, i))
            .collect::<Result<Vec<_>, _>>()?;

        let base_score = match learner.learner_model_param.base_score.as_deref() {
            Some(raw) => parse_param(Some(raw), "base_score")?,
            None => 0.5,
        };
        let base_margin = match link {
            Link::Logistic => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    return Err(format!("base_score {base_score} outside (0, 1)"));
                }
                (base_score / (1.0 - base_score)).ln()
            }
            Link::LogitRaw => base_score,
        };

        let num_feature =
            parse_param(learner.learner_model_param.num_feature.as_deref(), "num_feature")? as usize;

        debug!(
            trees = trees.len(),
            num_feature,
            base_margin,
            "Parsed XGBoost model"
        );

        Ok(Self {
            trees,
            base_margin: base_margin as f32,
            num_feature,
        })
    }

    /// Feature count recorded in the model, 0 when unknown
    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    /// Number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Highest feature index used by any split
    pub fn max_feature_index(&self) -> Option<usize> {
        self.trees.iter().filter_map(Tree::max_feature).max()
    }

    /// Raw ensemble margin for one row
    pub fn margin(&self, row: &[f64]) -> f32 {
        self.trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(row))
    }
}

impl Classifier for XgbClassifier {
    fn predict_proba(&self, row: &[f64]) -> Result<f64, InferenceError> {
        let margin = self.margin(row) as f64;
        if margin.is_nan() {
            return Err(InferenceError::InferenceFailed(
                "ensemble produced a NaN margin".to_string(),
            ));
        }
        Ok(sigmoid(margin))
    }

    fn name(&self) -> &str {
        "xgboost"
    }
}

/// Learner params are strings; newer versions wrap scalars in brackets
fn parse_param(raw: Option<&str>, name: &str) -> Result<f64, String> {
    let Some(raw) = raw else {
        return Ok(0.0);
    };
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {name} '{raw}'"))
}
