use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;

use super::InferenceError;
use crate::inference::artifacts::ArtifactError;

/// A trained multiclass model. Probabilities are reported in the order of
/// `classes()`, and `predict` returns a value taken from `classes()`.
pub trait Classifier: Send + Sync {
    fn classes(&self) -> &[i64];
    fn n_features(&self) -> usize;
    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    fn predict(&self, features: &[f64]) -> Result<i64, InferenceError> {
        let probabilities = self.predict_probabilities(features)?;
        predicted_class(self.classes(), &probabilities)
    }
}

/// The class at the arg-max of a distribution ordered like `classes`.
pub fn predicted_class(classes: &[i64], probabilities: &[f64]) -> Result<i64, InferenceError> {
    argmax(probabilities)
        .and_then(|position| classes.get(position).copied())
        .ok_or(InferenceError::EmptyOutput)
}

/// Position of the largest value; the first one wins on ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (position, value) in values.iter().copied().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((position, value)),
        }
    }
    best.map(|(position, _)| position)
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// On-disk classifier description, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    SoftmaxLinear(SoftmaxLinearArtifact),
    TreeEnsemble(TreeEnsembleArtifact),
}

impl ClassifierArtifact {
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, ArtifactError> {
        match self {
            ClassifierArtifact::SoftmaxLinear(artifact) => Ok(Box::new(SoftmaxLinear::try_from(artifact)?)),
            ClassifierArtifact::TreeEnsemble(artifact) => Ok(Box::new(TreeEnsemble::try_from(artifact)?)),
        }
    }
}

fn check_classes(classes: &[i64]) -> Result<(), ArtifactError> {
    if classes.is_empty() {
        return Err(ArtifactError::Invalid("classifier declares no classes".into()));
    }
    let mut seen = HashSet::new();
    for class in classes {
        if !seen.insert(class) {
            return Err(ArtifactError::Invalid(format!("classifier declares class {} twice", class)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoftmaxLinearArtifact {
    pub classes: Vec<i64>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

/// Multinomial logistic regression: softmax over `coefficients · x + intercepts`.
#[derive(Debug, Clone)]
pub struct SoftmaxLinear {
    classes: Vec<i64>,
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
}

impl TryFrom<SoftmaxLinearArtifact> for SoftmaxLinear {
    type Error = ArtifactError;

    fn try_from(artifact: SoftmaxLinearArtifact) -> Result<Self, Self::Error> {
        check_classes(&artifact.classes)?;
        let rows = artifact.coefficients.len();
        if rows != artifact.classes.len() || artifact.intercepts.len() != rows {
            return Err(ArtifactError::Invalid(format!(
                "softmax_linear has {} classes, {} coefficient rows and {} intercepts",
                artifact.classes.len(),
                rows,
                artifact.intercepts.len()
            )));
        }
        let width = artifact.coefficients[0].len();
        if artifact.coefficients.iter().any(|row| row.len() != width) {
            return Err(ArtifactError::Invalid(
                "softmax_linear coefficient rows differ in length".into(),
            ));
        }
        let flat: Vec<f64> = artifact.coefficients.into_iter().flatten().collect();
        let coefficients = Array2::from_shape_vec((rows, width), flat)
            .map_err(|e| ArtifactError::Invalid(format!("softmax_linear coefficients: {}", e)))?;

        Ok(Self {
            classes: artifact.classes,
            coefficients,
            intercepts: Array1::from(artifact.intercepts),
        })
    }
}

impl Classifier for SoftmaxLinear {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coefficients.ncols()
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features() {
            return Err(InferenceError::WidthMismatch {
                expected: self.n_features(),
                found: features.len(),
            });
        }
        let scores = self.coefficients.dot(&ArrayView1::from(features)) + &self.intercepts;
        Ok(softmax(&scores.to_vec()))
    }
}

fn default_base_score() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsembleArtifact {
    pub classes: Vec<i64>,
    pub n_features: usize,
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

/// One regression tree contributing to the margin of `class_slot`.
/// Node 0 is the root and children always come after their parent.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub class_slot: usize,
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl Tree {
    fn check(&self, n_features: usize, n_classes: usize) -> Result<(), ArtifactError> {
        if self.class_slot >= n_classes {
            return Err(ArtifactError::Invalid(format!(
                "tree targets class slot {} but only {} classes exist",
                self.class_slot, n_classes
            )));
        }
        if self.nodes.is_empty() {
            return Err(ArtifactError::Invalid("tree has no nodes".into()));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, left, right, .. } = node {
                if *feature >= n_features {
                    return Err(ArtifactError::Invalid(format!(
                        "node {} splits on feature {} of {}",
                        id, feature, n_features
                    )));
                }
                for child in [left, right] {
                    if *child <= id || *child >= self.nodes.len() {
                        return Err(ArtifactError::Invalid(format!(
                            "node {} has out-of-order child {}",
                            id, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Missing (NaN) values follow the left branch.
    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split { feature, threshold, left, right } => {
                    let x = features[*feature];
                    id = if x.is_nan() || x < *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Gradient-boosted trees for multiclass output: each class margin is
/// `base_score` plus the sum of its trees' leaves, then softmaxed.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    classes: Vec<i64>,
    n_features: usize,
    base_score: f64,
    trees: Vec<Tree>,
}

impl TryFrom<TreeEnsembleArtifact> for TreeEnsemble {
    type Error = ArtifactError;

    fn try_from(artifact: TreeEnsembleArtifact) -> Result<Self, Self::Error> {
        check_classes(&artifact.classes)?;
        for tree in &artifact.trees {
            tree.check(artifact.n_features, artifact.classes.len())?;
        }
        Ok(Self {
            classes: artifact.classes,
            n_features: artifact.n_features,
            base_score: artifact.base_score,
            trees: artifact.trees,
        })
    }
}

impl Classifier for TreeEnsemble {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::WidthMismatch {
                expected: self.n_features,
                found: features.len(),
            });
        }
        let mut margins = vec![self.base_score; self.classes.len()];
        for tree in &self.trees {
            margins[tree.class_slot] += tree.leaf_value(features);
        }
        Ok(softmax(&margins))
    }
}
