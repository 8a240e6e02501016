use std::collections::BTreeMap;

use shared::{ClassProbability, CoverType, PredictionResponse, UNKNOWN_LABEL};
use strum::IntoEnumIterator;

use crate::inference::engine::RawPrediction;

/// Maps classifier class indices onto cover-type names.
///
/// Probability position `i` belongs to the classifier's `i`-th declared class.
/// Without a declared class list it falls back to class `base + i`. The
/// reference Covertype model is 1-based; models trained on re-encoded targets
/// are usually 0-based, so the base is taken from the artifact rather than assumed.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMapper {
    labels: BTreeMap<i64, String>,
    base: i64,
    classes: Vec<i64>,
}

impl LabelMapper {
    pub fn new(labels: BTreeMap<i64, String>, base: i64) -> Self {
        Self {
            labels,
            base,
            classes: Vec::new(),
        }
    }

    /// Labels probability positions by the classifier's own class order.
    pub fn with_classes(mut self, classes: &[i64]) -> Self {
        self.classes = classes.to_vec();
        self
    }

    /// The seven cover types, with the first at `base`.
    pub fn cover_types(base: i64) -> Self {
        let labels = CoverType::iter()
            .map(|cover| (cover.code() - 1 + base, cover.to_string()))
            .collect();
        Self::new(labels, base)
    }

    pub fn base(&self) -> i64 {
        self.base
    }

    pub fn label_for(&self, class_index: i64) -> &str {
        self.labels
            .get(&class_index)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn class_at(&self, position: usize) -> i64 {
        self.classes
            .get(position)
            .copied()
            .unwrap_or(self.base + position as i64)
    }

    pub fn label_probabilities(&self, probabilities: &[f64]) -> Vec<ClassProbability> {
        probabilities
            .iter()
            .enumerate()
            .map(|(position, probability)| ClassProbability {
                cover_type: self.label_for(self.class_at(position)).to_string(),
                probability: *probability,
            })
            .collect()
    }

    pub fn to_response(&self, raw: &RawPrediction) -> PredictionResponse {
        let prediction = self.label_for(raw.class_index);
        if prediction == UNKNOWN_LABEL {
            log::warn!("Classifier returned unmapped class index {}", raw.class_index);
        }
        PredictionResponse {
            prediction: prediction.to_string(),
            probabilities: self.label_probabilities(&raw.probabilities),
        }
    }
}
