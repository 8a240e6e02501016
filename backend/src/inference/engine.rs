use super::InferenceError;
use super::artifacts::{ArtifactBundle, ArtifactError};
use super::classifier::predicted_class;
use crate::features::assembler::FeatureVector;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    /// In the classifier's label space, not necessarily 0-based.
    pub class_index: i64,
    /// Ordered like `Classifier::classes`, normalised to sum to 1.
    pub probabilities: Vec<f64>,
}

/// Scales the declared numeric columns in place and scores the result.
pub struct InferenceEngine {
    bundle: ArtifactBundle,
    scaled_positions: Vec<usize>,
}

impl InferenceEngine {
    pub fn new(bundle: ArtifactBundle) -> Result<Self, ArtifactError> {
        let scaled_positions = bundle
            .scaler()
            .feature_names()
            .iter()
            .map(|name| {
                bundle
                    .feature_order()
                    .iter()
                    .position(|candidate| candidate == name)
                    .ok_or_else(|| ArtifactError::UnknownScalerFeature(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let warmup = vec![0.0; bundle.feature_order().len()];
        let class = bundle
            .classifier()
            .predict(&warmup)
            .map_err(|e| ArtifactError::Invalid(format!("classifier failed on a zero vector: {}", e)))?;
        log::debug!("Classifier warm-up on a zero vector predicted class {}", class);

        Ok(Self {
            bundle,
            scaled_positions,
        })
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn infer(&self, vector: FeatureVector) -> Result<RawPrediction, InferenceError> {
        let expected = self.bundle.feature_order().len();
        if vector.len() != expected {
            return Err(InferenceError::WidthMismatch {
                expected,
                found: vector.len(),
            });
        }

        let mut values = vector.into_inner();
        let numeric: Vec<f64> = self.scaled_positions.iter().map(|&p| values[p]).collect();
        let scaled = self.bundle.scaler().transform(&numeric)?;
        if scaled.len() != numeric.len() {
            return Err(InferenceError::ScalerOutput {
                expected: numeric.len(),
                found: scaled.len(),
            });
        }
        for (&position, value) in self.scaled_positions.iter().zip(scaled) {
            values[position] = value;
        }

        // One scoring pass; the class is read off the same distribution it reports.
        let classifier = self.bundle.classifier();
        let probabilities = normalise(
            classifier.predict_probabilities(&values)?,
            classifier.classes().len(),
        )?;
        let class_index = predicted_class(classifier.classes(), &probabilities)?;

        Ok(RawPrediction {
            class_index,
            probabilities,
        })
    }
}

fn normalise(probabilities: Vec<f64>, class_count: usize) -> Result<Vec<f64>, InferenceError> {
    if probabilities.len() != class_count {
        return Err(InferenceError::ProbabilityCount {
            expected: class_count,
            found: probabilities.len(),
        });
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(InferenceError::InvalidProbabilities(format!("entry {}", bad)));
    }
    let total: f64 = probabilities.iter().sum();
    if total <= 0.0 {
        return Err(InferenceError::InvalidProbabilities("probabilities sum to zero".into()));
    }
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        log::warn!("Classifier probabilities sum to {}, renormalising", total);
    }
    Ok(probabilities.into_iter().map(|p| p / total).collect())
}
