use std::sync::Arc;

use serde_json::{Map, Value};
use shared::{PredictionResponse, UNKNOWN_LABEL};
use uuid::Uuid;

use crate::error::PredictionError;
use crate::features::assembler::FeatureAssembler;
use crate::features::schema::RequestSchema;
use crate::inference::artifacts::{ArtifactBundle, ArtifactError, ArtifactPaths};
use crate::inference::engine::InferenceEngine;
use crate::labels::LabelMapper;

/// Validation, assembly, scaling, scoring and labelling over one immutable bundle.
pub struct Predictor {
    schema: RequestSchema,
    engine: InferenceEngine,
    labels: LabelMapper,
}

impl Predictor {
    pub fn load(paths: &ArtifactPaths, schema: RequestSchema) -> Result<Self, ArtifactError> {
        Self::new(schema, ArtifactBundle::load(paths)?)
    }

    pub fn new(schema: RequestSchema, bundle: ArtifactBundle) -> Result<Self, ArtifactError> {
        let order = bundle.feature_order();
        if let Some(missing) = schema.required().find(|field| !order.contains(&field.name)) {
            return Err(ArtifactError::MissingRequiredFeature(missing.name.clone()));
        }
        let unused: Vec<&str> = schema
            .indicators()
            .filter(|field| !order.contains(&field.name))
            .map(|field| field.name.as_str())
            .collect();
        if !unused.is_empty() {
            log::warn!(
                "{} declared indicator fields are not model inputs and will be ignored: {}",
                unused.len(),
                unused.join(", ")
            );
        }

        let labels = label_mapper(&bundle);
        let unlabelled: Vec<i64> = bundle
            .classifier()
            .classes()
            .iter()
            .copied()
            .filter(|class| labels.label_for(*class) == UNKNOWN_LABEL)
            .collect();
        if !unlabelled.is_empty() {
            log::warn!("Classifier classes {:?} have no label and will be reported as '{}'", unlabelled, UNKNOWN_LABEL);
        }

        Ok(Self {
            schema,
            engine: InferenceEngine::new(bundle)?,
            labels,
        })
    }

    pub fn schema(&self) -> &RequestSchema {
        &self.schema
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        self.engine.bundle()
    }

    pub fn labels(&self) -> &LabelMapper {
        &self.labels
    }

    pub fn predict(&self, body: &Map<String, Value>) -> Result<PredictionResponse, PredictionError> {
        let request_id = Uuid::new_v4();
        let request = self.schema.validate(body).inspect_err(|e| {
            log::warn!("[{}] {}", request_id, e);
        })?;

        let vector = FeatureAssembler::new(&self.schema, self.bundle().feature_order()).assemble(&request);
        let raw = self.engine.infer(vector).inspect_err(|e| {
            log::error!("[{}] Inference failed: {}", request_id, e);
        })?;
        let response = self.labels.to_response(&raw);

        log::debug!(
            "[{}] Predicted class {} ({})",
            request_id,
            raw.class_index,
            response.prediction
        );
        Ok(response)
    }
}

/// Labels declared by the feature metadata win; otherwise the seven cover types,
/// based at the first class the classifier declares.
fn label_mapper(bundle: &ArtifactBundle) -> LabelMapper {
    let metadata = bundle.metadata();
    let base = metadata
        .label_base
        .or_else(|| bundle.classifier().classes().first().copied())
        .unwrap_or(1);
    let mapper = match &metadata.class_labels {
        Some(labels) => LabelMapper::new(labels.clone(), base),
        None => LabelMapper::cover_types(base),
    };
    mapper.with_classes(bundle.classifier().classes())
}

/// Shared by every worker. Set once at startup and never changed.
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<Predictor>),
    Unavailable(Arc<str>),
}

impl ModelState {
    pub fn from_load(result: Result<Predictor, ArtifactError>) -> Self {
        match result {
            Ok(predictor) => {
                log::info!("Model and scaler loaded successfully.");
                ModelState::Ready(Arc::new(predictor))
            }
            Err(e) => {
                log::error!("Failed to load model artifacts, serving without a model: {}", e);
                ModelState::Unavailable(e.to_string().into())
            }
        }
    }

    pub fn predictor(&self) -> Result<&Predictor, PredictionError> {
        match self {
            ModelState::Ready(predictor) => Ok(predictor.as_ref()),
            ModelState::Unavailable(_) => Err(PredictionError::ModelUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::artifacts::FeatureMetadata;
    use crate::test_support::{
        fixed_classifier, fixture_bundle, fixture_classifier, fixture_scaler, forest_feature_order, sample_body,
    };
    use serde_json::json;

    fn predictor() -> Predictor {
        Predictor::new(RequestSchema::forest_cover(), fixture_bundle()).unwrap()
    }

    #[test]
    fn reference_request_predicts_lodgepole_pine() {
        let response = predictor().predict(&sample_body()).unwrap();
        assert_eq!(response.prediction, "Lodgepole Pine");
        assert_eq!(response.probabilities.len(), 7);
        assert_eq!(response.probabilities[0].cover_type, "Spruce/Fir");
        let total: f64 = response.probabilities.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn prediction_does_not_depend_on_field_order() {
        let predictor = predictor();
        let forward = sample_body();
        let reversed: Map<String, Value> = forward.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(reversed.keys().next().map(String::as_str), Some("Soil_Type10"));
        assert_ne!(forward.keys().next(), reversed.keys().next());
        assert_eq!(
            predictor.predict(&forward).unwrap(),
            predictor.predict(&reversed).unwrap()
        );
    }

    #[test]
    fn invalid_request_never_reaches_the_model() {
        let mut body = sample_body();
        body.insert("Slope".into(), json!("3 degrees"));
        assert!(matches!(
            predictor().predict(&body),
            Err(PredictionError::ValidationFailed(_))
        ));
    }

    #[test]
    fn required_field_absent_from_feature_order_fails_at_load() {
        let order: Vec<String> = forest_feature_order()
            .into_iter()
            .filter(|name| name != "Hillshade_Noon")
            .collect();
        let bundle = ArtifactBundle::new(
            fixture_classifier(&order, vec![1, 2, 3, 4, 5, 6, 7]),
            fixture_scaler(&["Elevation", "Slope"]),
            FeatureMetadata::from_order(order),
        )
        .unwrap();

        assert!(matches!(
            Predictor::new(RequestSchema::forest_cover(), bundle),
            Err(ArtifactError::MissingRequiredFeature(name)) if name == "Hillshade_Noon"
        ));
    }

    #[test]
    fn zero_based_classifier_uses_zero_based_labels() {
        let order = forest_feature_order();
        let bundle = ArtifactBundle::new(
            fixture_classifier(&order, vec![0, 1, 2, 3, 4, 5, 6]),
            fixture_scaler(&["Elevation"]),
            FeatureMetadata::from_order(order),
        )
        .unwrap();
        let predictor = Predictor::new(RequestSchema::forest_cover(), bundle).unwrap();

        assert_eq!(predictor.labels().base(), 0);
        let response = predictor.predict(&sample_body()).unwrap();
        assert_eq!(response.prediction, "Lodgepole Pine");
        assert!(response.probabilities.iter().all(|p| p.cover_type != UNKNOWN_LABEL));
    }

    #[test]
    fn gapped_classes_keep_prediction_and_probabilities_consistent() {
        let order = forest_feature_order();
        let bundle = ArtifactBundle::new(
            fixed_classifier(order.len(), vec![1, 2, 3, 5, 6, 7], vec![0.004, 0.004, 0.004, 0.98, 0.004, 0.004]),
            fixture_scaler(&["Elevation"]),
            FeatureMetadata::from_order(order),
        )
        .unwrap();
        let predictor = Predictor::new(RequestSchema::forest_cover(), bundle).unwrap();

        let response = predictor.predict(&sample_body()).unwrap();
        let top = response
            .probabilities
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
            .unwrap();
        assert_eq!(response.prediction, "Aspen");
        assert_eq!(top.cover_type, response.prediction);
        assert!(response.probabilities.iter().all(|p| p.cover_type != "Cottonwood/Willow"));
    }

    #[test]
    fn unavailable_state_fails_fast() {
        let state = ModelState::from_load(Err(ArtifactError::Invalid("truncated".into())));
        assert!(matches!(state.predictor(), Err(PredictionError::ModelUnavailable)));
    }
}
