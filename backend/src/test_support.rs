use serde_json::{Map, Value, json};

use crate::features::schema::CONTINUOUS_FIELDS;
use crate::inference::artifacts::{ArtifactBundle, FeatureMetadata};
use crate::inference::InferenceError;
use crate::inference::classifier::{Classifier, SoftmaxLinear, SoftmaxLinearArtifact};
use crate::inference::scaler::{Scaler, StandardScaler};

/// The column layout of the reference model: continuous measurements,
/// wilderness areas, then the soil types it was trained with.
pub fn forest_feature_order() -> Vec<String> {
    let soil = [1, 2, 10, 22, 23, 29, 32, 38];
    CONTINUOUS_FIELDS
        .iter()
        .map(|name| name.to_string())
        .chain((1..=4).map(|i| format!("Wilderness_Area{}", i)))
        .chain(soil.iter().map(|i| format!("Soil_Type{}", i)))
        .collect()
}

pub fn sample_body() -> Map<String, Value> {
    let body = json!({
        "Elevation": 2596, "Aspect": 51, "Slope": 3,
        "Horizontal_Distance_To_Hydrology": 258, "Vertical_Distance_To_Hydrology": 0,
        "Horizontal_Distance_To_Roadways": 510, "Hillshade_9am": 221,
        "Hillshade_Noon": 232, "Hillshade_3pm": 148,
        "Horizontal_Distance_To_Fire_Points": 6279, "Soil_Type10": 1
    });
    match body {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Softmax model whose second class is driven by Soil_Type10, with a mild
/// pull from scaled Elevation towards the first class.
pub fn fixture_classifier(order: &[String], classes: Vec<i64>) -> Box<dyn Classifier> {
    let width = order.len();
    let mut coefficients = vec![vec![0.0; width]; classes.len()];
    if let Some(elevation) = order.iter().position(|name| name == "Elevation") {
        coefficients[0][elevation] = 0.5;
    }
    if let Some(soil) = order.iter().position(|name| name == "Soil_Type10") {
        coefficients[1][soil] = 5.0;
    }
    let intercepts = vec![0.0; classes.len()];
    Box::new(
        SoftmaxLinear::try_from(SoftmaxLinearArtifact {
            classes,
            coefficients,
            intercepts,
        })
        .unwrap(),
    )
}

/// Reports the same distribution for every input.
struct FixedClassifier {
    classes: Vec<i64>,
    width: usize,
    probabilities: Vec<f64>,
}

impl Classifier for FixedClassifier {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.width
    }

    fn predict_probabilities(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        Ok(self.probabilities.clone())
    }
}

pub fn fixed_classifier(width: usize, classes: Vec<i64>, probabilities: Vec<f64>) -> Box<dyn Classifier> {
    Box::new(FixedClassifier {
        classes,
        width,
        probabilities,
    })
}

pub fn fixture_scaler(names: &[&str]) -> Box<dyn Scaler> {
    Box::new(StandardScaler {
        feature_names: names.iter().map(|name| name.to_string()).collect(),
        mean: vec![2800.0; names.len()],
        scale: vec![250.0; names.len()],
    })
}

pub fn fixture_bundle() -> ArtifactBundle {
    let order = forest_feature_order();
    ArtifactBundle::new(
        fixture_classifier(&order, (1..=7).collect()),
        fixture_scaler(&CONTINUOUS_FIELDS),
        FeatureMetadata::from_order(order),
    )
    .unwrap()
}
