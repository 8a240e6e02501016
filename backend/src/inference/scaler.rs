use serde::Deserialize;

use super::InferenceError;
use crate::inference::artifacts::ArtifactError;

/// A fitted per-column transform. Only the columns named by `feature_names`
/// are ever passed to `transform`, in that order.
pub trait Scaler: Send + Sync {
    fn feature_names(&self) -> &[String];
    fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// On-disk scaler description, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl ScalerArtifact {
    pub fn into_scaler(self) -> Result<Box<dyn Scaler>, ArtifactError> {
        match self {
            ScalerArtifact::Standard(scaler) => {
                scaler.check()?;
                Ok(Box::new(scaler))
            }
            ScalerArtifact::MinMax(scaler) => {
                scaler.check()?;
                Ok(Box::new(scaler))
            }
        }
    }
}

/// `(x - mean) / scale`, with a zero scale treated as 1.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn check(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "standard scaler declares {} features but has {} means and {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_width(values, self.feature_names.len())?;
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

/// Rescales each column from `[data_min, data_max]` onto `feature_range`.
#[derive(Debug, Clone, Deserialize)]
pub struct MinMaxScaler {
    pub feature_names: Vec<String>,
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    pub feature_range: [f64; 2],
}

impl MinMaxScaler {
    fn check(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if self.data_min.len() != n || self.data_max.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "min-max scaler declares {} features but has {} minimums and {} maximums",
                n,
                self.data_min.len(),
                self.data_max.len()
            )));
        }
        if self.feature_range[0] >= self.feature_range[1] {
            return Err(ArtifactError::Invalid(format!(
                "min-max scaler feature_range {:?} is empty",
                self.feature_range
            )));
        }
        Ok(())
    }
}

impl Scaler for MinMaxScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_width(values, self.feature_names.len())?;
        let [low, high] = self.feature_range;
        Ok(values
            .iter()
            .zip(self.data_min.iter().zip(&self.data_max))
            .map(|(x, (min, max))| {
                let range = if max == min { 1.0 } else { max - min };
                (x - min) / range * (high - low) + low
            })
            .collect())
    }
}

fn check_width(values: &[f64], expected: usize) -> Result<(), InferenceError> {
    if values.len() != expected {
        return Err(InferenceError::WidthMismatch {
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn standard_scaler_centers_and_scales() {
        let scaler = StandardScaler {
            feature_names: names(&["Elevation", "Slope"]),
            mean: vec![2800.0, 10.0],
            scale: vec![200.0, 0.0],
        };
        let out = scaler.transform(&[3000.0, 14.0]).unwrap();
        assert_eq!(out, vec![1.0, 4.0]);
    }

    #[test]
    fn min_max_scaler_maps_onto_range() {
        let scaler = MinMaxScaler {
            feature_names: names(&["Hillshade_9am", "Aspect"]),
            data_min: vec![0.0, 0.0],
            data_max: vec![254.0, 360.0],
            feature_range: [-1.0, 1.0],
        };
        let out = scaler.transform(&[127.0, 360.0]).unwrap();
        assert!((out[0] - 0.0).abs() < 1e-12);
        assert!((out[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn transform_rejects_wrong_width() {
        let scaler = StandardScaler {
            feature_names: names(&["Elevation"]),
            mean: vec![0.0],
            scale: vec![1.0],
        };
        let err = scaler.transform(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, InferenceError::WidthMismatch { expected: 1, found: 2 }));
    }

    #[test]
    fn artifact_parses_by_kind() {
        let json = r#"{"kind": "min_max", "feature_names": ["Slope"], "data_min": [0], "data_max": [66]}"#;
        let artifact: ScalerArtifact = serde_json::from_str(json).unwrap();
        let scaler = artifact.into_scaler().unwrap();
        assert_eq!(scaler.feature_names(), ["Slope".to_string()]);
        assert_eq!(scaler.transform(&[33.0]).unwrap(), vec![0.5]);
    }

    #[test]
    fn artifact_with_mismatched_lengths_is_invalid() {
        let json = r#"{"kind": "standard", "feature_names": ["Elevation", "Slope"], "mean": [1.0], "scale": [1.0, 1.0]}"#;
        let artifact: ScalerArtifact = serde_json::from_str(json).unwrap();
        assert!(matches!(artifact.into_scaler(), Err(ArtifactError::Invalid(_))));
    }
}
