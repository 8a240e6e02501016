use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::classifier::{Classifier, ClassifierArtifact};
use super::scaler::{Scaler, ScalerArtifact};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{name} artifact not found at {}", .path.display())]
    Missing { name: &'static str, path: PathBuf },
    #[error("failed to read {name} artifact: {source}")]
    Io {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} artifact is corrupt: {source}")]
    Corrupt {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid artifact: {0}")]
    Invalid(String),
    #[error("feature '{0}' appears more than once in feature_order")]
    DuplicateFeature(String),
    #[error("classifier expects {classifier} features but feature_order declares {declared}")]
    WidthMismatch { classifier: usize, declared: usize },
    #[error("scaler feature '{0}' is not part of feature_order")]
    UnknownScalerFeature(String),
    #[error("required request field '{0}' is not part of feature_order")]
    MissingRequiredFeature(String),
}

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    pub features: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureMetadataFile {
    Order(Vec<String>),
    Described {
        feature_order: Vec<String>,
        #[serde(default)]
        class_labels: Option<BTreeMap<String, String>>,
        #[serde(default)]
        label_base: Option<i64>,
    },
}

/// The side-channel artifact describing how the classifier was trained.
#[derive(Debug, Clone, Default)]
pub struct FeatureMetadata {
    pub feature_order: Vec<String>,
    pub class_labels: Option<BTreeMap<i64, String>>,
    pub label_base: Option<i64>,
}

impl FeatureMetadata {
    pub fn from_order(feature_order: Vec<String>) -> Self {
        Self {
            feature_order,
            ..Default::default()
        }
    }
}

impl TryFrom<FeatureMetadataFile> for FeatureMetadata {
    type Error = ArtifactError;

    fn try_from(file: FeatureMetadataFile) -> Result<Self, Self::Error> {
        match file {
            FeatureMetadataFile::Order(feature_order) => Ok(FeatureMetadata::from_order(feature_order)),
            FeatureMetadataFile::Described {
                feature_order,
                class_labels,
                label_base,
            } => Ok(FeatureMetadata {
                feature_order,
                class_labels: class_labels.map(parse_class_labels).transpose()?,
                label_base,
            }),
        }
    }
}

/// JSON object keys are strings; class labels are keyed by integer class.
fn parse_class_labels(labels: BTreeMap<String, String>) -> Result<BTreeMap<i64, String>, ArtifactError> {
    labels
        .into_iter()
        .map(|(key, label)| match key.trim().parse::<i64>() {
            Ok(class) => Ok((class, label)),
            Err(_) => Err(ArtifactError::Invalid(format!(
                "class_labels key '{}' is not an integer class",
                key
            ))),
        })
        .collect()
}

/// Classifier, scaler and feature contract, loaded once and never mutated.
pub struct ArtifactBundle {
    classifier: Box<dyn Classifier>,
    scaler: Box<dyn Scaler>,
    metadata: FeatureMetadata,
    digests: BTreeMap<&'static str, String>,
    loaded_at: DateTime<Utc>,
}

impl ArtifactBundle {
    pub fn new(
        classifier: Box<dyn Classifier>,
        scaler: Box<dyn Scaler>,
        metadata: FeatureMetadata,
    ) -> Result<Self, ArtifactError> {
        let mut seen = HashSet::new();
        for name in &metadata.feature_order {
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::DuplicateFeature(name.clone()));
            }
        }
        if classifier.n_features() != metadata.feature_order.len() {
            return Err(ArtifactError::WidthMismatch {
                classifier: classifier.n_features(),
                declared: metadata.feature_order.len(),
            });
        }
        if let Some(unknown) = scaler.feature_names().iter().find(|name| !seen.contains(name.as_str())) {
            return Err(ArtifactError::UnknownScalerFeature(unknown.clone()));
        }

        Ok(Self {
            classifier,
            scaler,
            metadata,
            digests: BTreeMap::new(),
            loaded_at: Utc::now(),
        })
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let (classifier, classifier_digest) = read_artifact::<ClassifierArtifact>("classifier", &paths.classifier)?;
        let (scaler, scaler_digest) = read_artifact::<ScalerArtifact>("scaler", &paths.scaler)?;
        let (metadata, features_digest) = read_artifact::<FeatureMetadataFile>("features", &paths.features)?;

        let mut bundle = Self::new(
            classifier.into_classifier()?,
            scaler.into_scaler()?,
            metadata.try_into()?,
        )?;
        bundle.digests.insert("classifier", classifier_digest);
        bundle.digests.insert("scaler", scaler_digest);
        bundle.digests.insert("features", features_digest);

        log::info!(
            "Loaded artifacts: {} features, {} classes, {} scaled columns",
            bundle.feature_order().len(),
            bundle.classifier.classes().len(),
            bundle.scaler.feature_names().len()
        );
        for (name, digest) in &bundle.digests {
            log::info!("  {} sha256={}", name, digest);
        }
        Ok(bundle)
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn feature_order(&self) -> &[String] {
        &self.metadata.feature_order
    }

    pub fn metadata(&self) -> &FeatureMetadata {
        &self.metadata
    }

    pub fn digests(&self) -> &BTreeMap<&'static str, String> {
        &self.digests
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Reads and parses one artifact; the file is closed before parsing starts.
fn read_artifact<T: DeserializeOwned>(name: &'static str, path: &Path) -> Result<(T, String), ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ArtifactError::Missing {
            name,
            path: path.to_path_buf(),
        },
        _ => ArtifactError::Io { name, source },
    })?;
    let digest = hex::encode(Sha256::digest(&bytes));
    let parsed = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Corrupt { name, source })?;
    Ok((parsed, digest))
}
