use std::path::PathBuf;

use serde::Deserialize;

use crate::inference::artifacts::ArtifactPaths;

const MODELS_DIR: &str = "project_outputs/forest_cover/models";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub classifier_path: PathBuf,
    pub scaler_path: PathBuf,
    pub features_path: PathBuf,
    pub bind_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            classifier_path: PathBuf::from(MODELS_DIR).join("model.json"),
            scaler_path: PathBuf::from(MODELS_DIR).join("scaler.json"),
            features_path: PathBuf::from(MODELS_DIR).join("features.json"),
            bind_host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "https://ecosim.onrender.com".to_string(),
            ],
        }
    }
}

impl ServiceConfig {
    /// Optional YAML file named by `ECOSIM_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("ECOSIM_CONFIG") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                log::info!("Using config file {}", path);
                Self::from_yaml_str(&contents)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ECOSIM_CLASSIFIER_PATH") {
            self.classifier_path = path.into();
        }
        if let Some(path) = lookup("ECOSIM_SCALER_PATH") {
            self.scaler_path = path.into();
        }
        if let Some(path) = lookup("ECOSIM_FEATURES_PATH") {
            self.features_path = path.into();
        }
        if let Some(host) = lookup("ECOSIM_BIND_HOST") {
            self.bind_host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value: port.clone() })?;
        }
        if let Some(origins) = lookup("ECOSIM_ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            classifier: self.classifier_path.clone(),
            scaler: self.scaler_path.clone(),
            features: self.features_path.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_model_outputs() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(
            config.artifact_paths().scaler,
            PathBuf::from("project_outputs/forest_cover/models/scaler.json")
        );
        assert_eq!(config.allowed_origins.len(), 3);
    }

    #[test]
    fn yaml_fills_unspecified_fields_with_defaults() {
        let config = ServiceConfig::from_yaml_str("port: 9100\nclassifier_path: /srv/model/xgb.json\n").unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.classifier_path, PathBuf::from("/srv/model/xgb.json"));
        assert_eq!(config.bind_host, "0.0.0.0");
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = ServiceConfig::from_yaml_str("port: 9100\n").unwrap();
        config
            .apply_overrides(env(&[
                ("PORT", "8081"),
                ("ECOSIM_FEATURES_PATH", "/tmp/features.json"),
                ("ECOSIM_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ]))
            .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.features_path, PathBuf::from("/tmp/features.json"));
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = ServiceConfig::default();
        let err = config.apply_overrides(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "PORT", .. }));
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(matches!(
            ServiceConfig::from_yaml_str("port: [1, 2]"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
