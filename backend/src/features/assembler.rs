use std::collections::HashMap;

use super::schema::{RequestSchema, ValidatedRequest};

/// Model input in `feature_order` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Lays a validated request out in the exact column order the classifier was
/// trained on. Never reorders `feature_order`.
pub struct FeatureAssembler<'a> {
    schema: &'a RequestSchema,
    feature_order: &'a [String],
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(schema: &'a RequestSchema, feature_order: &'a [String]) -> Self {
        Self {
            schema,
            feature_order,
        }
    }

    pub fn assemble(&self, request: &ValidatedRequest) -> FeatureVector {
        let mut by_name: HashMap<&str, f64> = request
            .values()
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        for field in self.schema.indicators() {
            if let Some(default) = field.default_value() {
                by_name.entry(field.name.as_str()).or_insert(default);
            }
        }

        // Names the schema does not know (and the caller did not send) are
        // zero-filled; required fields were checked against feature_order at load.
        self.feature_order
            .iter()
            .map(|name| by_name.get(name.as_str()).copied().unwrap_or(0.0))
            .collect::<Vec<_>>()
            .into()
    }
}
