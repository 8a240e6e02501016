use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Continuous cartographic measurements; every request must carry them.
pub const CONTINUOUS_FIELDS: [&str; 10] = [
    "Elevation",
    "Aspect",
    "Slope",
    "Horizontal_Distance_To_Hydrology",
    "Vertical_Distance_To_Hydrology",
    "Horizontal_Distance_To_Roadways",
    "Hillshade_9am",
    "Hillshade_Noon",
    "Hillshade_3pm",
    "Horizontal_Distance_To_Fire_Points",
];

pub const WILDERNESS_AREAS: usize = 4;
pub const SOIL_TYPES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Required, no default.
    Continuous,
    /// One-hot 0/1 flag, optional, defaults to 0.
    Indicator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Continuous,
        }
    }

    pub fn indicator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Indicator,
        }
    }

    pub fn required(&self) -> bool {
        self.kind == FieldKind::Continuous
    }

    pub fn default_value(&self) -> Option<f64> {
        match self.kind {
            FieldKind::Continuous => None,
            FieldKind::Indicator => Some(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    NotNumeric(&'static str),
    InvalidBody(String),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing => write!(f, "field required"),
            Problem::NotNumeric(found) => write!(f, "expected a number, found {}", found),
            Problem::InvalidBody(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub problem: Problem,
}

/// Every problem found in one request, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Request validation failed: {}", describe(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue {
                field: "body".into(),
                problem: Problem::InvalidBody(reason.into()),
            }],
        }
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.problem))
        .collect::<Vec<_>>()
        .join("; ")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Request values that passed validation. Holds only what the caller sent:
/// declared fields plus any numeric extras; defaults are applied during assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRequest {
    values: HashMap<String, f64>,
}

impl ValidatedRequest {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn values(&self) -> &HashMap<String, f64> {
        &self.values
    }
}

/// The accepted input fields and how each one is validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSchema {
    fields: Vec<FieldSpec>,
}

impl RequestSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Covertype layout: ten continuous measurements, four wilderness-area
    /// indicators and forty soil-type indicators.
    pub fn forest_cover() -> Self {
        let continuous = CONTINUOUS_FIELDS.iter().map(|name| FieldSpec::continuous(*name));
        let wilderness = (1..=WILDERNESS_AREAS).map(|i| FieldSpec::indicator(format!("Wilderness_Area{}", i)));
        let soil = (1..=SOIL_TYPES).map(|i| FieldSpec::indicator(format!("Soil_Type{}", i)));
        Self::new(continuous.chain(wilderness).chain(soil).collect())
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.required())
    }

    pub fn indicators(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.kind == FieldKind::Indicator)
    }

    pub fn validate(&self, body: &Map<String, Value>) -> Result<ValidatedRequest, ValidationError> {
        let mut issues = Vec::new();
        let mut values = HashMap::with_capacity(body.len());

        for field in &self.fields {
            match body.get(&field.name) {
                Some(Value::Number(number)) => {
                    if let Some(value) = number.as_f64() {
                        values.insert(field.name.clone(), value);
                    }
                }
                Some(other) => issues.push(FieldIssue {
                    field: field.name.clone(),
                    problem: Problem::NotNumeric(json_type(other)),
                }),
                None if field.required() => issues.push(FieldIssue {
                    field: field.name.clone(),
                    problem: Problem::Missing,
                }),
                None => {}
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        for (name, value) in body {
            if self.field(name).is_some() {
                continue;
            }
            match value.as_f64() {
                Some(value) => {
                    values.insert(name.clone(), value);
                }
                None => log::debug!("Ignoring non-numeric undeclared field '{}'", name),
            }
        }

        Ok(ValidatedRequest { values })
    }
}
