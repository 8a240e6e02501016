use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Label reported when the model emits a class the service has no name for.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// The seven forest-cover classes of the reference deployment, in class-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize)]
pub enum CoverType {
    #[strum(serialize = "Spruce/Fir")]
    #[serde(rename = "Spruce/Fir")]
    SpruceFir,
    #[strum(serialize = "Lodgepole Pine")]
    #[serde(rename = "Lodgepole Pine")]
    LodgepolePine,
    #[strum(serialize = "Ponderosa Pine")]
    #[serde(rename = "Ponderosa Pine")]
    PonderosaPine,
    #[strum(serialize = "Cottonwood/Willow")]
    #[serde(rename = "Cottonwood/Willow")]
    CottonwoodWillow,
    #[strum(serialize = "Aspen")]
    Aspen,
    #[strum(serialize = "Douglas-fir")]
    #[serde(rename = "Douglas-fir")]
    DouglasFir,
    #[strum(serialize = "Krummholz")]
    Krummholz,
}

impl CoverType {
    /// 1-based class code used by the Covertype dataset.
    pub fn code(self) -> i64 {
        match self {
            CoverType::SpruceFir => 1,
            CoverType::LodgepolePine => 2,
            CoverType::PonderosaPine => 3,
            CoverType::CottonwoodWillow => 4,
            CoverType::Aspen => 5,
            CoverType::DouglasFir => 6,
            CoverType::Krummholz => 7,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassProbability {
    #[serde(rename = "type")]
    pub cover_type: String,
    pub probability: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub prediction: String,
    pub probabilities: Vec<ClassProbability>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub problem: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RootMessage {
    pub message: String,
}
