use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::{ErrorResponse, FieldError};

use crate::features::schema::ValidationError;
use crate::inference::InferenceError;

/// Everything a `/predict` call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Model or scaler not loaded.")]
    ModelUnavailable,
    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),
    #[error("An error occurred during prediction: {0}")]
    InferenceFailed(#[from] InferenceError),
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictionError::ModelUnavailable | PredictionError::InferenceFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            PredictionError::ValidationFailed(validation) => validation
                .issues
                .iter()
                .map(|issue| FieldError {
                    field: issue.field.clone(),
                    problem: issue.problem.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
            errors,
        })
    }
}
