use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::{Map, Value, json};
use shared::RootMessage;

use crate::error::PredictionError;
use crate::features::schema::{FieldKind, RequestSchema, ValidationError};
use crate::predictor::ModelState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(read_root)))
        .service(web::resource("/predict").route(web::post().to(predict_forest_cover)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/schema").route(web::get().to(describe_schema)));
}

async fn read_root() -> HttpResponse {
    HttpResponse::Ok().json(RootMessage {
        message: "Welcome to the EcoSim Prediction API!".into(),
    })
}

/// The model check comes before body parsing so an unavailable service
/// answers every request the same way.
async fn predict_forest_cover(
    state: web::Data<ModelState>,
    body: web::Bytes,
) -> Result<HttpResponse, PredictionError> {
    let predictor = state.predictor()?;
    let payload = parse_object(&body)?;
    let response = predictor.predict(&payload)?;
    Ok(HttpResponse::Ok().json(response))
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::invalid_body("request body must be a JSON object")),
        Err(e) => Err(ValidationError::invalid_body(format!("malformed JSON: {}", e))),
    }
}

async fn health(state: web::Data<ModelState>) -> HttpResponse {
    match state.get_ref() {
        ModelState::Ready(predictor) => {
            let bundle = predictor.bundle();
            HttpResponse::Ok().json(json!({
                "status": "ready",
                "features": bundle.feature_order().len(),
                "classes": bundle.classifier().classes(),
                "label_base": predictor.labels().base(),
                "loaded_at": bundle.loaded_at(),
                "artifacts": bundle.digests(),
            }))
        }
        ModelState::Unavailable(reason) => HttpResponse::ServiceUnavailable().json(json!({
            "status": "unavailable",
            "detail": reason.to_string(),
        })),
    }
}

#[derive(Serialize)]
struct FieldDescription<'a> {
    name: &'a str,
    kind: FieldKind,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<f64>,
}

#[derive(Serialize)]
struct SchemaDescription<'a> {
    fields: Vec<FieldDescription<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_order: Option<&'a [String]>,
}

async fn describe_schema(state: web::Data<ModelState>) -> HttpResponse {
    let fallback;
    let (schema, feature_order) = match state.get_ref() {
        ModelState::Ready(predictor) => (predictor.schema(), Some(predictor.bundle().feature_order())),
        ModelState::Unavailable(_) => {
            fallback = RequestSchema::forest_cover();
            (&fallback, None)
        }
    };

    let fields = schema
        .fields()
        .iter()
        .map(|field| FieldDescription {
            name: &field.name,
            kind: field.kind,
            required: field.required(),
            default: field.default_value(),
        })
        .collect();
    HttpResponse::Ok().json(SchemaDescription { fields, feature_order })
}
