mod config;
mod error;
mod features;
mod inference;
mod labels;
mod predictor;
mod routes;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::ServiceConfig;
use features::schema::RequestSchema;
use predictor::{ModelState, Predictor};
use routes::configure_routes;
use std::env;

fn cors_policy(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = ServiceConfig::load().map_err(|e| {
        log::error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // A failed load is not fatal: the service starts and /predict answers 500.
    let state = ModelState::from_load(Predictor::load(
        &config.artifact_paths(),
        RequestSchema::forest_cover(),
    ));
    let state = web::Data::new(state);

    let bind_address = config.bind_address();
    let allowed_origins = config.allowed_origins.clone();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_policy(&allowed_origins))
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
