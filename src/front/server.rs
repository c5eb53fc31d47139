use super::errors;
use chrono::{SecondsFormat, Utc};
use ntex::web;
use serde_json::json;

/// Liveness probe
#[web::get("/health")]
pub async fn health() -> impl web::Responder {
    web::HttpResponse::Ok().json(&json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

pub async fn serve_not_found() -> Result<web::HttpResponse, web::Error> {
    Err(errors::ApiError::NotFound("Not found".to_string()).into())
}
