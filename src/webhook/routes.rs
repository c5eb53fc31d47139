//! WhatsApp webhook endpoint handlers
//!
//! The verification endpoint (GET) answers the platform's subscription
//! handshake, the receiver (POST) acknowledges event deliveries.

use super::{handler, schemas::VerifyQuery};
use crate::front::AppState;
use ntex::{util::Bytes, web};
use std::collections::HashMap;

/// Webhook verification endpoint (GET)
///
/// # Returns
/// - 200 with the challenge as plain text if verification succeeds
/// - 403 with an empty body otherwise
#[web::get("")]
pub async fn verify(
    query: web::types::Query<HashMap<String, String>>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let challenge = handler::verify_subscription(
        &VerifyQuery::from_params(&query),
        &app_state.config.webhook_verify_token,
    )?;

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(challenge))
}

/// Webhook receiver endpoint (POST)
///
/// Events are handled before answering; the platform allows 20 seconds.
#[web::post("")]
pub async fn receive(
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    handler::ingest_event(&body, &app_state.webhook_handler).await?;

    Ok(web::HttpResponse::Ok().content_type("text/plain").body("OK"))
}
