//! # Templates API Module
//!
//! Message template listing for a freshly issued authorization code.

use super::within_deadline;
use crate::{
    front::errors::ApiError,
    models::{
        graph::{AccessToken, Template},
        setup::AuthCodeRequest,
    },
    services,
};
use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Debug)]
pub struct TemplatesOutcome {
    pub templates: Vec<Template>,
    pub token: AccessToken,
    pub token_created_at: DateTime<Utc>,
}

/// Exchanges the code and lists every template of `waba_id`.
///
/// The request's `redirect_uri` is used as-is; when absent only the
/// redirect-less exchange strategies are tried.
pub async fn fetch_templates(
    graph: &services::ImplGraphService,
    request: &AuthCodeRequest,
    deadline: Option<Instant>,
) -> Result<TemplatesOutcome, ApiError> {
    let code = request.authorization_code.trim();
    if code.is_empty() {
        return Err(ApiError::Validation(
            "Authorization code is required".to_string(),
        ));
    }
    let Some(waba_id) = request.waba_id() else {
        return Err(ApiError::Validation("WABA ID is required".to_string()));
    };

    let token = within_deadline(
        deadline,
        "exchanging the authorization code",
        graph.exchange_token(code, request.redirect_uri().unwrap_or_default()),
    )
    .await?
    .map_err(|e| ApiError::Upstream {
        detail: format!("Token exchange failed: {e:#}"),
        caller_input: true,
    })?;
    let token_created_at = Utc::now();

    let templates = within_deadline(
        deadline,
        "fetching templates",
        graph.list_templates(&token.access_token, waba_id),
    )
    .await?
    .map_err(|e| ApiError::Upstream {
        detail: format!("Failed to fetch templates: {e:#}"),
        caller_input: false,
    })?;

    logfire::info!(
        "Fetched {count} templates for waba {waba_id}",
        count = templates.len() as i64,
        waba_id = waba_id.to_string()
    );

    Ok(TemplatesOutcome {
        templates,
        token,
        token_created_at,
    })
}
