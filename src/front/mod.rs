pub mod business;
pub mod errors;
pub mod routes;
pub mod server;
pub mod setup;

use crate::{config::AppConfig, repo, services, webhook};
use ntex::util::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::Instant;

/// Shared services handed to every ntex worker
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: repo::ImplAccountRepo,
    pub graph: services::ImplGraphService,
    pub webhook_handler: webhook::handler::ImplWebhookEventHandler,
}

impl AppState {
    /// Deadline for an onboarding run starting now, `None` when disabled
    pub fn onboarding_deadline(&self) -> Option<Instant> {
        let budget = self.config.onboarding_deadline();
        (!budget.is_zero()).then(|| Instant::now() + budget)
    }
}

/// Decodes a JSON request body, any failure becomes "Invalid request body"
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, errors::ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        logfire::warn!("Invalid request body: {error}", error = e.to_string());
        errors::ApiError::invalid_body()
    })
}
