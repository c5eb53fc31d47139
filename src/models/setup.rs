//! Request and response bodies of the onboarding API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{
    account::Account,
    graph::{AccessToken, Template},
};
use crate::consts;

/// Body sent by the embedded signup frontend.
///
/// `waba_id`, `phone_number_id` and `business_id` come from the `message`
/// event the signup popup posts to the frontend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthCodeRequest {
    #[serde(default)]
    pub authorization_code: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub waba_id: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub business_id: Option<String>,
}

impl AuthCodeRequest {
    pub fn redirect_uri(&self) -> Option<&str> {
        non_empty(&self.redirect_uri)
    }

    pub fn waba_id(&self) -> Option<&str> {
        non_empty(&self.waba_id)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Token details shown by the frontend after a code exchange
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub access_token_length: usize,
    pub access_token_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_access_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub token_created_at: String,
}

impl TokenInfo {
    pub fn new(token: &AccessToken, created_at: DateTime<Utc>, expose_full_token: bool) -> Self {
        Self {
            access_token_length: token.access_token.len(),
            access_token_preview: token_preview(&token.access_token),
            full_access_token: expose_full_token.then(|| token.access_token.clone()),
            token_type: token.token_type.clone(),
            expires_in: token.expires_in,
            token_created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// First characters of a token followed by an ellipsis
pub fn token_preview(token: &str) -> String {
    let preview: String = token.chars().take(consts::TOKEN_PREVIEW_CHARS).collect();
    format!("{preview}...")
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_info: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_info: Option<TokenInfo>,
}

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub success: bool,
    pub templates: Vec<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_info: Option<TokenInfo>,
}

/// Body for sending a text message from an onboarded account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestMessageRequest {
    #[serde(default)]
    pub waba_id: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TestMessageResponse {
    pub success: bool,
    pub message_ids: Vec<String>,
}
