pub mod graph;

use crate::models::graph::{AccessToken, RemoteBusinessAccount, RemotePhoneNumber, Template};
use async_trait::async_trait;
use std::sync::Arc;

/// Outbound calls against the Meta Graph API.
///
/// Every call except [`GraphService::exchange_token`] authenticates with the
/// access token produced by the exchange.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Trades an authorization code for an access token, trying the
    /// `redirect_uri` variants the platform accepts in order.
    async fn exchange_token(&self, code: &str, redirect_uri: &str)
    -> anyhow::Result<AccessToken>;

    /// Business accounts visible to the token. Empty when the platform has
    /// not listed the freshly created account yet.
    async fn get_business_accounts(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Vec<RemoteBusinessAccount>>;

    async fn get_phone_numbers(
        &self,
        access_token: &str,
        waba_id: &str,
    ) -> anyhow::Result<Vec<RemotePhoneNumber>>;

    async fn validate_token(&self, access_token: &str) -> anyhow::Result<bool>;

    async fn subscribe_webhooks(&self, access_token: &str, waba_id: &str) -> anyhow::Result<()>;

    async fn get_business_profile(
        &self,
        access_token: &str,
        phone_number_id: &str,
    ) -> anyhow::Result<serde_json::Map<String, serde_json::Value>>;

    /// All templates of the account, every page followed.
    async fn list_templates(&self, access_token: &str, waba_id: &str)
    -> anyhow::Result<Vec<Template>>;

    /// Sends a plain text message and returns the platform message ids.
    async fn send_text_message(
        &self,
        access_token: &str,
        phone_number_id: &str,
        to: &str,
        body: &str,
    ) -> anyhow::Result<Vec<String>>;
}

pub type ImplGraphService = Arc<dyn GraphService>;
