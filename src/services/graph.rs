//! # Graph API Client
//!
//! reqwest based implementation of [`GraphService`]. The base URL carries the
//! API version (`https://graph.facebook.com/v23.0` by default) so tests can
//! point the client at a local mock server.

use super::GraphService;
use crate::{
    config::AppConfig,
    consts, metric,
    models::graph::{
        AccessToken, GraphErrorEnvelope, GraphIdentity, GraphList, MessageSendResponse,
        OutgoingTextMessage, RemoteBusinessAccount, RemotePhoneNumber, Template,
        WebhookSubscription,
    },
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

/// Ways of sending `redirect_uri` on the code exchange, in the order they are tried.
///
/// Codes issued by the embedded signup popup are usually bound to no redirect
/// at all, while codes from a regular OAuth dialog must echo the exact URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectUriStrategy {
    Omit,
    Empty,
    Provided,
}

impl RedirectUriStrategy {
    const ORDERED: [Self; 3] = [Self::Omit, Self::Empty, Self::Provided];

    fn number(self) -> i64 {
        match self {
            Self::Omit => 1,
            Self::Empty => 2,
            Self::Provided => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Omit => "omit_redirect_uri",
            Self::Empty => "empty_redirect_uri",
            Self::Provided => "provided_redirect_uri",
        }
    }

    /// Form fields for this strategy, `None` when it does not apply.
    fn form(
        self,
        app_id: &str,
        app_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Option<Vec<(&'static str, String)>> {
        let mut form = vec![
            ("client_id", app_id.to_string()),
            ("client_secret", app_secret.to_string()),
            ("code", code.to_string()),
        ];

        match self {
            Self::Omit => {}
            Self::Empty => form.push(("redirect_uri", String::new())),
            Self::Provided if redirect_uri.is_empty() => return None,
            Self::Provided => form.push(("redirect_uri", redirect_uri.to_string())),
        }

        Some(form)
    }
}

/// Human readable description of a non-200 Graph response body
pub fn describe_graph_error(body: &str) -> String {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            let error = envelope.error;
            format!(
                "{} (type={} code={} subcode={} trace={})",
                error.message, error.error_type, error.code, error.error_subcode, error.fbtrace_id
            )
        }
        _ => body.to_string(),
    }
}

pub struct GraphClient {
    http: reqwest::Client,
    base_url: Url,
    app_id: String,
    app_secret: String,
    webhook_callback_url: String,
}

impl GraphClient {
    pub fn new(
        base_url: &str,
        app_id: &str,
        app_secret: &str,
        webhook_callback_url: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(consts::GRAPH_REQUEST_TIMEOUT)
            .connect_timeout(consts::GRAPH_CONNECT_TIMEOUT)
            .tcp_keepalive(consts::GRAPH_TCP_KEEPALIVE)
            .pool_idle_timeout(consts::GRAPH_POOL_IDLE_TIMEOUT)
            .build()
            .context("failed to build graph http client")?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid graph api base url: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("graph api base url cannot be a base: {base_url}");
        }

        Ok(Self {
            http,
            base_url,
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            webhook_callback_url: webhook_callback_url.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.graph_api_base_url,
            &config.facebook_app_id,
            &config.facebook_app_secret,
            &config.webhook_callback_url,
        )
    }

    /// Base URL extended with path segments, each one percent-escaped
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("graph api base url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Authenticated GET that decodes a 200 body, or surfaces the Graph error
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
        operation: &str,
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .with_context(|| format!("{operation} request failed"))?;

        Self::read_json(response, operation).await
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T> {
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{operation} failed ({status}): {}",
                describe_graph_error(&body)
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("failed to decode {operation} response"))
    }

    /// Identity of the token owner, used when no business account is listed
    async fn probe_identity(&self, access_token: &str) -> Result<GraphIdentity> {
        let mut url = self.endpoint(&["me"])?;
        url.query_pairs_mut().append_pair("fields", "id,name");

        self.get_json(url, access_token, "user info").await
    }
}

#[async_trait]
impl GraphService for GraphClient {
    async fn exchange_token(&self, code: &str, redirect_uri: &str) -> Result<AccessToken> {
        if self.app_id.is_empty() || self.app_secret.is_empty() {
            anyhow::bail!("missing facebook app credentials in config");
        }

        let url = self.endpoint(&["oauth", "access_token"])?;
        let mut last_error = String::new();

        for strategy in RedirectUriStrategy::ORDERED {
            let Some(form) = strategy.form(&self.app_id, &self.app_secret, code, redirect_uri)
            else {
                continue;
            };
            let number = strategy.number();
            logfire::info!("Trying token exchange strategy {strategy}", strategy = number);

            let response = match self.http.post(url.clone()).form(&form).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = format!("strategy {number} failed: token exchange request failed: {e}");
                    logfire::warn!("{error}", error = last_error.clone());
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::OK {
                let token: AccessToken = response
                    .json()
                    .await
                    .with_context(|| format!("failed to parse token response of strategy {number}"))?;

                metric::incr_token_strategy_statds(strategy.label());
                logfire::info!(
                    "Token exchange succeeded with strategy {strategy}, token length {token_length}",
                    strategy = number,
                    token_length = token.access_token.len() as i64
                );
                return Ok(token);
            }

            let body = response.text().await.unwrap_or_default();
            last_error = match serde_json::from_str::<GraphErrorEnvelope>(&body) {
                Ok(envelope) if !envelope.error.message.is_empty() => {
                    format!("strategy {number} failed: {}", describe_graph_error(&body))
                }
                _ => format!("strategy {number} failed ({status}): {body}"),
            };
            logfire::warn!("{error}", error = last_error.clone());
        }

        metric::incr_token_strategy_statds("exhausted");
        anyhow::bail!("all token exchange strategies failed, last error: {last_error}")
    }

    async fn get_business_accounts(&self, access_token: &str) -> Result<Vec<RemoteBusinessAccount>> {
        let mut url = self.endpoint(&["me", "businesses"])?;
        url.query_pairs_mut()
            .append_pair("fields", consts::BUSINESS_ACCOUNT_FIELDS);

        let accounts: GraphList<RemoteBusinessAccount> =
            self.get_json(url, access_token, "business accounts").await?;

        if !accounts.data.is_empty() {
            logfire::info!(
                "Found {count} business accounts",
                count = accounts.data.len() as i64
            );
            return Ok(accounts.data);
        }

        // Freshly created accounts may not be listed yet; the caller falls
        // back to the id reported by the signup popup.
        let identity = self.probe_identity(access_token).await?;
        logfire::info!(
            "No business accounts listed for user {user_id} ({user_name})",
            user_id = identity.id,
            user_name = identity.name
        );

        Ok(Vec::new())
    }

    async fn get_phone_numbers(
        &self,
        access_token: &str,
        waba_id: &str,
    ) -> Result<Vec<RemotePhoneNumber>> {
        let mut url = self.endpoint(&[waba_id, "phone_numbers"])?;
        url.query_pairs_mut()
            .append_pair("fields", consts::PHONE_NUMBER_FIELDS);

        let phones: GraphList<RemotePhoneNumber> =
            self.get_json(url, access_token, "phone numbers").await?;

        Ok(phones.data)
    }

    async fn validate_token(&self, access_token: &str) -> Result<bool> {
        let url = self.endpoint(&["me"])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("token validation request failed")?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        logfire::warn!(
            "Token invalid ({status}): {error}",
            status = status.to_string(),
            error = describe_graph_error(&body)
        );
        Ok(false)
    }

    async fn subscribe_webhooks(&self, access_token: &str, waba_id: &str) -> Result<()> {
        if self.webhook_callback_url.is_empty() {
            anyhow::bail!("webhook callback URL not configured");
        }

        let url = self.endpoint(&[waba_id, "subscribed_apps"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&WebhookSubscription {
                subscribed_fields: &consts::WEBHOOK_SUBSCRIBED_FIELDS,
            })
            .send()
            .await
            .context("webhook setup request failed")?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "webhook setup failed ({status}): {}",
                describe_graph_error(&body)
            );
        }

        Ok(())
    }

    async fn get_business_profile(
        &self,
        access_token: &str,
        phone_number_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let url = self.endpoint(&[phone_number_id, "whatsapp_business_profile"])?;
        let profile: GraphList<serde_json::Map<String, serde_json::Value>> =
            self.get_json(url, access_token, "business profile").await?;

        Ok(profile.data.into_iter().next().unwrap_or_default())
    }

    async fn list_templates(&self, access_token: &str, waba_id: &str) -> Result<Vec<Template>> {
        let mut url = self.endpoint(&[waba_id, "message_templates"])?;
        url.query_pairs_mut()
            .append_pair("fields", consts::TEMPLATE_FIELDS)
            .append_pair("limit", consts::TEMPLATES_PAGE_LIMIT);

        let mut templates = Vec::new();
        let mut fetched = HashSet::new();
        loop {
            fetched.insert(url.clone());
            let page: GraphList<Template> = self.get_json(url, access_token, "templates").await?;
            let next = page.next_page().map(str::to_string);
            templates.extend(page.data);

            let Some(next) = next else {
                break;
            };
            url = Url::parse(&next)
                .with_context(|| format!("invalid templates next page: {next}"))?;

            // The bearer token must only ever reach the Graph API host
            if url.origin() != self.base_url.origin() {
                anyhow::bail!(
                    "templates next page points outside the Graph API: {}",
                    url.origin().ascii_serialization()
                );
            }
            if fetched.contains(&url) {
                anyhow::bail!("templates pagination repeated page {url}");
            }
        }

        Ok(templates)
    }

    async fn send_text_message(
        &self,
        access_token: &str,
        phone_number_id: &str,
        to: &str,
        body: &str,
    ) -> Result<Vec<String>> {
        let url = self.endpoint(&[phone_number_id, "messages"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&OutgoingTextMessage::new(to.to_string(), body.to_string()))
            .send()
            .await
            .context("send message request failed")?;

        let sent: MessageSendResponse = Self::read_json(response, "send message").await?;

        Ok(sent.messages.into_iter().map(|message| message.id).collect())
    }
}
