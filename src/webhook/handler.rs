//! # Webhook Handler
//!
//! Verification handshake and event ingestion. Parsed events are fanned out
//! to a [`WebhookEventHandler`], one call per message and per status.

use super::schemas::{VerifyQuery, WebhookEvent};
use crate::{consts, front::errors::WebhookError, metric};
use async_trait::async_trait;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::Instrument;

/// Message received by one of the business phone numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub phone_number_id: String,
    pub message_id: String,
    pub from: String,
    pub msg_type: String,
    /// Empty unless the message is text
    pub body: String,
}

/// Delivery status update for a message the business sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub phone_number_id: String,
    pub message_id: String,
    pub recipient_id: String,
    pub status: String,
    pub timestamp: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    async fn handle_message(&self, message: InboundMessage) -> anyhow::Result<()>;

    async fn handle_status(&self, status: StatusUpdate) -> anyhow::Result<()>;
}

pub type ImplWebhookEventHandler = Arc<dyn WebhookEventHandler>;

/// Default handler, logs every event and keeps nothing
pub struct LoggingEventHandler;

#[async_trait]
impl WebhookEventHandler for LoggingEventHandler {
    async fn handle_message(&self, message: InboundMessage) -> anyhow::Result<()> {
        logfire::info!(
            "Message {message_id} ({msg_type}) from {from} to phone number {phone_number_id}",
            message_id = message.message_id,
            msg_type = message.msg_type,
            from = message.from,
            phone_number_id = message.phone_number_id
        );
        Ok(())
    }

    async fn handle_status(&self, update: StatusUpdate) -> anyhow::Result<()> {
        let StatusUpdate {
            message_id,
            recipient_id,
            status,
            ..
        } = update;
        logfire::info!(
            "Message {message_id} is {status} for {recipient_id}",
            message_id = message_id,
            status = status,
            recipient_id = recipient_id
        );
        Ok(())
    }
}

/// Checks the handshake and returns the challenge to echo back.
///
/// The token comparison runs in constant time. No side effects.
pub fn verify_subscription(
    query: &VerifyQuery,
    expected_token: &str,
) -> Result<String, WebhookError> {
    let token_matches: bool = query
        .verify_token
        .as_bytes()
        .ct_eq(expected_token.as_bytes())
        .into();

    if query.mode != consts::WEBHOOK_SUBSCRIBE_MODE || expected_token.is_empty() || !token_matches
    {
        logfire::warn!(
            "Webhook verification failed for mode {mode}",
            mode = query.mode.clone()
        );
        return Err(WebhookError::Forbidden);
    }

    logfire::info!("Webhook verification successful");
    Ok(query.challenge.clone())
}

/// Counts of what one delivery contained
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub messages: usize,
    pub statuses: usize,
    /// Handler calls that returned an error
    pub failures: usize,
}

/// Parses a delivery and dispatches every message and status in it.
///
/// Handler errors are logged and counted, never surfaced: once the body
/// parses, the delivery is acknowledged.
pub async fn ingest_event(
    body: &[u8],
    handler: &ImplWebhookEventHandler,
) -> Result<IngestSummary, WebhookError> {
    let event: WebhookEvent = serde_json::from_slice(body).map_err(|e| {
        metric::incr_webhook_event_statds("malformed");
        WebhookError::MalformedPayload(e.to_string())
    })?;

    dispatch(event, handler)
        .instrument(logfire::span!("whatsapp_webhook"))
        .await
}

async fn dispatch(
    event: WebhookEvent,
    handler: &ImplWebhookEventHandler,
) -> Result<IngestSummary, WebhookError> {
    logfire::info!(
        "Received webhook: object={object}, entries={entries}",
        object = event.object.clone(),
        entries = event.entry.len() as i64
    );

    let mut summary = IngestSummary::default();
    for change in event.entry.into_iter().flat_map(|entry| entry.changes) {
        let phone_number_id = change.value.metadata.phone_number_id;

        for message in change.value.messages {
            summary.messages += 1;
            metric::incr_webhook_event_statds("message");

            let inbound = InboundMessage {
                phone_number_id: phone_number_id.clone(),
                message_id: message.id,
                from: message.from,
                msg_type: message.msg_type,
                body: message.text.map(|text| text.body).unwrap_or_default(),
            };
            if let Err(e) = handler.handle_message(inbound).await {
                summary.failures += 1;
                logfire::error!(
                    "Failed to handle webhook message: {error}",
                    error = format!("{e:#}")
                );
            }
        }

        for status in change.value.statuses {
            summary.statuses += 1;
            metric::incr_webhook_event_statds("status");

            let update = StatusUpdate {
                phone_number_id: phone_number_id.clone(),
                message_id: status.id,
                recipient_id: status.recipient_id,
                status: status.status,
                timestamp: status.timestamp,
            };
            if let Err(e) = handler.handle_status(update).await {
                summary.failures += 1;
                logfire::error!(
                    "Failed to handle webhook status: {error}",
                    error = format!("{e:#}")
                );
            }
        }
    }

    Ok(summary)
}
