//! # Webhook Schemas
//!
//! Payload the platform posts to the webhook callback. Every field defaults
//! when absent, so only syntactically broken JSON or values of the wrong type
//! are rejected.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query string of the verification handshake.
///
/// The `hub.*` names win over the bare ones; anything missing is empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyQuery {
    pub mode: String,
    pub verify_token: String,
    pub challenge: String,
}

impl VerifyQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let param = |name: &str| {
            params
                .get(&format!("hub.{name}"))
                .or_else(|| params.get(name))
                .cloned()
                .unwrap_or_default()
        };

        Self {
            mode: param("mode"),
            verify_token: param("verify_token"),
            challenge: param("challenge"),
        }
    }
}

/// Root webhook payload
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookEvent {
    /// Typically "whatsapp_business_account"
    pub object: String,
    pub entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Entry {
    /// Business Account ID
    pub id: String,
    pub time: i64,
    pub changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Change {
    /// Subscribed field that changed, e.g. "messages"
    pub field: String,
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChangeValue {
    pub messaging_product: String,
    pub metadata: Metadata,
    pub messages: Vec<Message>,
    pub statuses: Vec<Status>,
}

/// Business phone number that received the event
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Metadata {
    pub display_phone_number: String,
    pub phone_number_id: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    /// Sender's WhatsApp ID
    pub from: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Present for text messages only
    pub text: Option<TextMessage>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TextMessage {
    pub body: String,
}

/// Delivery status of a message sent by the business
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Status {
    pub id: String,
    pub recipient_id: String,
    /// sent, delivered, read or failed
    pub status: String,
    pub timestamp: String,
}
