//! # Graph API Schemas
//!
//! Payloads exchanged with the Meta Graph API during onboarding. None of these
//! are persisted as-is; the onboarding flow projects them into an
//! [`Account`](super::account::Account).

use serde::{Deserialize, Serialize};

/// Access token returned by `/oauth/access_token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Seconds until expiry, `0` when the platform does not report one
    #[serde(default)]
    pub expires_in: i64,
}

/// Business account as listed by `/me/businesses`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBusinessAccount {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub verification_status: String,
    #[serde(default)]
    pub profile_picture_uri: String,
}

/// Phone number registered under a WhatsApp Business Account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePhoneNumber {
    pub id: String,
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub verified_name: String,
    #[serde(default)]
    pub quality_rating: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code_verification_status: String,
}

/// Message template, returned straight to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<QualityScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    #[serde(default)]
    pub score: String,
}

/// Generic `{"data": [...], "paging": {...}}` collection
#[derive(Debug, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<GraphPaging>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphPaging {
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> GraphList<T> {
    /// Absolute URL of the next page, if the platform reported one
    pub fn next_page(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|paging| paging.next.as_deref())
            .filter(|next| !next.is_empty())
    }
}

/// Identity returned by `/me`
#[derive(Debug, Default, Deserialize)]
pub struct GraphIdentity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Graph API error envelope
#[derive(Debug, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub error_subcode: i64,
    #[serde(default)]
    pub fbtrace_id: String,
}

/// Body for `/{waba_id}/subscribed_apps`
#[derive(Debug, Serialize)]
pub struct WebhookSubscription<'a> {
    pub subscribed_fields: &'a [&'a str],
}

/// Text message to send to WhatsApp
#[derive(Debug, Serialize, Deserialize)]
pub struct OutgoingTextMessage {
    /// Messaging product, always "whatsapp"
    pub messaging_product: String,
    /// Recipient's WhatsApp ID (phone number)
    pub to: String,
    /// Message type
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Text content
    pub text: OutgoingTextContent,
}

impl OutgoingTextMessage {
    /// Creates a new text message
    pub fn new(to: String, body: String) -> Self {
        Self {
            messaging_product: "whatsapp".to_string(),
            to,
            msg_type: "text".to_string(),
            text: OutgoingTextContent { body },
        }
    }
}

/// Text content for outgoing messages
#[derive(Debug, Serialize, Deserialize)]
pub struct OutgoingTextContent {
    /// Message body text
    pub body: String,
}

/// Response from WhatsApp API when sending a message
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageSendResponse {
    #[serde(default)]
    pub messaging_product: String,
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_without_optional_fields() {
        let token: AccessToken = serde_json::from_str(r#"{"access_token":"EAAG"}"#).unwrap();

        assert_eq!(token.access_token, "EAAG");
        assert_eq!(token.token_type, "");
        assert_eq!(token.expires_in, 0);
    }

    #[test]
    fn test_next_page_ignores_empty_cursor() {
        let list: GraphList<Template> =
            serde_json::from_str(r#"{"data":[],"paging":{"next":""}}"#).unwrap();
        assert!(list.next_page().is_none());

        let list: GraphList<Template> =
            serde_json::from_str(r#"{"data":[],"paging":{"cursors":{"after":"x"}}}"#).unwrap();
        assert!(list.next_page().is_none());

        let list: GraphList<Template> = serde_json::from_str(
            r#"{"data":[],"paging":{"next":"https://graph.facebook.com/v23.0/1/message_templates?after=x"}}"#,
        )
        .unwrap();
        assert_eq!(
            list.next_page(),
            Some("https://graph.facebook.com/v23.0/1/message_templates?after=x")
        );
    }

    #[test]
    fn test_outgoing_text_message_shape() {
        let message = OutgoingTextMessage::new("5215512345678".into(), "hola".into());
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "5215512345678",
                "type": "text",
                "text": {"body": "hola"}
            })
        );
    }
}
