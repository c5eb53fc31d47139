use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::RemotePhoneNumber;
use crate::consts;

/// Onboarded WhatsApp Business Account, keyed by `waba_id` in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "waba_id")]
    pub external_account_id: String,
    pub business_name: String,
    pub phone_numbers: Vec<PhoneNumberRecord>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub webhooks_enabled: bool,
    pub setup_complete: bool,
    /// Stamped by the registry on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by the registry on every save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub metadata: AccountMetadata,
}

impl Account {
    /// Copy of the account safe to return from the API when the token must stay private
    pub fn without_access_token(&self) -> Self {
        Self {
            access_token: String::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumberRecord {
    pub id: String,
    pub phone_number: String,
    pub display_name: String,
    pub status: String,
    pub quality_rating: String,
    pub is_verified: bool,
}

impl From<&RemotePhoneNumber> for PhoneNumberRecord {
    fn from(phone: &RemotePhoneNumber) -> Self {
        Self {
            id: phone.id.clone(),
            phone_number: phone.display_phone_number.clone(),
            display_name: phone.verified_name.clone(),
            status: phone.status.clone(),
            quality_rating: phone.quality_rating.clone(),
            is_verified: phone.code_verification_status == consts::PHONE_CODE_VERIFIED,
        }
    }
}

/// Facts captured while onboarding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub verification_status: String,
    /// Business profile as returned by the platform, empty when unavailable
    #[serde(default)]
    pub profile_info: serde_json::Map<String, serde_json::Value>,
    pub setup_source: String,
    /// Redirect URI handed to the token exchange
    #[serde(default)]
    pub redirect_uri: String,
}
