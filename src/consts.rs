use std::time::Duration;

pub const GRAPH_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const GRAPH_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const GRAPH_TCP_KEEPALIVE: Duration = Duration::from_secs(30);
pub const GRAPH_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub const BUSINESS_ACCOUNT_FIELDS: &str = "id,name,verification_status,profile_picture_uri";
pub const PHONE_NUMBER_FIELDS: &str =
    "id,display_phone_number,verified_name,quality_rating,status,code_verification_status";
pub const TEMPLATE_FIELDS: &str = "id,name,language,status,category,quality_score";
pub const TEMPLATES_PAGE_LIMIT: &str = "100";

pub const WEBHOOK_SUBSCRIBED_FIELDS: [&str; 6] = [
    "messages",
    "message_deliveries",
    "message_reads",
    "message_echoes",
    "message_template_status_update",
    "account_alerts",
];

pub const PHONE_CODE_VERIFIED: &str = "VERIFIED";
pub const PENDING_VERIFICATION_STATUS: &str = "pending";
pub const EMBEDDED_SIGNUP_ACCOUNT_NAME: &str = "WhatsApp Business Account (Embedded Signup)";
pub const EMBEDDED_SIGNUP_SOURCE: &str = "embedded_signup";

pub const SETUP_STATUS_COMPLETE: &str = "complete";
pub const SETUP_SUCCESS_MESSAGE: &str = "WhatsApp Business Account setup completed successfully";
pub const NEXT_STEPS: [&str; 3] = [
    "Business account is ready to send messages",
    "Configure message templates in WhatsApp Manager",
    "Test messaging functionality",
];
pub const NEXT_STEP_MANUAL_WEBHOOKS: &str = "Manual webhook configuration may be required";

pub const WEBHOOK_SUBSCRIBE_MODE: &str = "subscribe";
pub const TOKEN_PREVIEW_CHARS: usize = 20;
pub const EXPORT_FILE_NAME: &str = "whatsapp_accounts.json";
