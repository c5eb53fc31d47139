//! Application configuration management with security considerations.
//!
//! Every value is read once from the environment at process start and the
//! resulting [`AppConfig`] is passed explicitly to whatever needs it.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - Production environments should use secure secret management systems

use envconfig::Envconfig;
use std::time::Duration;

/// Application configuration with security-aware field management.
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Meta application ID used for the OAuth code exchange (SEMI-SENSITIVE)
    pub facebook_app_id: String,

    /// 🔒 SENSITIVE: Meta application secret
    /// Security: Store in secure secret management system
    pub facebook_app_secret: String,

    /// OAuth redirect URI used when the caller does not send one (NON-SENSITIVE)
    /// Must match the value registered in the Meta app settings
    #[envconfig(default = "")]
    pub facebook_redirect_uri: String,

    /// Graph API base URL including the version segment (NON-SENSITIVE)
    #[envconfig(default = "https://graph.facebook.com/v23.0")]
    pub graph_api_base_url: String,

    /// Host address for web server binding (NON-SENSITIVE)
    #[envconfig(default = "0.0.0.0")]
    pub server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(default = "8081")]
    pub server_port: u16,

    /// 🔒 SENSITIVE: Token echoed back by Meta during the webhook handshake
    pub webhook_verify_token: String,

    /// Public webhook callback URL (NON-SENSITIVE)
    /// Must match what is registered with Meta; subscriptions fail without it
    #[envconfig(default = "")]
    pub webhook_callback_url: String,

    /// Comma separated list of origins allowed to call the API (NON-SENSITIVE)
    #[envconfig(default = "http://localhost:3001")]
    pub allowed_origins: String,

    /// Includes the full access token in setup/templates responses (SECURITY TOGGLE)
    /// Leave disabled outside of local debugging
    #[envconfig(default = "false")]
    pub expose_full_token: bool,

    /// Upper bound for a whole onboarding run, in seconds (NON-SENSITIVE)
    #[envconfig(default = "60")]
    pub onboarding_deadline_secs: u64,

    /// 🔒 SENSITIVE: Logfire write token, logs stay local when unset
    pub logfire_token: Option<String>,

    /// Path to SSL private key file (SENSITIVE PATH)
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE)
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Rejects configurations the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.facebook_app_id.trim().is_empty() || self.facebook_app_secret.trim().is_empty() {
            anyhow::bail!("FACEBOOK_APP_ID and FACEBOOK_APP_SECRET are required");
        }

        if self.webhook_verify_token.trim().is_empty() {
            anyhow::bail!("WEBHOOK_VERIFY_TOKEN must not be empty");
        }

        // ntex-cors allows every origin when none is configured
        if self.allowed_origins().is_empty() {
            anyhow::bail!("ALLOWED_ORIGINS must list at least one origin");
        }

        Ok(())
    }

    /// Origins parsed from [`AppConfig::allowed_origins`]
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn onboarding_deadline(&self) -> Duration {
        Duration::from_secs(self.onboarding_deadline_secs)
    }
}
