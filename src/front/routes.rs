//! Route configuration module.
//!
//! Routes are grouped by functionality into scopes, each one registered on the
//! app through `.configure(...)`.

use super::{business, server, setup};
use crate::webhook;
use ntex::web;

/// Configures the onboarding and webhook routes.
///
/// # Routes
/// - `POST /api/whatsapp/setup` - Embedded signup onboarding
/// - `POST /api/whatsapp/templates` - Template listing for a fresh code
/// - `POST /api/whatsapp/test-message` - Text message from an onboarded account
/// - `GET /api/whatsapp/webhooks` - Webhook verification handshake
/// - `POST /api/whatsapp/webhooks` - Webhook event delivery
pub fn whatsapp(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/whatsapp").service((
            setup::embedded_signup,
            setup::list_templates,
            setup::send_test_message,
            web::scope("/webhooks")
                .service((webhook::routes::verify, webhook::routes::receive)),
        )),
    );
}

/// Configures the account registry routes.
///
/// # Routes
/// - `GET /api/business/accounts` - Every onboarded account
/// - `GET /api/business/account?waba_id=` - One account
/// - `GET /api/business/export` - JSON backup of the registry
pub fn business(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/business").service((
        business::list_accounts,
        business::get_account,
        business::export_accounts,
    )));
}

pub fn health(cfg: &mut web::ServiceConfig) {
    cfg.service(server::health);
}
