//! Webhook callbacks from the WhatsApp Business Platform
//!
//! ## Modules
//!
//! - [`handler`] - Handshake verification and event dispatch
//! - [`routes`] - ntex endpoints
//! - [`schemas`] - Delivery payloads

pub mod handler;
pub mod routes;
pub mod schemas;
