//! # API Module
//!
//! Business logic behind the HTTP handlers. Each submodule drives one flow
//! against the Graph API and the account registry.
//!
//! ## Modules
//!
//! - [`accounts`] - Registry lookups and export
//! - [`onboarding`] - Embedded signup orchestration
//! - [`templates`] - Template listing and test messages

pub mod accounts;
pub mod messages;
pub mod onboarding;
pub mod templates;

use crate::front::errors::ApiError;
use std::future::Future;
use tokio::time::{self, Instant};

/// Awaits `future`, giving up once `deadline` passes.
///
/// The in-flight future is dropped on expiry; `step` names what was running.
pub(crate) async fn within_deadline<F: Future>(
    deadline: Option<Instant>,
    step: &str,
    future: F,
) -> Result<F::Output, ApiError> {
    match deadline {
        Some(deadline) => time::timeout_at(deadline, future)
            .await
            .map_err(|_| ApiError::DeadlineExceeded(step.to_string())),
        None => Ok(future.await),
    }
}
