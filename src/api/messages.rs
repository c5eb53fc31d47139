//! # Messages API Module
//!
//! Sends a plain text message from an onboarded account to check that
//! messaging works end to end.

use super::within_deadline;
use crate::{front::errors::ApiError, models::setup::TestMessageRequest, repo, services};
use tokio::time::Instant;

/// Sends `request.message` to `request.to` from the first phone number of an
/// onboarded account, using the token stored at onboarding time.
pub async fn send_test_message(
    graph: &services::ImplGraphService,
    repo: &repo::ImplAccountRepo,
    request: &TestMessageRequest,
    deadline: Option<Instant>,
) -> Result<Vec<String>, ApiError> {
    for (field, value) in [
        ("waba_id", &request.waba_id),
        ("to", &request.to),
        ("message", &request.message),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{field} is required")));
        }
    }

    let account = repo.get(request.waba_id.trim()).await?;
    let Some(phone) = account.phone_numbers.first() else {
        return Err(ApiError::NotFound(
            "No phone numbers found for this business account".to_string(),
        ));
    };

    let message_ids = within_deadline(
        deadline,
        "sending the test message",
        graph.send_text_message(
            &account.access_token,
            &phone.id,
            request.to.trim(),
            &request.message,
        ),
    )
    .await?
    .map_err(|e| ApiError::Upstream {
        detail: format!("Failed to send test message: {e:#}"),
        caller_input: false,
    })?;

    logfire::info!(
        "Test message sent from phone number {phone_number_id}",
        phone_number_id = phone.id.clone()
    );

    Ok(message_ids)
}
