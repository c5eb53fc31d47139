use crate::{front::errors::ApiError, models::account::Account, repo};

pub async fn list_accounts(repo: &repo::ImplAccountRepo) -> Result<Vec<Account>, ApiError> {
    Ok(repo.list().await?)
}

/// Looks up one account; a missing or blank `waba_id` is a validation error.
pub async fn get_account(
    repo: &repo::ImplAccountRepo,
    waba_id: Option<&str>,
) -> Result<Account, ApiError> {
    let waba_id = waba_id
        .map(str::trim)
        .filter(|waba_id| !waba_id.is_empty())
        .ok_or_else(|| ApiError::Validation("waba_id parameter is required".to_string()))?;

    Ok(repo.get(waba_id).await?)
}

pub async fn export_accounts(repo: &repo::ImplAccountRepo) -> Result<String, ApiError> {
    repo.export()
        .await
        .map_err(|e| ApiError::Persistence(format!("Failed to export data: {e}")))
}
