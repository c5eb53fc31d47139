//! Read access to the account registry.

use super::AppState;
use crate::{api, consts, models::account::Account};
use ntex::web;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub waba_id: Option<String>,
}

fn present(account: Account, expose_full_token: bool) -> Account {
    if expose_full_token {
        account
    } else {
        account.without_access_token()
    }
}

#[web::get("/accounts")]
pub async fn list_accounts(
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let expose_full_token = app_state.config.expose_full_token;
    let accounts: Vec<Account> = api::accounts::list_accounts(&app_state.repo)
        .await?
        .into_iter()
        .map(|account| present(account, expose_full_token))
        .collect();

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "count": accounts.len(),
        "accounts": accounts,
    })))
}

#[web::get("/account")]
pub async fn get_account(
    query: web::types::Query<AccountQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let account = api::accounts::get_account(&app_state.repo, query.waba_id.as_deref()).await?;

    Ok(web::HttpResponse::Ok().json(&json!({
        "success": true,
        "account": present(account, app_state.config.expose_full_token),
    })))
}

/// Registry backup, always with access tokens
#[web::get("/export")]
pub async fn export_accounts(
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let dump = api::accounts::export_accounts(&app_state.repo).await?;

    Ok(web::HttpResponse::Ok()
        .content_type("application/json")
        .set_header(
            "content-disposition",
            format!("attachment; filename={}", consts::EXPORT_FILE_NAME),
        )
        .body(dump))
}
