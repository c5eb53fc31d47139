pub mod memory;

use crate::models;
use async_trait::async_trait;
use derive_more::{Display, Error};
use std::sync::Arc;

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum RepoError {
    #[display("business account not found: {_0}")]
    NotFound(#[error(not(source))] String),
    #[display("account storage failure: {_0}")]
    Storage(#[error(not(source))] String),
}

/// Authoritative store of onboarded accounts keyed by `waba_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Upserts the account and returns the record as stored.
    async fn save(&self, account: models::account::Account)
    -> Result<models::account::Account, RepoError>;

    async fn get(&self, waba_id: &str) -> Result<models::account::Account, RepoError>;

    async fn list(&self) -> Result<Vec<models::account::Account>, RepoError>;

    /// Removing a missing account is not an error.
    async fn delete(&self, waba_id: &str) -> Result<(), RepoError>;

    /// Pretty printed JSON snapshot of the whole store, keys sorted.
    async fn export(&self) -> Result<String, RepoError>;
}

pub type ImplAccountRepo = Arc<dyn AccountRepo>;
