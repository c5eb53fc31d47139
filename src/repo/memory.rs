use crate::models::account::Account;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
};

use super::{AccountRepo, RepoError};

/// Process-local account store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryAccountRepo {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> RepoError {
    RepoError::Storage("account store lock poisoned".to_string())
}

#[async_trait]
impl AccountRepo for InMemoryAccountRepo {
    async fn save(&self, mut account: Account) -> Result<Account, RepoError> {
        let now = Utc::now();
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let previous = accounts.get(&account.external_account_id);

        account.created_at = previous
            .and_then(|prev| prev.created_at)
            .or(account.created_at)
            .or(Some(now));

        // updated_at must move forward even when two saves land on the same tick
        account.updated_at = match previous.and_then(|prev| prev.updated_at) {
            Some(last) if last >= now => Some(last + TimeDelta::microseconds(1)),
            _ => Some(now),
        };

        accounts.insert(account.external_account_id.clone(), account.clone());
        Ok(account)
    }

    async fn get(&self, waba_id: &str) -> Result<Account, RepoError> {
        self.accounts
            .read()
            .map_err(poisoned)?
            .get(waba_id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(waba_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Account>, RepoError> {
        Ok(self
            .accounts
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect())
    }

    async fn delete(&self, waba_id: &str) -> Result<(), RepoError> {
        self.accounts.write().map_err(poisoned)?.remove(waba_id);
        Ok(())
    }

    async fn export(&self) -> Result<String, RepoError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        let sorted: BTreeMap<&String, &Account> = accounts.iter().collect();

        serde_json::to_string_pretty(&sorted)
            .map_err(|e| RepoError::Storage(format!("failed to export data: {e}")))
    }
}
