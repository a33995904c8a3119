//! In-memory account store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use ssogate_auth::{Account, AccountName, AccountStore, AccountStoreError};
use ssogate_core::{Clock, SystemClock};

/// Accounts and their preferences, keyed by account name.
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountName, Account>>,
    preferences: RwLock<HashMap<(AccountName, String), String>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn set_preference(&self, name: &AccountName, key: &str, value: impl Into<String>) {
        if let Ok(mut prefs) = self.preferences.write() {
            prefs.insert((name.clone(), key.to_string()), value.into());
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.read().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> AccountStoreError {
    AccountStoreError::Storage("account store lock poisoned".into())
}

impl AccountStore for InMemoryAccountStore {
    fn find_by_name(&self, name: &AccountName) -> Result<Option<Account>, AccountStoreError> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.get(name).cloned())
    }

    fn create_account(
        &self,
        name: &AccountName,
        real_name: &str,
    ) -> Result<Account, AccountStoreError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        if let Some(existing) = accounts.get(name) {
            return Ok(existing.clone());
        }

        let account = Account::external(name.clone(), real_name, self.clock.now());
        accounts.insert(name.clone(), account.clone());
        info!(account = %name, account_id = %account.id, "local account created");
        Ok(account)
    }

    fn preference(&self, account: &Account, key: &str) -> Option<String> {
        let prefs = self.preferences.read().ok()?;
        prefs.get(&(account.name.clone(), key.to_string())).cloned()
    }
}
