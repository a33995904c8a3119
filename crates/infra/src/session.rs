//! In-memory sessions for tests and single-process hosts.
//!
//! A [`SessionRegistry`] outlives requests; each request opens an
//! [`InMemorySession`] view on one session id and writes it back on `save`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use ssogate_auth::{Account, AccountName, SessionStore};

/// Everything a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub values: HashMap<String, String>,
    pub secrets: HashMap<String, String>,
    pub user: Option<AccountName>,
    /// Long-lived login cookie requested.
    pub remember: bool,
    /// A cookie has been issued for this session.
    pub persisted: bool,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<HashMap<String, SessionData>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request-scoped view of `session_id`, empty when the id is unknown.
    pub fn open(self: &Arc<Self>, session_id: &str) -> InMemorySession {
        let data = self
            .inner
            .read()
            .ok()
            .and_then(|map| map.get(session_id).cloned())
            .unwrap_or_default();
        InMemorySession {
            data,
            backing: Some((self.clone(), session_id.to_string())),
            saves: 0,
        }
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionData> {
        self.inner.read().ok()?.get(session_id).cloned()
    }

    fn store(&self, session_id: &str, data: SessionData) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(session_id.to_string(), data);
        }
    }
}

/// Session state for one request.
#[derive(Debug, Default)]
pub struct InMemorySession {
    data: SessionData,
    backing: Option<(Arc<SessionRegistry>, String)>,
    saves: usize,
}

impl InMemorySession {
    /// Detached session; `save` only counts.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SessionStore for InMemorySession {
    fn persist(&mut self) {
        self.data.persisted = true;
    }

    fn get(&self, key: &str) -> Option<String> {
        self.data.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.data.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.data.values.remove(key);
    }

    fn exists(&self, key: &str) -> bool {
        self.data.values.contains_key(key)
    }

    fn save(&mut self) {
        self.saves += 1;
        if let Some((registry, id)) = &self.backing {
            registry.store(id, self.data.clone());
            debug!(session_id = %id, "session saved");
        }
    }

    fn set_secret(&mut self, name: &str, value: String) {
        self.data.secrets.insert(name.to_string(), value);
    }

    fn get_secret(&self, name: &str) -> Option<String> {
        self.data.secrets.get(name).cloned()
    }

    fn user(&self) -> Option<AccountName> {
        self.data.user.clone()
    }

    fn set_user(&mut self, account: &Account, persistent: bool) {
        self.data.user = Some(account.name.clone());
        self.data.remember = persistent;
    }

    fn logout(&mut self) {
        self.data.user = None;
        self.data.remember = false;
    }
}
