//! Session context: the bearer token and its durable mirror.
//!
//! # Design
//! `Session` is the only owner of the token. It is constructed explicitly
//! (rehydrating from the store) and torn down with `end`. The in-memory token
//! is written before the store, and store writes follow the fixed order
//! token, role, organization id. Store failures are logged and swallowed: a
//! successful login stays successful for the running process even if the
//! session cannot be persisted.

use std::sync::{Arc, RwLock};

use crate::storage::{
    SessionStore, AUTH_TOKEN_KEY, ORGANIZATION_ID_KEY, SESSION_KEYS, USER_ROLE_KEY,
};

pub struct Session {
    token: RwLock<Option<String>>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    /// Build a session from whatever token the store already holds.
    pub fn restore(store: Arc<dyn SessionStore>) -> Self {
        let token = store.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty());
        if token.is_some() {
            tracing::debug!("restored session token from store");
        }
        Self {
            token: RwLock::new(token),
            store,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Replace the token without touching role or organization.
    pub fn set_token(&self, token: &str) {
        self.replace_token(Some(token.to_string()));
        self.write(AUTH_TOKEN_KEY, token);
    }

    /// Start a session after a successful authentication.
    pub fn begin(&self, token: &str, role: &str, organization_id: Option<i64>) {
        self.set_token(token);
        self.write(USER_ROLE_KEY, role);
        let organization = organization_id.map(|id| id.to_string()).unwrap_or_default();
        self.write(ORGANIZATION_ID_KEY, &organization);
    }

    /// Drop the token and every session key. Safe to call repeatedly.
    pub fn end(&self) {
        self.replace_token(None);
        for key in SESSION_KEYS {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!(key, error = %err, "failed to remove session key");
            }
        }
    }

    pub fn user_role(&self) -> Option<String> {
        self.store.get(USER_ROLE_KEY)
    }

    pub fn organization_id(&self) -> Option<i64> {
        self.store
            .get(ORGANIZATION_ID_KEY)
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Persist a profile value that is not part of the session keys.
    pub fn remember(&self, key: &str, value: &str) {
        self.write(key, value);
    }

    fn replace_token(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            tracing::warn!(key, error = %err, "failed to persist session key");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
