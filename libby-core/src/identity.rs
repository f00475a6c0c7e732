//! Signed-in user and session token, as handed over by the identity
//! provider or the legacy email/password login.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{LibbyError, LibbyResult, StorageError};
use crate::models::User;
use crate::storage::SharedStore;

pub const USER_KEY: &str = "identity_user";
pub const TOKEN_KEY: &str = "token";

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn session_token(&self) -> Option<String>;
    fn sign_in(&mut self, user: User, token: Option<String>) -> Result<(), StorageError>;
    fn sign_out(&mut self) -> Result<(), StorageError>;
    /// Merges `patch` into the user's metadata bag and returns the updated
    /// user.
    fn update_metadata(&mut self, patch: Map<String, Value>) -> LibbyResult<User>;
}

/// Identity kept in the local key-value store so it survives restarts.
pub struct LocalIdentity {
    store: SharedStore,
    user: Option<User>,
    token: Option<String>,
}

impl LocalIdentity {
    pub fn open(store: SharedStore) -> Self {
        let user = store.get(USER_KEY).and_then(|raw| {
            serde_json::from_str::<User>(&raw)
                .map_err(|err| warn!(error = %err, "discarding unreadable stored identity"))
                .ok()
        });
        let token = store.get(TOKEN_KEY).filter(|t| !t.is_empty());
        debug!(signed_in = user.is_some(), "identity restored");
        Self { store, user, token }
    }

    fn persist_user(&self, user: &User) -> Result<(), StorageError> {
        let raw = serde_json::to_string(user)?;
        self.store.set(USER_KEY, &raw)
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }

    fn session_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn sign_in(&mut self, user: User, token: Option<String>) -> Result<(), StorageError> {
        self.persist_user(&user)?;
        match &token {
            Some(token) => self.store.set(TOKEN_KEY, token)?,
            None => self.store.remove(TOKEN_KEY)?,
        }
        self.user = Some(user);
        self.token = token;
        Ok(())
    }

    fn sign_out(&mut self) -> Result<(), StorageError> {
        self.user = None;
        self.token = None;
        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)
    }

    fn update_metadata(&mut self, patch: Map<String, Value>) -> LibbyResult<User> {
        let mut user = self.user.clone().ok_or(LibbyError::SignInRequired)?;
        user.metadata.extend(patch);
        self.persist_user(&user)?;
        self.user = Some(user.clone());
        Ok(user)
    }
}
