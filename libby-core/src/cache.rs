//! Per-user preference cache on top of a [`KeyValueStore`].
//!
//! Every key is derived from the user id, so one user's entries are never
//! read or written through another user's key. Missing or unreadable data
//! is treated as absent.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::{InterestSelection, WishlistEntry};
use crate::storage::SharedStore;

const WISHLIST_PREFIX: &str = "wishlist_";
const INTERESTS_PREFIX: &str = "interests_";

pub fn wishlist_key(user_id: &str) -> String {
    format!("{WISHLIST_PREFIX}{user_id}")
}

pub fn interests_key(user_id: &str) -> String {
    format!("{INTERESTS_PREFIX}{user_id}")
}

#[derive(Clone)]
pub struct PreferenceCache {
    store: SharedStore,
}

impl PreferenceCache {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get(key) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(%key, error = %err, "discarding unreadable cache entry");
                T::default()
            }),
            None => {
                debug!(%key, "no cache entry");
                T::default()
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    pub fn load_wishlist(&self, user_id: &str) -> Vec<WishlistEntry> {
        self.read(&wishlist_key(user_id))
    }

    pub fn save_wishlist(
        &self,
        user_id: &str,
        entries: &[WishlistEntry],
    ) -> Result<(), StorageError> {
        self.write(&wishlist_key(user_id), entries)
    }

    pub fn clear_wishlist(&self, user_id: &str) -> Result<(), StorageError> {
        self.store.remove(&wishlist_key(user_id))
    }

    pub fn load_interests(&self, user_id: &str) -> InterestSelection {
        self.read(&interests_key(user_id))
    }

    pub fn save_interests(
        &self,
        user_id: &str,
        selection: &InterestSelection,
    ) -> Result<(), StorageError> {
        self.write(&interests_key(user_id), selection)
    }
}
