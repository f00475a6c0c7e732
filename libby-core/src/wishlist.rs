use tracing::{debug, info, warn};

use crate::cache::PreferenceCache;
use crate::error::StorageError;
use crate::models::{Book, WishlistEntry};
use crate::sync::{Mutation, RemoteSync};

/// The signed-in user's wishlist as shown by the UI.
///
/// Mutations update memory first, then the cache; if the cache write fails
/// the in-memory list is put back and the error is returned. Successful
/// mutations are mirrored remotely in the background.
pub struct WishlistState {
    user_id: String,
    entries: Vec<WishlistEntry>,
    cache: PreferenceCache,
    sync: Option<RemoteSync>,
}

impl WishlistState {
    pub fn load(cache: PreferenceCache, sync: Option<RemoteSync>, user_id: &str) -> Self {
        let entries = cache.load_wishlist(user_id);
        debug!(user = %user_id, count = entries.len(), "wishlist loaded from cache");
        Self {
            user_id: user_id.to_owned(),
            entries,
            cache,
            sync,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, book_id: &str) -> bool {
        self.entries.iter().any(|e| e.book.id == book_id)
    }

    fn commit(&mut self, previous: Vec<WishlistEntry>) -> Result<(), StorageError> {
        if let Err(err) = self.cache.save_wishlist(&self.user_id, &self.entries) {
            warn!(user = %self.user_id, error = %err, "wishlist save failed, reverting");
            self.entries = previous;
            return Err(err);
        }
        Ok(())
    }

    fn mirror(&self, mutation: Mutation) {
        if let Some(sync) = &self.sync {
            // Fire and forget.
            drop(sync.mirror(mutation));
        }
    }

    /// Returns `false` when the book was already saved.
    pub fn add(&mut self, book: Book) -> Result<bool, StorageError> {
        if self.contains(&book.id) {
            return Ok(false);
        }
        let previous = self.entries.clone();
        self.entries.push(WishlistEntry::new(book.clone()));
        self.commit(previous)?;
        self.mirror(Mutation::AddToWishlist {
            user_id: self.user_id.clone(),
            book,
        });
        Ok(true)
    }

    /// Returns `false` when the book was not in the wishlist.
    pub fn remove(&mut self, book_id: &str) -> Result<bool, StorageError> {
        if !self.contains(book_id) {
            return Ok(false);
        }
        let previous = self.entries.clone();
        self.entries.retain(|e| e.book.id != book_id);
        self.commit(previous)?;
        self.mirror(Mutation::RemoveFromWishlist {
            user_id: self.user_id.clone(),
            book_id: book_id.to_owned(),
        });
        Ok(true)
    }

    /// Adds or removes `book`; returns whether it is saved afterwards.
    pub fn toggle(&mut self, book: Book) -> Result<bool, StorageError> {
        if self.contains(&book.id) {
            self.remove(&book.id).map(|_| false)
        } else {
            self.add(book).map(|_| true)
        }
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        self.cache.clear_wishlist(&self.user_id)?;
        self.entries.clear();
        self.mirror(Mutation::ClearWishlist {
            user_id: self.user_id.clone(),
        });
        Ok(())
    }

    /// Replaces local state with a remote snapshot. Snapshots for another
    /// user are dropped; returns whether the snapshot was applied.
    ///
    /// Books already saved locally keep their local `added_at`. The snapshot
    /// is only applied once it has been cached.
    pub fn apply_remote(&mut self, user_id: &str, entries: Vec<WishlistEntry>) -> bool {
        if user_id != self.user_id {
            debug!(expected = %self.user_id, got = %user_id, "ignoring wishlist for other user");
            return false;
        }
        let merged: Vec<WishlistEntry> = entries
            .into_iter()
            .map(|mut entry| {
                if let Some(local) = self.entries.iter().find(|e| e.book.id == entry.book.id) {
                    entry.added_at = local.added_at;
                }
                entry
            })
            .collect();
        if let Err(err) = self.cache.save_wishlist(&self.user_id, &merged) {
            warn!(user = %self.user_id, error = %err, "failed to cache remote wishlist, keeping local");
            return false;
        }
        self.entries = merged;
        info!(user = %self.user_id, count = self.entries.len(), "wishlist refreshed from remote");
        true
    }

    /// Fetches the remote wishlist and applies it. Failures keep the local
    /// list.
    pub async fn refresh(&mut self) -> bool {
        let Some(sync) = self.sync.clone() else {
            return false;
        };
        match sync.api().wishlist(&self.user_id).await {
            Ok(entries) => {
                let user_id = self.user_id.clone();
                self.apply_remote(&user_id, entries)
            }
            Err(err) => {
                warn!(user = %self.user_id, error = %err, "failed to fetch remote wishlist");
                false
            }
        }
    }
}
