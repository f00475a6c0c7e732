use serde_json::{json, Map};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::cache::PreferenceCache;
use crate::error::{LibbyError, LibbyResult};
use crate::identity::IdentityProvider;
use crate::models::{InterestSelection, User};
use crate::sync::{Mutation, RemoteSync};
use crate::wishlist::WishlistState;

/// Ties the identity to the per-user preference state.
///
/// Only the signed-in user's cache entries are loaded. Signing out drops
/// the in-memory state; cached entries stay on the device for the next
/// sign-in.
pub struct Session {
    identity: Box<dyn IdentityProvider>,
    cache: PreferenceCache,
    sync: Option<RemoteSync>,
    wishlist: Option<WishlistState>,
    interests: InterestSelection,
}

impl Session {
    pub fn new(
        identity: Box<dyn IdentityProvider>,
        cache: PreferenceCache,
        sync: Option<RemoteSync>,
    ) -> Self {
        Self {
            identity,
            cache,
            sync,
            wishlist: None,
            interests: InterestSelection::new(),
        }
    }

    /// Loads state for whoever the identity provider already has signed in.
    pub fn restore(&mut self) -> Option<User> {
        let user = self.identity.current_user()?;
        self.load_user_state(&user);
        Some(user)
    }

    fn load_user_state(&mut self, user: &User) {
        self.wishlist = Some(WishlistState::load(
            self.cache.clone(),
            self.sync.clone(),
            &user.id,
        ));
        let cached = self.cache.load_interests(&user.id);
        self.interests = if cached.is_empty() {
            user.metadata_interests().unwrap_or_default()
        } else {
            cached
        };
    }

    pub fn sign_in(&mut self, user: User, token: Option<String>) -> LibbyResult<()> {
        self.identity.sign_in(user.clone(), token)?;
        self.load_user_state(&user);
        info!(user = %user.id, "signed in");
        Ok(())
    }

    pub async fn sign_in_legacy(
        &mut self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> LibbyResult<User> {
        let auth = api.login(email, password).await?;
        self.sign_in(auth.user.clone(), Some(auth.token))?;
        Ok(auth.user)
    }

    pub fn sign_out(&mut self) {
        let user = self.identity.current_user().map(|u| u.id);
        if let Err(err) = self.identity.sign_out() {
            warn!(error = %err, "failed to clear stored identity");
        }
        self.wishlist = None;
        self.interests = InterestSelection::new();
        info!(user = ?user, "signed out");
    }

    pub fn user(&self) -> Option<User> {
        self.identity.current_user()
    }

    pub fn token(&self) -> Option<String> {
        self.identity.session_token()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.current_user().is_some()
    }

    pub fn require_user(&self) -> LibbyResult<User> {
        self.identity.current_user().ok_or(LibbyError::SignInRequired)
    }

    pub fn require_token(&self) -> LibbyResult<String> {
        self.identity.session_token().ok_or(LibbyError::SignInRequired)
    }

    pub fn wishlist(&self) -> Option<&WishlistState> {
        self.wishlist.as_ref()
    }

    pub fn wishlist_mut(&mut self) -> LibbyResult<&mut WishlistState> {
        self.wishlist.as_mut().ok_or(LibbyError::SignInRequired)
    }

    pub fn interests(&self) -> &InterestSelection {
        &self.interests
    }

    /// Stores the selection in the cache (errors surface), the identity
    /// metadata bag and the API (both best effort).
    pub fn save_interests(&mut self, selection: InterestSelection) -> LibbyResult<()> {
        let user = self.require_user()?;
        self.cache.save_interests(&user.id, &selection)?;
        self.interests = selection.clone();

        let mut patch = Map::new();
        patch.insert("interests".to_string(), json!(selection.to_vec()));
        if let Err(err) = self.identity.update_metadata(patch) {
            warn!(user = %user.id, error = %err, "failed to update identity metadata");
        }

        if let Some(sync) = &self.sync {
            drop(sync.mirror(Mutation::SaveInterests {
                user_id: user.id,
                interests: selection,
            }));
        }
        Ok(())
    }
}
