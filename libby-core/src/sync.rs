//! Best-effort mirroring of local preference changes to the API.
//!
//! Local state is what the UI shows; the remote copy is advisory. Each
//! mutation is one request with no retry, and failures are only logged.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::models::{Book, InterestSelection};

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddToWishlist { user_id: String, book: Book },
    RemoveFromWishlist { user_id: String, book_id: String },
    ClearWishlist { user_id: String },
    SaveInterests { user_id: String, interests: InterestSelection },
}

impl Mutation {
    pub fn user_id(&self) -> &str {
        match self {
            Mutation::AddToWishlist { user_id, .. }
            | Mutation::RemoveFromWishlist { user_id, .. }
            | Mutation::ClearWishlist { user_id }
            | Mutation::SaveInterests { user_id, .. } => user_id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mutation::AddToWishlist { .. } => "wishlist add",
            Mutation::RemoveFromWishlist { .. } => "wishlist remove",
            Mutation::ClearWishlist { .. } => "wishlist clear",
            Mutation::SaveInterests { .. } => "interests save",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteSync {
    api: ApiClient,
    runtime: Handle,
}

impl RemoteSync {
    pub fn new(api: ApiClient, runtime: Handle) -> Self {
        Self { api, runtime }
    }

    /// Uses the runtime of the calling context. Panics outside a Tokio
    /// runtime, like `tokio::spawn`.
    pub fn on_current_runtime(api: ApiClient) -> Self {
        Self::new(api, Handle::current())
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Sends the mutation in the background. The handle resolves to whether
    /// the API accepted it and may simply be dropped.
    pub fn mirror(&self, mutation: Mutation) -> JoinHandle<bool> {
        let this = self.clone();
        self.runtime
            .spawn(async move { this.push(&mutation).await })
    }

    pub async fn push(&self, mutation: &Mutation) -> bool {
        let result = match mutation {
            Mutation::AddToWishlist { user_id, book } => {
                self.api.add_to_wishlist(user_id, book).await
            }
            Mutation::RemoveFromWishlist { user_id, book_id } => {
                self.api.remove_from_wishlist(user_id, book_id).await
            }
            Mutation::ClearWishlist { user_id } => self.api.clear_wishlist(user_id).await,
            Mutation::SaveInterests { user_id, interests } => {
                self.api.set_profile_interests(user_id, interests).await
            }
        };
        match result {
            Ok(()) => {
                debug!(mutation = mutation.name(), user = mutation.user_id(), "mirrored");
                true
            }
            Err(err) => {
                warn!(
                    mutation = mutation.name(),
                    user = mutation.user_id(),
                    error = %err,
                    "remote sync failed"
                );
                false
            }
        }
    }
}
