pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod onboarding;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tracker;
pub mod wishlist;

pub use api::{ApiClient, AuthSession};
pub use cache::PreferenceCache;
pub use config::AppConfig;
pub use error::{ApiError, LibbyError, LibbyResult, StorageError};
pub use identity::{IdentityProvider, LocalIdentity};
pub use models::{
    Book, InteractionEvent, InteractionKind, InterestSelection, RecommendationSource,
    TrendingPeriod, User, WishlistEntry,
};
pub use onboarding::OnboardingWizard;
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedStore};
pub use sync::{Mutation, RemoteSync};
pub use tracker::{InteractionTracker, RecommendationOutcome};
pub use wishlist::WishlistState;
