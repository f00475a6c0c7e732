use serde_json::Value;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::models::{Book, InteractionEvent, RecommendationSource};

pub const RECOMMENDATIONS_UNAVAILABLE: &str =
    "Recommendations are unavailable right now. Please try again later.";

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutcome {
    Found {
        source: RecommendationSource,
        books: Vec<Book>,
    },
    Failed {
        error: String,
    },
}

impl RecommendationOutcome {
    pub fn books(&self) -> &[Book] {
        match self {
            RecommendationOutcome::Found { books, .. } => books,
            RecommendationOutcome::Failed { .. } => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionTracker {
    api: ApiClient,
}

impl InteractionTracker {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Records the event. Failures come back as `None` after a warning.
    pub async fn track(&self, event: &InteractionEvent) -> Option<Value> {
        match self.api.track_interaction(event).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    user = %event.user_id,
                    book = %event.book_id,
                    kind = ?event.kind,
                    error = %err,
                    "failed to track interaction"
                );
                None
            }
        }
    }

    /// Walks [`RecommendationSource::CHAIN`] and returns the first non-empty
    /// list.
    pub async fn fetch_recommendations(&self, user_id: &str, limit: usize) -> RecommendationOutcome {
        for source in RecommendationSource::CHAIN {
            match self.api.recommendations(source, user_id, limit).await {
                Ok(books) if !books.is_empty() => {
                    debug!(%source, count = books.len(), "recommendations found");
                    return RecommendationOutcome::Found { source, books };
                }
                Ok(_) => debug!(%source, "empty recommendations, trying next source"),
                Err(err) => warn!(%source, error = %err, "recommendation source failed"),
            }
        }
        RecommendationOutcome::Failed {
            error: RECOMMENDATIONS_UNAVAILABLE.to_string(),
        }
    }
}
