use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A book as served by the recommendation API. Only `id` is guaranteed;
/// everything else is filled in when the API knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Book {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "cover_url", alias = "image_url")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default, alias = "published_date")]
    pub publication_date: Option<String>,
    #[serde(default, alias = "pages")]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
}

impl Book {
    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown author")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "name", alias = "username")]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "avatar_url", alias = "image_url")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl User {
    /// Interests mirrored into the identity metadata bag, if any.
    pub fn metadata_interests(&self) -> Option<InterestSelection> {
        let tags = self.metadata.get("interests")?.as_array()?;
        Some(InterestSelection::from_tags(
            tags.iter().filter_map(Value::as_str),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WishlistEntry {
    pub book: Book,
    pub added_at: DateTime<Utc>,
}

impl WishlistEntry {
    pub fn new(book: Book) -> Self {
        Self {
            book,
            added_at: Utc::now(),
        }
    }
}

/// Genre tags picked during onboarding. Tags are trimmed and lowercased so
/// `"Fantasy "` and `"fantasy"` are the same selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct InterestSelection(BTreeSet<String>);

impl InterestSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::new();
        for tag in tags {
            selection.insert(tag.as_ref());
        }
        selection
    }

    fn normalize(tag: &str) -> String {
        tag.trim().to_lowercase()
    }

    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = Self::normalize(tag);
        if tag.is_empty() {
            return false;
        }
        self.0.insert(tag)
    }

    /// Flips membership of `tag`; returns whether it is selected afterwards.
    pub fn toggle(&mut self, tag: &str) -> bool {
        let tag = Self::normalize(tag);
        if tag.is_empty() {
            return false;
        }
        if self.0.remove(&tag) {
            false
        } else {
            self.0.insert(tag);
            true
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&Self::normalize(tag))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendingPeriod {
    #[default]
    Weekly,
    Monthly,
    Yearly,
}

impl TrendingPeriod {
    pub const ALL: [TrendingPeriod; 3] = [Self::Weekly, Self::Monthly, Self::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for TrendingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Click,
    View,
    WishlistAdd,
    Rating,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionEvent {
    pub user_id: String,
    pub book_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rating: Option<u8>,
}

impl InteractionEvent {
    fn new(user_id: &str, book_id: &str, kind: InteractionKind) -> Self {
        Self {
            user_id: user_id.to_owned(),
            book_id: book_id.to_owned(),
            kind,
            rating: None,
        }
    }

    pub fn click(user_id: &str, book_id: &str) -> Self {
        Self::new(user_id, book_id, InteractionKind::Click)
    }

    pub fn view(user_id: &str, book_id: &str) -> Self {
        Self::new(user_id, book_id, InteractionKind::View)
    }

    pub fn wishlist_add(user_id: &str, book_id: &str) -> Self {
        Self::new(user_id, book_id, InteractionKind::WishlistAdd)
    }

    /// Ratings are stars, clamped to 1..=5.
    pub fn rating(user_id: &str, book_id: &str, stars: u8) -> Self {
        let mut event = Self::new(user_id, book_id, InteractionKind::Rating);
        event.rating = Some(stars.clamp(1, 5));
        event
    }
}

/// The recommendation variants the API offers, in fallback order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Personalized,
    Hybrid,
    Enhanced,
}

impl RecommendationSource {
    pub const CHAIN: [RecommendationSource; 3] = [Self::Personalized, Self::Hybrid, Self::Enhanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personalized => "personalized",
            Self::Hybrid => "hybrid",
            Self::Enhanced => "enhanced",
        }
    }
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book lists come back either bare or wrapped in a `books` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BookListPayload {
    Bare(Vec<Book>),
    Wrapped { books: Vec<Book> },
}

impl BookListPayload {
    pub(crate) fn into_books(self) -> Vec<Book> {
        match self {
            BookListPayload::Bare(books) => books,
            BookListPayload::Wrapped { books } => books,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_list_accepts_bare_and_wrapped_arrays() {
        let bare: BookListPayload =
            serde_json::from_str(r#"[{"id": 1, "title": "Dune"}]"#).unwrap();
        let wrapped: BookListPayload =
            serde_json::from_str(r#"{"books": [{"id": "b-2", "title": "Emma"}], "total": 1}"#)
                .unwrap();

        let bare = bare.into_books();
        let wrapped = wrapped.into_books();
        assert_eq!(bare[0].id, "1");
        assert_eq!(wrapped[0].id, "b-2");
        assert_eq!(wrapped[0].title, "Emma");
    }

    #[test]
    fn book_list_rejects_other_shapes() {
        assert!(serde_json::from_str::<BookListPayload>(r#"{"items": []}"#).is_err());
        assert!(serde_json::from_str::<BookListPayload>(r#""nope""#).is_err());
    }

    #[test]
    fn interest_toggle_is_set_like() {
        let mut selection = InterestSelection::new();
        assert!(selection.toggle("Fantasy"));
        assert!(selection.contains("fantasy"));
        assert!(!selection.toggle(" fantasy "));
        assert!(selection.is_empty());
        assert!(!selection.toggle("   "));
    }

    #[test]
    fn rating_event_is_clamped_and_serialized_with_type() {
        let event = InteractionEvent::rating("u1", "b1", 9);
        assert_eq!(event.rating, Some(5));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "rating");
        assert_eq!(json["rating"], 5);

        let click = serde_json::to_value(InteractionEvent::click("u1", "b1")).unwrap();
        assert!(click.get("rating").is_none());
    }

    #[test]
    fn metadata_interests_are_read_from_bag() {
        let user: User = serde_json::from_str(
            r#"{"id": 7, "name": "Ada", "metadata": {"interests": ["Mystery", "history"]}}"#,
        )
        .unwrap();
        assert_eq!(user.id, "7");
        assert_eq!(user.display_name, "Ada");
        let interests = user.metadata_interests().unwrap();
        assert!(interests.contains("mystery"));
        assert_eq!(interests.len(), 2);
    }
}
