//! Client for the external book and recommendation API.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    Book, BookListPayload, InteractionEvent, InterestSelection, RecommendationSource,
    TrendingPeriod, User, WishlistEntry,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(alias = "access_token")]
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagListPayload {
    Bare(Vec<String>),
    Interests { interests: Vec<String> },
    Genres { genres: Vec<String> },
}

impl TagListPayload {
    fn into_tags(self) -> Vec<String> {
        match self {
            TagListPayload::Bare(tags) => tags,
            TagListPayload::Interests { interests } => interests,
            TagListPayload::Genres { genres } => genres,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WishlistPayload {
    Entries(Vec<WishlistEntry>),
    Wrapped { wishlist: Vec<WishlistEntry> },
    Books(BookListPayload),
}

impl WishlistPayload {
    fn into_entries(self) -> Vec<WishlistEntry> {
        match self {
            WishlistPayload::Entries(entries) => entries,
            WishlistPayload::Wrapped { wishlist } => wishlist,
            WishlistPayload::Books(books) => books
                .into_books()
                .into_iter()
                .map(WishlistEntry::new)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserPayload {
    Wrapped { user: User },
    Bare(User),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidData(format!(
                "{base_url} cannot be used as an API base url"
            )));
        }
        Ok(Self { client, base })
    }

    /// Builds the HTTP client from configuration (timeout, user agent).
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::new(client, &config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let res = req.send().await?;
        let status = res.status();
        let endpoint = res.url().path().to_string();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthRequired);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                endpoint,
            });
        }
        let bytes = res.bytes().await?;
        debug!(%endpoint, len = bytes.len(), "api response");
        Ok(bytes.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let bytes = self.send(req).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidData(e.to_string()))
    }

    async fn get_books(&self, url: Url) -> Result<Vec<Book>, ApiError> {
        let payload: BookListPayload = self.send_json(self.request(Method::GET, url, None)).await?;
        Ok(payload.into_books())
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Book>, ApiError> {
        let mut url = self.endpoint(&["api", "books", "search"]);
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string());
        self.get_books(url).await
    }

    pub async fn book(&self, id: &str) -> Result<Book, ApiError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum BookPayload {
            Wrapped { book: Book },
            Bare(Book),
        }

        let url = self.endpoint(&["api", "books", id]);
        let payload: BookPayload = self.send_json(self.request(Method::GET, url, None)).await?;
        Ok(match payload {
            BookPayload::Wrapped { book } => book,
            BookPayload::Bare(book) => book,
        })
    }

    pub async fn trending(
        &self,
        period: TrendingPeriod,
        limit: usize,
    ) -> Result<Vec<Book>, ApiError> {
        let mut url = self.endpoint(&["api", "books", "trending"]);
        url.query_pairs_mut()
            .append_pair("period", period.as_str())
            .append_pair("limit", &limit.to_string());
        self.get_books(url).await
    }

    pub async fn genres(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["api", "genres"]);
        let payload: TagListPayload = self.send_json(self.request(Method::GET, url, None)).await?;
        Ok(payload.into_tags())
    }

    pub async fn books_by_genre(&self, genre: &str, limit: usize) -> Result<Vec<Book>, ApiError> {
        let mut url = self.endpoint(&["api", "genres", genre, "books"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_books(url).await
    }

    pub async fn recommendations(
        &self,
        source: RecommendationSource,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Book>, ApiError> {
        let mut url = self.endpoint(&["api", "recommendations", source.as_str(), user_id]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_books(url).await
    }

    /// Posts an interaction; an empty response body comes back as `Null`.
    pub async fn track_interaction(&self, event: &InteractionEvent) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "interactions", "click"]);
        let bytes = self
            .send(self.request(Method::POST, url, None).json(event))
            .await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidData(e.to_string()))
    }

    pub async fn profile_interests(&self, user_id: &str) -> Result<InterestSelection, ApiError> {
        let url = self.endpoint(&["api", "profile", user_id, "interests"]);
        let payload: TagListPayload = self.send_json(self.request(Method::GET, url, None)).await?;
        Ok(InterestSelection::from_tags(payload.into_tags()))
    }

    pub async fn set_profile_interests(
        &self,
        user_id: &str,
        selection: &InterestSelection,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "profile", user_id, "interests"]);
        let body = json!({ "interests": selection.to_vec() });
        self.send(self.request(Method::POST, url, None).json(&body))
            .await?;
        Ok(())
    }

    pub async fn wishlist(&self, user_id: &str) -> Result<Vec<WishlistEntry>, ApiError> {
        let url = self.endpoint(&["api", "wishlist", user_id]);
        let payload: WishlistPayload = self.send_json(self.request(Method::GET, url, None)).await?;
        Ok(payload.into_entries())
    }

    pub async fn add_to_wishlist(&self, user_id: &str, book: &Book) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "wishlist", user_id]);
        let body = json!({ "book_id": book.id, "book": book });
        self.send(self.request(Method::POST, url, None).json(&body))
            .await?;
        Ok(())
    }

    pub async fn remove_from_wishlist(&self, user_id: &str, book_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "wishlist", user_id, book_id]);
        self.send(self.request(Method::DELETE, url, None)).await?;
        Ok(())
    }

    pub async fn clear_wishlist(&self, user_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "wishlist", user_id]);
        self.send(self.request(Method::DELETE, url, None)).await?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let url = self.endpoint(&["api", "auth", "login"]);
        let body = json!({ "email": email, "password": password });
        self.send_json(self.request(Method::POST, url, None).json(&body))
            .await
    }

    pub async fn me(&self, token: &str) -> Result<User, ApiError> {
        let url = self.endpoint(&["api", "auth", "me"]);
        let payload: UserPayload = self
            .send_json(self.request(Method::GET, url, Some(token)))
            .await?;
        Ok(match payload {
            UserPayload::Wrapped { user } => user,
            UserPayload::Bare(user) => user,
        })
    }

    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "auth", "change-password"]);
        let body = json!({
            "current_password": current_password,
            "new_password": new_password,
        });
        self.send(self.request(Method::POST, url, Some(token)).json(&body))
            .await?;
        Ok(())
    }

    pub async fn delete_account(&self, token: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "auth", "account"]);
        self.send(self.request(Method::DELETE, url, Some(token)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path_and_escapes_segments() {
        let api = ApiClient::new(Client::new(), "http://host:5000/backend/").unwrap();
        let url = api.endpoint(&["api", "genres", "science fiction", "books"]);
        assert_eq!(
            url.as_str(),
            "http://host:5000/backend/api/genres/science%20fiction/books"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(ApiClient::new(Client::new(), "mailto:libby@example.edu").is_err());
        assert!(ApiClient::new(Client::new(), "not a url").is_err());
    }
}
