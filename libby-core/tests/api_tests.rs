use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use libby_core::{ApiClient, ApiError, InterestSelection, TrendingPeriod};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(reqwest::Client::new(), &server.uri()).unwrap()
}

#[tokio::test]
async fn search_accepts_wrapped_books() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books/search"))
        .and(query_param("q", "dune"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "books": [
                { "id": 1, "title": "Dune", "author": "Frank Herbert", "rating": 4.5, "pages": 412 },
                { "id": "2", "title": "Dune Messiah" }
            ],
            "count": 2
        })))
        .mount(&server)
        .await;

    let books = client_for(&server).search("dune", 10).await.unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].id, "1");
    assert_eq!(books[0].page_count, Some(412));
    assert_eq!(books[1].author, None);
}

#[tokio::test]
async fn trending_sends_period_and_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books/trending"))
        .and(query_param("period", "monthly"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 3, "title": "Emma" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let books = client_for(&server)
        .trending(TrendingPeriod::Monthly, 20)
        .await
        .unwrap();
    assert_eq!(books[0].title, "Emma");
}

#[tokio::test]
async fn unexpected_shape_is_invalid_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/genres/fantasy/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .books_by_genre("fantasy", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidData(_)));
    assert!(err.to_string().starts_with("invalid data format"));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).book("404").await.unwrap_err();
    match err {
        ApiError::Status { status, endpoint } => {
            assert_eq!(status, 404);
            assert_eq!(endpoint, "/api/books/404");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn book_detail_accepts_wrapped_book() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "book": { "id": 9, "title": "Middlemarch", "isbn": "9780141439549", "language": "en" }
        })))
        .mount(&server)
        .await;

    let book = client_for(&server).book("9").await.unwrap();
    assert_eq!(book.title, "Middlemarch");
    assert_eq!(book.isbn.as_deref(), Some("9780141439549"));
}

#[tokio::test]
async fn genres_accept_wrapped_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/genres"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "genres": ["Fantasy", "Poetry"] })),
        )
        .mount(&server)
        .await;

    let genres = client_for(&server).genres().await.unwrap();
    assert_eq!(genres, vec!["Fantasy".to_string(), "Poetry".to_string()]);
}

#[tokio::test]
async fn profile_interests_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/profile/u1/interests"))
        .and(body_json(json!({ "interests": ["fantasy", "mystery"] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/profile/u1/interests"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "interests": ["Mystery", "fantasy"] })),
        )
        .mount(&server)
        .await;

    let api = client_for(&server);
    api.set_profile_interests("u1", &InterestSelection::from_tags(["mystery", "fantasy"]))
        .await
        .unwrap();
    let interests = api.profile_interests("u1").await.unwrap();
    assert_eq!(interests, InterestSelection::from_tags(["fantasy", "mystery"]));
}

#[tokio::test]
async fn account_calls_carry_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/change-password"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({ "current_password": "old", "new_password": "new" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/auth/account"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    api.change_password("tok", "old", "new").await.unwrap();
    api.delete_account("tok").await.unwrap();
}

#[tokio::test]
async fn expired_token_requires_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server).me("stale").await.unwrap_err();
    assert!(matches!(err, ApiError::AuthRequired));
}
