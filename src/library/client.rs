//! HTTP implementation of [`LibraryApi`]

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::types::{
    BookSummary, LibraryRequest, ReservationRequest, ReservationResult, SearchQuery,
    SearchResponse,
};
use super::{LibraryApi, LibraryError};

/// Talks to the library API over HTTPS with JSON bodies.
///
/// Uses reqwest's default redirect policy, which the spreadsheet script
/// endpoint relies on (it answers POSTs with a redirect to the result).
#[derive(Clone)]
pub struct HttpLibraryClient {
    client: Client,
    endpoint: Url,
    cancel: CancellationToken,
}

impl HttpLibraryClient {
    /// Client that is never cancelled.
    pub fn new(endpoint: Url) -> Self {
        Self::with_cancellation(endpoint, CancellationToken::new())
    }

    /// Client whose in-flight calls fail with [`LibraryError::Cancelled`]
    /// once `cancel` fires.
    pub fn with_cancellation(endpoint: Url, cancel: CancellationToken) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            cancel,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, body: &LibraryRequest) -> Result<T, LibraryError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LibraryError::Cancelled),
            result = self.send(body) => result,
        }
    }

    async fn send<T: DeserializeOwned>(&self, body: &LibraryRequest) -> Result<T, LibraryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| LibraryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LibraryError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LibraryError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| LibraryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LibraryApi for HttpLibraryClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<BookSummary>, LibraryError> {
        let request = LibraryRequest::Search {
            query: query.as_str().to_string(),
        };
        let response: SearchResponse = self.call(&request).await?;
        let books = response.results.unwrap_or_default();
        debug!(query = query.as_str(), results = books.len(), "Search completed");
        Ok(books)
    }

    async fn reserve(
        &self,
        book_id: &str,
        user_name: &str,
    ) -> Result<ReservationResult, LibraryError> {
        let request: LibraryRequest = ReservationRequest {
            book_id: book_id.to_string(),
            user_name: user_name.to_string(),
        }
        .into();
        let result: ReservationResult = self.call(&request).await?;
        debug!(book_id, success = result.success, "Reservation completed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpLibraryClient {
        HttpLibraryClient::new(Url::parse(&server.uri()).unwrap())
    }

    fn query(s: &str) -> SearchQuery {
        SearchQuery::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_action_and_returns_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"action": "search", "query": "Tolstoy"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "1", "title": "War and Peace", "author": "Leo Tolstoy"},
                    {"id": 2, "title": "Anna Karenina", "author": "Leo Tolstoy"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let books = client.search(&query("  Tolstoy ")).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0], BookSummary::new("1", "War and Peace", "Leo Tolstoy"));
        assert_eq!(books[1].id, "2");
    }

    #[tokio::test]
    async fn test_search_without_results_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let books = client.search(&query("Nobody")).await.unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_search_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.search(&query("Tolstoy")).await.unwrap_err();
        assert!(matches!(err, LibraryError::Status(500)));
    }

    #[tokio::test]
    async fn test_search_malformed_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.search(&query("Tolstoy")).await.unwrap_err();
        assert!(matches!(err, LibraryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_search_empty_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.search(&query("Tolstoy")).await.unwrap_err();
        assert!(matches!(err, LibraryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_search_connection_failure_is_transport_error() {
        // Nothing listens on port 9 of the loopback interface
        let client = HttpLibraryClient::new(Url::parse("http://127.0.0.1:9/exec").unwrap());
        let err = client.search(&query("Tolstoy")).await.unwrap_err();
        assert!(matches!(err, LibraryError::Transport(_)));
    }

    #[tokio::test]
    async fn test_reserve_sends_book_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"action": "book", "bookId": "17", "userName": "Anna"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "title": "War and Peace"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.reserve("17", "Anna").await.unwrap();
        assert_eq!(result, ReservationResult::reserved("War and Peace"));
    }

    #[tokio::test]
    async fn test_reserve_returns_conflict_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "already_booked"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.reserve("17", "Anna").await.unwrap();
        assert_eq!(result, ReservationResult::already_booked());
    }

    #[tokio::test]
    async fn test_reserve_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.reserve("17", "Anna").await.unwrap_err();
        assert!(matches!(err, LibraryError::Status(403)));
    }

    #[tokio::test]
    async fn test_cancelled_client_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": []}))
                    .set_delay(std::time::Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let client =
            HttpLibraryClient::with_cancellation(Url::parse(&server.uri()).unwrap(), cancel.clone());
        cancel.cancel();

        let err = client.search(&query("Tolstoy")).await.unwrap_err();
        assert!(matches!(err, LibraryError::Cancelled));
    }
}
