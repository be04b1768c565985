//! HTTP/JSON implementation of [`HighlightStore`] against the chat backend's
//! highlights API.
//!
//! | call | request |
//! |---|---|
//! | add | `POST {base}/api/highlights/{id}` |
//! | remove range | `POST {base}/api/highlights/{id}/remove` |
//! | get | `GET {base}/api/highlights/{id}` (404 is "nothing stored") |
//! | clear | `DELETE {base}/api/highlights/{id}` (404 is "nothing stored") |
//! | exists | `GET {base}/api/highlights/exists/{id}` |

use std::time::Duration;

use async_trait::async_trait;
use highlight_sync_engine::{HighlightSet, HighlightStore, NewHighlight, StoreError};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddRequest<'a> {
    session_id: &'a str,
    #[serde(flatten)]
    highlight: &'a NewHighlight,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    start: usize,
    end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

/// Highlight store backed by the remote highlights API.
///
/// Use [`HttpHighlightStore::builder`] to adjust timeouts.
///
/// The service requires a session id on every add. Callers that have none
/// get the store's own, generated once per store unless set on the builder.
#[derive(Debug, Clone)]
pub struct HttpHighlightStore {
    base_url: Url,
    session_id: String,
    client: reqwest::Client,
}

impl HttpHighlightStore {
    pub fn builder(base_url: impl Into<String>) -> HttpStoreBuilder {
        HttpStoreBuilder::new(base_url)
    }

    /// A store with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        Self::builder(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session id sent with adds whose caller supplies none.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// `{base}/api/highlights/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Transport {
                url: self.base_url.to_string(),
                detail: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "highlights"])
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, StoreError> {
        request.send().await.map_err(|e| StoreError::Transport {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| StoreError::Transport {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl HighlightStore for HttpHighlightStore {
    async fn add_highlight(
        &self,
        content_id: &str,
        session_id: Option<&str>,
        highlight: &NewHighlight,
    ) -> Result<HighlightSet, StoreError> {
        let url = self.endpoint(&[content_id])?;
        log::debug!("POST {url} [{}..{}]", highlight.start, highlight.end);
        let body = AddRequest {
            session_id: session_id.unwrap_or(&self.session_id),
            highlight,
        };
        let response = self.send(self.client.post(url.clone()).json(&body), &url).await?;
        Self::decode(response, &url).await
    }

    async fn remove_highlight_range(
        &self,
        content_id: &str,
        start: usize,
        end: usize,
        text: Option<&str>,
    ) -> Result<HighlightSet, StoreError> {
        let url = self.endpoint(&[content_id, "remove"])?;
        log::debug!("POST {url} [{start}..{end}]");
        let body = RemoveRequest { start, end, text };
        let response = self.send(self.client.post(url.clone()).json(&body), &url).await?;
        Self::decode(response, &url).await
    }

    async fn get_highlights(&self, content_id: &str) -> Result<Option<HighlightSet>, StoreError> {
        let url = self.endpoint(&[content_id])?;
        log::debug!("GET {url}");
        let response = self.send(self.client.get(url.clone()), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response, &url).await.map(Some)
    }

    async fn clear_highlights(&self, content_id: &str) -> Result<bool, StoreError> {
        let url = self.endpoint(&[content_id])?;
        log::debug!("DELETE {url}");
        let response = self.send(self.client.delete(url.clone()), &url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StoreError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn highlights_exist(&self, content_id: &str) -> Result<bool, StoreError> {
        let url = self.endpoint(&["exists", content_id])?;
        log::debug!("GET {url}");
        let response = self.send(self.client.get(url.clone()), &url).await?;
        let body: ExistsResponse = Self::decode(response, &url).await?;
        Ok(body.exists)
    }
}

/// Builder for [`HttpHighlightStore`].
pub struct HttpStoreBuilder {
    base_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    session_id: Option<String>,
    client: Option<reqwest::Client>,
}

impl HttpStoreBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
            session_id: None,
            client: None,
        }
    }

    /// Override the TCP connect timeout (default 3 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the per-request timeout (default 10 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fallback session id for adds. A random one is generated otherwise.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Use a preconfigured client. The timeouts set on this builder are then ignored.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<HttpHighlightStore, StoreError> {
        let base_url = Url::parse(&self.base_url).map_err(|e| StoreError::Transport {
            url: self.base_url.clone(),
            detail: format!("invalid base URL: {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Transport {
                url: self.base_url,
                detail: "base URL cannot carry a path".to_string(),
            });
        }

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout)
                .timeout(self.request_timeout)
                .build()
                .unwrap_or_default(),
        };

        let session_id = self
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(HttpHighlightStore {
            base_url,
            session_id,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use highlight_sync_engine::HighlightRange;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(base_url: &str) -> HttpHighlightStore {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpHighlightStore::builder(base_url)
            .session_id("store-session")
            .client(client)
            .build()
            .unwrap()
    }

    fn stored() -> Value {
        json!({
            "messageId": "msg-1",
            "sessionId": "s-1",
            "ranges": [
                {"start": 0, "end": 5, "text": "Hello"},
                {"start": 3, "end": 8, "text": null}
            ],
            "createdAt": "2024-05-01T10:00:00",
            "updatedAt": "2024-05-01T10:01:00"
        })
    }

    #[test]
    fn test_endpoint_appends_encoded_segments() {
        let store = store("http://localhost:8000");

        let url = store.endpoint(&["a/b c"]).unwrap();

        assert_eq!(url.as_str(), "http://localhost:8000/api/highlights/a%2Fb%20c");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let store = store("https://chat.example.com/backend/");

        let url = store.endpoint(&["exists", "m1"]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://chat.example.com/backend/api/highlights/exists/m1"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpHighlightStore::new("not a url"),
            Err(StoreError::Transport { .. })
        ));
        assert!(HttpHighlightStore::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_generated_session_ids_differ_per_store() {
        let first = HttpHighlightStore::new("http://localhost:8000").unwrap();
        let second = HttpHighlightStore::new("http://localhost:8000").unwrap();

        assert!(Uuid::parse_str(first.session_id()).is_ok());
        assert_ne!(first.session_id(), second.session_id());
    }

    #[test]
    fn test_add_body_is_flat_camel_case() {
        let highlight = NewHighlight {
            start: 3,
            end: 8,
            text: Some("lo wo".to_string()),
            color: None,
        };
        let body = AddRequest {
            session_id: "s-1",
            highlight: &highlight,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"sessionId": "s-1", "start": 3, "end": 8, "text": "lo wo"})
        );
    }

    #[tokio::test]
    async fn test_add_posts_and_decodes_authoritative_set() {
        // Given a server that answers with the stored document
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/highlights/msg-1"))
            .and(body_json(json!({
                "sessionId": "s-1",
                "start": 3,
                "end": 8,
                "color": "pink"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored()))
            .expect(1)
            .mount(&server)
            .await;
        let highlight = NewHighlight {
            start: 3,
            end: 8,
            text: None,
            color: Some("pink".to_string()),
        };

        // When adding a highlight
        let set = store(&server.uri())
            .add_highlight("msg-1", Some("s-1"), &highlight)
            .await
            .unwrap();

        // Then the answer is decoded, null text included
        assert_eq!(
            set.ranges,
            vec![
                HighlightRange::new(0, 5).with_text("Hello"),
                HighlightRange::new(3, 8),
            ]
        );
        assert_eq!(set.content_id, "msg-1");
    }

    #[tokio::test]
    async fn test_add_without_session_sends_store_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/highlights/msg-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored()))
            .mount(&server)
            .await;
        let highlight = NewHighlight {
            start: 0,
            end: 5,
            text: Some("Hello".to_string()),
            color: None,
        };

        store(&server.uri())
            .add_highlight("msg-1", None, &highlight)
            .await
            .unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        let body = request.body_json::<Value>().unwrap();
        assert_eq!(
            body,
            json!({"sessionId": "store-session", "start": 0, "end": 5, "text": "Hello"})
        );
    }

    #[tokio::test]
    async fn test_remove_posts_to_remove_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/highlights/msg-1/remove"))
            .and(body_json(json!({"start": 2, "end": 4, "text": "ll"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"messageId": "msg-1", "ranges": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let set = store(&server.uri())
            .remove_highlight_range("msg-1", 2, 4, Some("ll"))
            .await
            .unwrap();

        assert!(set.ranges.is_empty());
    }

    #[tokio::test]
    async fn test_get_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/highlights/msg-1"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Highlights not found"})),
            )
            .mount(&server)
            .await;

        assert_eq!(store(&server.uri()).get_highlights("msg-1").await, Ok(None));
    }

    #[tokio::test]
    async fn test_clear_not_found_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/highlights/msg-1"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Highlights not found"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(store(&server.uri()).clear_highlights("msg-1").await, Ok(false));
    }

    #[tokio::test]
    async fn test_clear_success_is_true() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/highlights/msg-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "cleared"})))
            .mount(&server)
            .await;

        assert_eq!(store(&server.uri()).clear_highlights("msg-1").await, Ok(true));
    }

    #[tokio::test]
    async fn test_exists_reads_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/highlights/exists/msg-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": true})))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(store(&server.uri()).highlights_exist("msg-1").await, Ok(true));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"detail": "Database error"})),
            )
            .mount(&server)
            .await;

        let result = store(&server.uri()).get_highlights("msg-1").await;

        assert_eq!(
            result,
            Err(StoreError::Http {
                status: 503,
                url: format!("{}/api/highlights/msg-1", server.uri()),
            })
        );
    }

    #[tokio::test]
    async fn test_garbage_body_maps_to_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = store(&server.uri()).highlights_exist("msg-1").await;

        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_refused_connection_maps_to_transport_error() {
        // Given a port nobody listens on any more
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = store(&base).get_highlights("msg-1").await;

        assert!(matches!(result, Err(StoreError::Transport { .. })));
    }
}
