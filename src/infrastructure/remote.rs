//! Remote quote source over HTTP.
//!
//! The endpoint is a placeholder REST API returning a JSON array of posts.
//! Only `title` and `body` are used; everything else is ignored.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::{AppError, Quote, Result, SyncConfig};

/// A record from the remote collection, before it becomes a quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePost {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub body: Option<String>,
}

impl RemotePost {
    /// Lenient extraction from one element of the remote array.
    ///
    /// Empty strings count as absent; numbers are stringified.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: value.get("id").and_then(Value::as_u64),
            title: value.get("title").and_then(field_text),
            body: value.get("body").and_then(field_text),
        }
    }
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode a response body into remote posts.
///
/// # Errors
/// Returns [`AppError::Decode`] if the body is not a JSON array.
pub fn decode_posts(body: &str) -> Result<Vec<RemotePost>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AppError::decode(format!("Response is not JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(AppError::decode("Response is not a JSON array"));
    };

    Ok(items.iter().map(RemotePost::from_value).collect())
}

/// Where synced quotes come from.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch at most `limit` records from the remote collection.
    async fn fetch_posts(&self, limit: usize) -> Result<Vec<RemotePost>>;

    /// Publish a locally added quote. The response body is not used.
    async fn post_quote(&self, quote: &Quote) -> Result<()>;
}

/// [`QuoteSource`] backed by `reqwest`.
pub struct HttpQuoteSource {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpQuoteSource {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("quote-deck/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// URL of one page of the collection.
    fn page_url(&self, limit: usize) -> String {
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{sep}_limit={limit}", self.endpoint)
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_posts(&self, limit: usize) -> Result<Vec<RemotePost>> {
        let url = self.page_url(limit);
        tracing::debug!(%url, "Fetching remote quotes");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(AppError::network)?;
        let resp = check_response(resp).await?;

        let body = resp.text().await.map_err(AppError::network)?;
        let mut posts = decode_posts(&body)?;
        posts.truncate(limit);
        Ok(posts)
    }

    async fn post_quote(&self, quote: &Quote) -> Result<()> {
        let payload = json!({
            "title": quote.text,
            "body": quote.category,
            "userId": 1,
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(AppError::network)?;
        let resp = check_response(resp).await?;

        tracing::info!(status = resp.status().as_u16(), "Posted quote to server");
        Ok(())
    }
}

/// Map a non-success status to [`AppError::Network`].
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AppError::Network {
            message: format!("HTTP {}: {}", status.as_u16(), truncate_body(&body)),
            source: None,
        });
    }
    Ok(resp)
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(120) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {"userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit"},
        {"userId": 1, "id": 2, "title": "", "body": "est rerum tempore"},
        {"userId": 1, "id": 3},
        {"userId": 1, "id": 4, "title": 1234}
    ]"#;

    fn mock_response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(::http::Response::builder().status(status).body(body).unwrap())
    }

    #[test]
    fn decode_posts_fixture() {
        let posts = decode_posts(FIXTURE).unwrap();
        assert_eq!(posts.len(), 4);
        assert_eq!(posts[0].title.as_deref(), Some("sunt aut facere"));
        assert_eq!(posts[0].id, Some(1));
        assert_eq!(posts[1].title, None);
        assert_eq!(posts[1].body.as_deref(), Some("est rerum tempore"));
        assert_eq!(posts[2], RemotePost { id: Some(3), ..RemotePost::default() });
        assert_eq!(posts[3].title.as_deref(), Some("1234"));
    }

    #[test]
    fn decode_rejects_non_array() {
        let err = decode_posts(r#"{"title": "x"}"#).unwrap_err();
        assert!(matches!(err, AppError::Decode { .. }));

        let err = decode_posts("<html>").unwrap_err();
        assert!(matches!(err, AppError::Decode { .. }));
    }

    #[test]
    fn page_url_appends_limit() {
        let source = HttpQuoteSource::new(&SyncConfig::default()).unwrap();
        assert_eq!(
            source.page_url(5),
            "https://jsonplaceholder.typicode.com/posts?_limit=5"
        );

        let config = SyncConfig {
            endpoint: "http://localhost:3000/posts?userId=1".into(),
            ..SyncConfig::default()
        };
        let source = HttpQuoteSource::new(&config).unwrap();
        assert_eq!(
            source.page_url(2),
            "http://localhost:3000/posts?userId=1&_limit=2"
        );
    }

    #[tokio::test]
    async fn check_response_maps_failure_status() {
        let err = check_response(mock_response(503, "down")).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("HTTP 503: down"));
    }

    #[tokio::test]
    async fn check_response_success() {
        assert!(check_response(mock_response(200, "[]")).await.is_ok());
    }
}
