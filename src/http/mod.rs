//! HTTP client for the choir site API.
//!
//! Single choke point for all network calls: resolves paths against the
//! configured base URL, injects the bearer token, serializes query strings
//! and JSON bodies, and normalizes every non-success response into a typed
//! [`ApiError`] carrying the server message, status, and raw body.
//!
//! ## Design
//! - Built on `reqwest`; no retry, no caching, no request timeout — a hung
//!   request blocks its caller.
//! - Token precedence: per-call override, else the value persisted in the
//!   [`SessionStore`], else no `Authorization` header.
//! - The client never mutates the session store.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::session::SessionStore;

/// Error surface for all API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. `message` is the server's `message` field when the
    /// body carries one, otherwise `HTTP <status>`.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        data: Value,
    },
    /// Network-level failure (unreachable host, DNS, TLS). No status code.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// A payload could not be serialized or decoded into the expected shape.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// A caller-supplied header name or value was not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// The HTTP status, when this error came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Request body: structured JSON or a multipart form (uploads).
pub enum RequestBody {
    Json(Value),
    Multipart(reqwest::multipart::Form),
}

/// Per-request options. All fields optional; construct with the builders.
#[derive(Default)]
pub struct RequestOptions {
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
    /// Explicit bearer token, overriding the session store for this call.
    pub token: Option<String>,
    /// Query pairs; `None` and empty-string values are dropped before
    /// serialization so meaningless filters never reach the wire.
    pub query: Vec<(String, Option<String>)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying a JSON body.
    pub fn json(value: &impl Serialize) -> Result<Self, ApiError> {
        Ok(Self {
            body: Some(RequestBody::Json(serde_json::to_value(value)?)),
            ..Self::default()
        })
    }

    /// Options carrying a multipart form body. The form supplies its own
    /// boundary-delimited content type.
    pub fn multipart(form: reqwest::multipart::Form) -> Self {
        Self {
            body: Some(RequestBody::Multipart(form)),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, query: Vec<(String, Option<String>)>) -> Self {
        self.query = query;
        self
    }
}

/// The shared HTTP client. Cheap to clone via `Arc` at the call sites.
pub struct HttpClient {
    base_url: String,
    store: Arc<SessionStore>,
    http: reqwest::Client,
}

impl HttpClient {
    /// Create a client for the given API base URL.
    pub fn new(base_url: impl Into<String>, store: Arc<SessionStore>) -> anyhow::Result<Self> {
        // Deliberately no timeout: request lifetime is bounded only by the
        // transport, matching the site client's fetch semantics.
        let http = reqwest::Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            store,
            http,
        })
    }

    /// Resolve a path against the base URL; absolute URLs pass through.
    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn build_headers(&self, opts: &RequestOptions) -> Result<HeaderMap, ApiError> {
        let mut map = HeaderMap::new();
        for (name, value) in &opts.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            map.insert(header, value);
        }
        if !map.contains_key(ACCEPT) {
            map.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        // JSON content type only for JSON bodies; multipart sets its own
        // boundary, and bodiless requests send none.
        if matches!(opts.body, Some(RequestBody::Json(_))) && !map.contains_key(CONTENT_TYPE) {
            map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let token = opts.token.clone().or_else(|| self.store.token());
        if let Some(token) = token {
            if !map.contains_key(AUTHORIZATION) {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ApiError::InvalidHeader("authorization".into()))?;
                map.insert(AUTHORIZATION, value);
            }
        }
        Ok(map)
    }

    /// Execute a request and normalize the response.
    ///
    /// JSON responses are parsed (a malformed JSON body degrades to an empty
    /// object rather than an error); anything else is surfaced as raw text.
    /// Non-success statuses reject with [`ApiError::Status`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        opts: RequestOptions,
    ) -> Result<Value, ApiError> {
        let url = self.resolve(path);
        let headers = self.build_headers(&opts)?;
        let query = filter_query(opts.query);

        let mut req = self.http.request(method.clone(), &url).headers(headers);
        if !query.is_empty() {
            req = req.query(&query);
        }
        match opts.body {
            Some(RequestBody::Json(value)) => {
                req = req.body(serde_json::to_vec(&value)?);
            }
            Some(RequestBody::Multipart(form)) => {
                req = req.multipart(form);
            }
            None => {}
        }

        let resp = req.send().await?;
        let status = resp.status();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let text = resp.text().await?;
        let data = if is_json {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
        } else {
            Value::String(text)
        };

        if !status.is_success() {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::debug!(%method, %url, status = status.as_u16(), "request rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
                data,
            });
        }
        Ok(data)
    }

    pub async fn get(&self, path: &str, opts: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::GET, path, opts).await
    }

    pub async fn post(&self, path: &str, opts: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::POST, path, opts).await
    }

    pub async fn put(&self, path: &str, opts: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, opts).await
    }

    pub async fn delete(&self, path: &str, opts: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, opts).await
    }
}

/// Drop query pairs whose value is absent or empty.
fn filter_query(pairs: Vec<(String, Option<String>)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .filter_map(|(key, value)| match value {
            Some(v) if !v.is_empty() => Some((key, v)),
            _ => None,
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, User};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str) -> (TempDir, Arc<SessionStore>, HttpClient) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new(tmp.path(), "choirAuthToken", "choirUser"));
        let client = HttpClient::new(base_url, store.clone()).unwrap();
        (tmp, store, client)
    }

    fn stored_user() -> User {
        User {
            id: "u-1".into(),
            name: "Grace".into(),
            role: Role::Admin,
            email: None,
        }
    }

    #[test]
    fn filter_query_drops_empty_and_missing_values() {
        let filtered = filter_query(vec![
            ("limit".into(), Some("50".into())),
            ("sort".into(), None),
            ("q".into(), Some(String::new())),
        ]);
        assert_eq!(filtered, vec![("limit".to_string(), "50".to_string())]);
    }

    #[test]
    fn resolve_joins_relative_and_passes_absolute() {
        let (_tmp, _store, client) = client_for("http://localhost:5000/ChoirSite/");
        assert_eq!(
            client.resolve("/schedule"),
            "http://localhost:5000/ChoirSite/schedule"
        );
        assert_eq!(
            client.resolve("schedule"),
            "http://localhost:5000/ChoirSite/schedule"
        );
        assert_eq!(
            client.resolve("https://elsewhere.example/x"),
            "https://elsewhere.example/x"
        );
    }

    #[tokio::test]
    async fn query_serialization_sends_only_populated_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schedule"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        let opts = RequestOptions::new().with_query(vec![
            ("limit".into(), Some("50".into())),
            ("sort".into(), None),
            ("q".into(), Some(String::new())),
        ]);
        client.get("/schedule", opts).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let pairs: Vec<(String, String)> = requests[0]
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, vec![("limit".to_string(), "50".to_string())]);
    }

    #[tokio::test]
    async fn non_success_status_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schedule/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Not found" })),
            )
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        let err = client
            .get("/schedule/missing", RequestOptions::new())
            .await
            .unwrap_err();

        match err {
            ApiError::Status {
                status,
                message,
                data,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not found");
                assert_eq!(data["message"], "Not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_http_status_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/boom"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        let err = client.get("/boom", RequestOptions::new()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn malformed_json_success_body_degrades_to_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/odd"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("{truncated", "application/json"),
            )
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        let data = client.get("/odd", RequestOptions::new()).await.unwrap();
        assert_eq!(data, json!({}));
    }

    #[tokio::test]
    async fn explicit_token_takes_precedence_over_stored_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer explicit-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": null })))
            .mount(&server)
            .await;

        let (_tmp, store, client) = client_for(&server.uri());
        store.save("stored-token", &stored_user()).unwrap();

        client
            .get("/auth/me", RequestOptions::new().with_token("explicit-token"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stored_token_is_injected_when_no_override_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer stored-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": null })))
            .mount(&server)
            .await;

        let (_tmp, store, client) = client_for(&server.uri());
        store.save("stored-token", &stored_user()).unwrap();

        client.get("/auth/me", RequestOptions::new()).await.unwrap();
    }

    #[tokio::test]
    async fn no_authorization_header_without_any_token() {
        let server = MockServer::start().await;
        // Ordered mocks: a request carrying Authorization would match the
        // first mock and fail the expectation.
        Mock::given(method("GET"))
            .and(path("/schedule"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/schedule"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        client.get("/schedule", RequestOptions::new()).await.unwrap();
    }

    #[tokio::test]
    async fn json_body_sets_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/schedule"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "s1" })))
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        let opts = RequestOptions::json(&json!({ "title": "Rehearsal" })).unwrap();
        let data = client.post("/schedule", opts).await.unwrap();
        assert_eq!(data["id"], "s1");
    }

    #[test]
    fn multipart_body_gets_no_json_content_type() {
        // The form supplies its own boundary content type at send time.
        let (_tmp, _store, client) = client_for("http://localhost:5000/ChoirSite");
        let opts = RequestOptions::multipart(reqwest::multipart::Form::new());
        let headers = client.build_headers(&opts).unwrap();
        assert!(headers.get(CONTENT_TYPE).is_none());
        assert_eq!(
            headers.get(ACCEPT).unwrap().to_str().unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn plain_text_success_body_is_returned_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let (_tmp, _store, client) = client_for(&server.uri());
        let data = client.get("/plain", RequestOptions::new()).await.unwrap();
        assert_eq!(data, json!("pong"));
    }

    #[tokio::test]
    async fn transport_failure_has_no_status() {
        // Nothing listens on this port.
        let (_tmp, _store, client) = client_for("http://127.0.0.1:1");
        let err = client
            .get("/schedule", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status(), None);
    }
}
