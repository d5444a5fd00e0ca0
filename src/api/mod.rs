//! Typed endpoint sets over the HTTP client.
//!
//! Each server-side collection gets a uniform CRUD surface via
//! [`Resource`], parameterized by path and record type so the compiler
//! checks both. Non-uniform endpoint sets (auth, media upload, the legacy
//! member routes) are declared alongside.
//!
//! The façade adds nothing on top of the client: no validation, no retry,
//! no caching. Errors propagate unchanged.

pub mod records;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::User;
use crate::http::{ApiError, HttpClient, RequestOptions};

use records::{Commission, ContentEntry, Donation, EventRecord, MediaItem, Member, ScheduleEntry};

/// Pagination and filter parameters for list calls.
///
/// All fields are optional; unset or empty values never reach the wire.
/// The metadata is query-supplied only — the client does not enforce it.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sort key, e.g. `-createdAt` for newest-first.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn search(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    fn to_pairs(&self) -> Vec<(String, Option<String>)> {
        vec![
            ("limit".into(), self.limit.map(|n| n.to_string())),
            ("page".into(), self.page.map(|n| n.to_string())),
            ("sort".into(), self.sort.clone()),
            ("q".into(), self.q.clone()),
        ]
    }
}

/// Container shape of every list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Uniform CRUD operations for one named collection.
pub struct Resource<T> {
    http: Arc<HttpClient>,
    path: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Resource<T> {
    fn new(http: Arc<HttpClient>, path: &'static str) -> Self {
        Self {
            http,
            path,
            _marker: PhantomData,
        }
    }

    /// `GET /{resource}`
    pub async fn list(&self, query: ListQuery) -> Result<ListEnvelope<T>, ApiError> {
        let data = self
            .http
            .get(
                &format!("/{}", self.path),
                RequestOptions::new().with_query(query.to_pairs()),
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `GET /{resource}/{id}`
    pub async fn get(&self, id: &str) -> Result<T, ApiError> {
        let data = self
            .http
            .get(&format!("/{}/{}", self.path, id), RequestOptions::new())
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `POST /{resource}` — the returned record reflects server-applied
    /// defaults (assigned id, timestamps).
    pub async fn create(&self, payload: &impl Serialize) -> Result<T, ApiError> {
        let data = self
            .http
            .post(&format!("/{}", self.path), RequestOptions::json(payload)?)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `PUT /{resource}/{id}`
    pub async fn update(&self, id: &str, payload: &impl Serialize) -> Result<T, ApiError> {
        let data = self
            .http
            .put(
                &format!("/{}/{}", self.path, id),
                RequestOptions::json(payload)?,
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `DELETE /{resource}/{id}`
    pub async fn remove(&self, id: &str) -> Result<Value, ApiError> {
        self.http
            .delete(&format!("/{}/{}", self.path, id), RequestOptions::new())
            .await
    }
}

// ── Auth endpoints ──────────────────────────────────────────────────

/// Login payload. The server accepts either a username or an email in the
/// first field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub username_or_email: String,
    pub password: String,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// `{token, user}` returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Identity-check response. The server may omit the user, in which case the
/// caller keeps whatever it already had.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<User>,
}

/// The `/auth/*` endpoint set.
pub struct AuthApi {
    http: Arc<HttpClient>,
}

impl AuthApi {
    /// `POST /auth/register`
    pub async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, ApiError> {
        let data = self
            .http
            .post("/auth/register", RequestOptions::json(payload)?)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `POST /auth/login`
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let data = self
            .http
            .post("/auth/login", RequestOptions::json(credentials)?)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `GET /auth/me` — relies on the bearer token already persisted in the
    /// session store.
    pub async fn me(&self) -> Result<MeResponse, ApiError> {
        let data = self.http.get("/auth/me", RequestOptions::new()).await?;
        Ok(serde_json::from_value(data)?)
    }
}

// ── Media ───────────────────────────────────────────────────────────

/// Media: generic CRUD plus a multipart upload endpoint.
pub struct MediaApi {
    http: Arc<HttpClient>,
    resource: Resource<MediaItem>,
}

impl MediaApi {
    pub async fn list(&self, query: ListQuery) -> Result<ListEnvelope<MediaItem>, ApiError> {
        self.resource.list(query).await
    }

    pub async fn get(&self, id: &str) -> Result<MediaItem, ApiError> {
        self.resource.get(id).await
    }

    pub async fn create(&self, payload: &impl Serialize) -> Result<MediaItem, ApiError> {
        self.resource.create(payload).await
    }

    pub async fn update(&self, id: &str, payload: &impl Serialize) -> Result<MediaItem, ApiError> {
        self.resource.update(id, payload).await
    }

    pub async fn remove(&self, id: &str) -> Result<Value, ApiError> {
        self.resource.remove(id).await
    }

    /// `POST /media/upload` with a multipart form. Bypasses the JSON body
    /// path; the form's `file`, `title`, `description`, and `type` parts
    /// match what the server's upload handler reads.
    pub async fn upload(&self, form: reqwest::multipart::Form) -> Result<MediaItem, ApiError> {
        let data = self
            .http
            .post("/media/upload", RequestOptions::multipart(form))
            .await?;
        Ok(serde_json::from_value(data)?)
    }
}

// ── Members (legacy non-uniform routes) ─────────────────────────────

/// The member endpoints predate the uniform CRUD layout and keep their
/// original paths, including a multipart create that carries an `image`
/// part and a lookup by URL-encoded display name.
pub struct MembersApi {
    http: Arc<HttpClient>,
}

impl MembersApi {
    /// `POST /member/addmember` — multipart form with an `image` part.
    pub async fn create(&self, form: reqwest::multipart::Form) -> Result<Member, ApiError> {
        let data = self
            .http
            .post("/member/addmember", RequestOptions::multipart(form))
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `GET /member/list` — tolerates both a bare array and an
    /// `{items: [...]}` envelope.
    pub async fn list(&self) -> Result<Vec<Member>, ApiError> {
        let data = self.http.get("/member/list", RequestOptions::new()).await?;
        let items = match data {
            Value::Array(_) => serde_json::from_value(data)?,
            Value::Object(mut map) => match map.remove("items") {
                Some(items) => serde_json::from_value(items)?,
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(items)
    }

    /// `GET /member/getMemberbyId/{id}`
    pub async fn get_by_id(&self, id: &str) -> Result<Member, ApiError> {
        let data = self
            .http
            .get(&format!("/member/getMemberbyId/{id}"), RequestOptions::new())
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `GET /member/getMemberbyname/{name}` — the name is URL-encoded.
    pub async fn get_by_name(&self, name: &str) -> Result<Member, ApiError> {
        let encoded = urlencoding::encode(name);
        let data = self
            .http
            .get(
                &format!("/member/getMemberbyname/{encoded}"),
                RequestOptions::new(),
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `PUT /member/UpdateMember/{id}`
    pub async fn update(&self, id: &str, payload: &impl Serialize) -> Result<Member, ApiError> {
        let data = self
            .http
            .put(
                &format!("/member/UpdateMember/{id}"),
                RequestOptions::json(payload)?,
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `DELETE /member/deleteMember/{id}`
    pub async fn remove(&self, id: &str) -> Result<Value, ApiError> {
        self.http
            .delete(&format!("/member/deleteMember/{id}"), RequestOptions::new())
            .await
    }
}

// ── Root façade ─────────────────────────────────────────────────────

/// Entry point bundling every endpoint set over one shared client.
#[derive(Clone)]
pub struct Api {
    http: Arc<HttpClient>,
}

impl Api {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi {
            http: self.http.clone(),
        }
    }

    pub fn schedule(&self) -> Resource<ScheduleEntry> {
        Resource::new(self.http.clone(), "schedule")
    }

    pub fn commission(&self) -> Resource<Commission> {
        Resource::new(self.http.clone(), "commission")
    }

    pub fn event(&self) -> Resource<EventRecord> {
        Resource::new(self.http.clone(), "event")
    }

    /// Donation creation is accepted without auth by the backend (public
    /// support page); everything else behaves like the other resources.
    pub fn donation(&self) -> Resource<Donation> {
        Resource::new(self.http.clone(), "donation")
    }

    pub fn content(&self) -> Resource<ContentEntry> {
        Resource::new(self.http.clone(), "content")
    }

    pub fn media(&self) -> MediaApi {
        MediaApi {
            http: self.http.clone(),
            resource: Resource::new(self.http.clone(), "media"),
        }
    }

    pub fn members(&self) -> MembersApi {
        MembersApi {
            http: self.http.clone(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
