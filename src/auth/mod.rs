//! Session lifecycle and role-based authorization.
//!
//! [`AuthManager`] is the single runtime authority for "who is signed in"
//! and "what can they do". It is constructor-injected (no ambient global)
//! and intended to live once per application:
//! - `init` reconciles the persisted session with the server, adopting the
//!   stored user immediately and then letting the server's copy win.
//! - `login`/`register` persist `{token, user}` together and never return
//!   an error; failures become [`LoginOutcome::Failure`].
//! - `logout` is synchronous and idempotent.
//! - `has_role` compares against the total order guest < user < admin;
//!   unrecognized roles satisfy nothing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::{Api, Credentials, RegisterPayload};
use crate::http::ApiError;
use crate::session::SessionStore;

/// Access level. The set is closed; anything else the server sends lands on
/// `Unknown`, which fails every requirement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
    #[serde(other)]
    Unknown,
}

impl Role {
    fn rank(self) -> Option<u8> {
        match self {
            Role::Guest => Some(0),
            Role::User => Some(1),
            Role::Admin => Some(2),
            Role::Unknown => None,
        }
    }

    /// Whether this role satisfies `required` under guest < user < admin.
    /// `Unknown` on either side is false (fail-closed).
    pub fn satisfies(self, required: Role) -> bool {
        match (self.rank(), required.rank()) {
            (Some(have), Some(need)) => have >= need,
            _ => false,
        }
    }
}

impl Default for Role {
    /// A record with no role field compares like an unrecognized one.
    fn default() -> Self {
        Role::Unknown
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
            Role::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The signed-in user record as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Point-in-time view of the session state, consumed by the route guard.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    /// True until the startup reconciliation has concluded.
    pub loading: bool,
}

/// Result of a login or register attempt. Failures carry the
/// human-readable server message.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success { user: User },
    Failure { error: String },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success { .. })
    }
}

#[derive(Debug)]
struct Inner {
    token: Option<String>,
    user: Option<User>,
    loading: bool,
}

/// Runtime session authority. One instance per application, shared by
/// reference with whatever surfaces need it.
pub struct AuthManager {
    api: Api,
    store: Arc<SessionStore>,
    inner: RwLock<Inner>,
}

impl AuthManager {
    pub fn new(api: Api, store: Arc<SessionStore>) -> Self {
        Self {
            api,
            store,
            inner: RwLock::new(Inner {
                token: None,
                user: None,
                loading: true,
            }),
        }
    }

    /// Reconcile the persisted session with the server.
    ///
    /// A stored session is adopted immediately, so callers see a signed-in
    /// state without waiting on the network; `/auth/me` then either
    /// refreshes the user record (the server's copy wins and is
    /// re-persisted) or revokes the session. A rejected token and an
    /// unreachable server are treated the same: both destroy the stored
    /// session. Concludes the loading phase exactly once; later calls are
    /// no-ops.
    pub async fn init(&self) {
        if !self.inner.read().loading {
            return;
        }
        let Some(session) = self.store.load() else {
            tracing::debug!("no stored session");
            self.inner.write().loading = false;
            return;
        };

        {
            let mut inner = self.inner.write();
            inner.token = Some(session.token.clone());
            inner.user = Some(session.user.clone());
        }

        match self.api.auth().me().await {
            Ok(me) => {
                if let Some(user) = me.user {
                    if let Err(err) = self.store.save(&session.token, &user) {
                        tracing::warn!(error = %err, "failed to re-persist refreshed user");
                    }
                    self.inner.write().user = Some(user);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "identity check failed; dropping stored session");
                self.store.clear();
                let mut inner = self.inner.write();
                inner.token = None;
                inner.user = None;
            }
        }
        self.inner.write().loading = false;
    }

    /// Sign in. Never returns an error: every failure path is folded into
    /// the outcome, and a failed attempt leaves existing state untouched.
    pub async fn login(&self, username_or_email: &str, password: &str) -> LoginOutcome {
        let credentials = Credentials {
            username_or_email: username_or_email.to_string(),
            password: password.to_string(),
        };
        match self.api.auth().login(&credentials).await {
            Ok(resp) => self.adopt(resp.token, resp.user),
            Err(err) => LoginOutcome::Failure {
                error: failure_message(&err),
            },
        }
    }

    /// Create an account; the server signs it in on success.
    pub async fn register(&self, payload: &RegisterPayload) -> LoginOutcome {
        match self.api.auth().register(payload).await {
            Ok(resp) => self.adopt(resp.token, resp.user),
            Err(err) => LoginOutcome::Failure {
                error: failure_message(&err),
            },
        }
    }

    fn adopt(&self, token: String, user: User) -> LoginOutcome {
        if let Err(err) = self.store.save(&token, &user) {
            tracing::warn!(error = %err, "failed to persist session");
        }
        let mut inner = self.inner.write();
        inner.token = Some(token);
        inner.user = Some(user.clone());
        LoginOutcome::Success { user }
    }

    /// Drop the session from memory and storage. Synchronous, idempotent,
    /// no network call.
    pub fn logout(&self) {
        self.store.clear();
        let mut inner = self.inner.write();
        inner.token = None;
        inner.user = None;
    }

    /// True iff the signed-in user's role satisfies `required`. Always
    /// false without a session, whatever the requirement.
    pub fn has_role(&self, required: Role) -> bool {
        match &self.inner.read().user {
            Some(user) => user.role.satisfies(required),
            None => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_user(&self) -> bool {
        self.has_role(Role::User)
    }

    pub fn is_guest(&self) -> bool {
        self.inner.read().user.is_none()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        let inner = self.inner.read();
        AuthSnapshot {
            user: inner.user.clone(),
            loading: inner.loading,
        }
    }
}

/// `data.message`, else the error's own message, else a generic fallback.
fn failure_message(err: &ApiError) -> String {
    let message = match err {
        ApiError::Status { message, .. } => message.clone(),
        other => other.to_string(),
    };
    if message.is_empty() {
        "Login failed".to_string()
    } else {
        message
    }
}

// ── Tests ───────────────────────────────────────────────────────────
