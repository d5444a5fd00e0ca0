//! Client core for the Chorale choir site API.
//!
//! The crate is layered bottom-up:
//! - [`session`]: `{token, user}` persisted together; partial state is
//!   treated as corrupt and cleared.
//! - [`http`]: a thin request wrapper that resolves paths against the
//!   configured base, injects the bearer token, and normalizes responses
//!   into JSON values or [`http::ApiError`].
//! - [`api`]: typed endpoint sets, one uniform [`api::Resource`] per
//!   collection plus the non-uniform auth, media, and member routes.
//! - [`auth`]: the runtime session authority (init, login, logout, role
//!   checks).
//! - [`guard`]: pure gate decisions for protected surfaces.
//! - [`config`] and [`cli`]: the binary's wiring.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod guard;
pub mod http;
pub mod session;

pub use api::{Api, ListEnvelope, ListQuery, Resource};
pub use auth::{AuthManager, AuthSnapshot, LoginOutcome, Role, User};
pub use config::Config;
pub use guard::{evaluate, GateDecision};
pub use http::{ApiError, HttpClient, RequestOptions};
pub use session::{SessionStore, StoredSession};
