//! Configuration: built-in defaults, optional TOML file, environment
//! overrides — applied in that order.
//!
//! The config file lives at `~/.config/chorale/config.toml` by default;
//! every value can also be set via `CHORALE_*` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::session::SessionStore;

/// Default remote API root.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/ChoirSite";

/// Default storage key for the bearer token.
pub const DEFAULT_TOKEN_KEY: &str = "choirAuthToken";

/// Default storage key for the serialized user record.
pub const DEFAULT_USER_KEY: &str = "choirUser";

/// Default URL path the front end maps to the protected admin subtree.
pub const DEFAULT_ADMIN_PATH: &str = "/admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub token_key: String,
    pub user_key: String,
    /// Consumed by the guard's caller to decide which URL is protected;
    /// the core itself never routes.
    pub admin_path: String,
    /// Where the session files live. `None` means the per-user state dir.
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            user_key: DEFAULT_USER_KEY.to_string(),
            admin_path: DEFAULT_ADMIN_PATH.to_string(),
            state_dir: None,
        }
    }
}

impl Config {
    /// Load the configuration. An explicit `path` must exist; the default
    /// file is optional and silently skipped when absent. Environment
    /// variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_file() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    fn default_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "chorale").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Some(value) = env_value("CHORALE_API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Some(value) = env_value("CHORALE_TOKEN_KEY") {
            self.token_key = value;
        }
        if let Some(value) = env_value("CHORALE_USER_KEY") {
            self.user_key = value;
        }
        if let Some(value) = env_value("CHORALE_ADMIN_PATH") {
            self.admin_path = value;
        }
        if let Some(value) = env_value("CHORALE_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(value));
        }
    }

    /// Directory holding the persisted session files.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        ProjectDirs::from("", "", "chorale")
            .map(|dirs| {
                dirs.state_dir()
                    .unwrap_or_else(|| dirs.data_dir())
                    .to_path_buf()
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// A session store wired to this configuration.
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.state_dir(), &self.token_key, &self.user_key)
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

// ── Tests ───────────────────────────────────────────────────────────
