//! Client configuration loaded from environment variables with defaults.

use std::env;
use std::path::PathBuf;

/// Production API origin.
pub const DEFAULT_BASE_URL: &str = "https://genzura.aphezis.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin every endpoint path is appended to.
    pub base_url: String,
    /// File backing the durable session store; `None` keeps the session in memory.
    pub store_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            store_path: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            store_path: None,
        }
    }

    /// Load `GENZURA_API_URL` and `GENZURA_SESSION_FILE`, reading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env::var("GENZURA_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let store_path = env::var("GENZURA_SESSION_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Self {
            base_url,
            store_path,
        }
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }
}
