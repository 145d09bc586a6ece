use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::app_paths::AppPaths;

pub const DEFAULT_API_URL: &str = "https://api.granola.ai/v2/get-documents";
pub const DEFAULT_CLIENT_VERSION: &str = "5.354.0";

const ENV_API_URL: &str = "GRANOLA_API_URL";
const ENV_CREDENTIALS_PATH: &str = "GRANOLA_CREDENTIALS_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Endpoint that serves `get-documents`
    pub url: String,

    /// Desktop app version we identify as (User-Agent and X-Client-Version)
    pub client_version: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Credential file override; defaults to the Granola app support directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Treat a token as stale this many seconds before it actually expires
    pub refresh_buffer_secs: u64,

    /// Lifetime assumed when the token pair carries no `expires_in`
    pub default_expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,

    /// Aggregation stops once the offset passes this value, even if pages are still full
    pub max_offset: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: None,
            refresh_buffer_secs: 5 * 60,
            default_expires_in_secs: 21600, // 6 hours
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_offset: 10000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn user_agent(&self) -> String {
        format!("Granola/{}", self.client_version)
    }
}

impl CredentialsConfig {
    /// Resolve the credential file, falling back to the desktop app's location
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => AppPaths::credentials_file(),
        }
    }

    pub fn refresh_buffer_ms(&self) -> i64 {
        (self.refresh_buffer_secs as i64).saturating_mul(1000)
    }
}

impl Config {
    /// Load config from the default location, then apply environment overrides.
    /// A missing file yields the defaults; nothing is written.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from an explicit file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        AppPaths::config_file()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_CREDENTIALS_PATH).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, credentials_path: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api.url = url;
        }
        if let Some(path) = credentials_path.filter(|p| !p.trim().is_empty()) {
            self.credentials.path = Some(PathBuf::from(path));
        }
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# Granola client configuration
# Location: ~/.config/granola-client/config.toml (Linux)
#           ~/Library/Application Support/granola-client/config.toml (macOS)
#
# GRANOLA_API_URL and GRANOLA_CREDENTIALS_PATH override the values below.

[api]
url = "{url}"

# Version reported in User-Agent and X-Client-Version
client_version = "{version}"

# Per-request timeout in seconds
timeout_secs = 30

[credentials]
# Credential file written by the Granola desktop app (leave commented for the default)
# path = "/Users/me/Library/Application Support/Granola/supabase.json"

# Reload the token this many seconds before it expires
refresh_buffer_secs = 300

# Token lifetime assumed when the file carries no expires_in
default_expires_in_secs = 21600

[pagination]
page_size = 100

# Stop paging once the offset passes this value
max_offset = 10000
"#,
            url = DEFAULT_API_URL,
            version = DEFAULT_CLIENT_VERSION,
        )
    }
}
