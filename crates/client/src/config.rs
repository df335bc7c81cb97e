//! Client configuration from environment variables.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::storage::default_data_dir;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name} {value:?}: {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{name} must use {expected}, got {value:?}")]
    WrongScheme {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("no data directory available; set ONEVIEW_DATA_DIR")]
    NoDataDir,
}

/// Where the client talks to and where it keeps its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    pub api_base: String,
    /// Base URL of the push endpoint.
    pub ws_base: String,
    /// Directory holding the token file.
    pub data_dir: PathBuf,
}

/// Raw settings before validation. `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub ws_base: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Environment variables:
    /// - `ONEVIEW_API_BASE`: REST base URL (default: `http://localhost:8000`)
    /// - `ONEVIEW_WS_BASE`: push base URL (default: the API base with `ws(s)://`)
    /// - `ONEVIEW_DATA_DIR`: token directory (default: `<config_dir>/oneview`)
    pub fn from_env() -> Self {
        Self {
            api_base: non_empty_env("ONEVIEW_API_BASE"),
            ws_base: non_empty_env("ONEVIEW_WS_BASE"),
            data_dir: non_empty_env("ONEVIEW_DATA_DIR").map(PathBuf::from),
        }
    }

    /// Values set in `other` win.
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            api_base: other.api_base.or(self.api_base),
            ws_base: other.ws_base.or(self.ws_base),
            data_dir: other.data_dir.or(self.data_dir),
        }
    }

    pub fn resolve(self) -> Result<ClientConfig, ConfigError> {
        let api_base = self.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_url = parse_url("ONEVIEW_API_BASE", &api_base)?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::WrongScheme {
                name: "ONEVIEW_API_BASE",
                expected: "http or https",
                value: api_base,
            });
        }

        let ws_base = match self.ws_base {
            Some(ws_base) => ws_base,
            None => http_to_ws(&api_base),
        };
        let ws_url = parse_url("ONEVIEW_WS_BASE", &ws_base)?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            return Err(ConfigError::WrongScheme {
                name: "ONEVIEW_WS_BASE",
                expected: "ws or wss",
                value: ws_base,
            });
        }

        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(ClientConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
            ws_base: ws_base.trim_end_matches('/').to_string(),
            data_dir,
        })
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigOverrides::from_env().resolve()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        source,
    })
}

/// Convert HTTP/HTTPS URL to WS/WSS
pub fn http_to_ws(url: &str) -> String {
    if url.starts_with("https://") {
        url.replacen("https://", "wss://", 1)
    } else if url.starts_with("http://") {
        url.replacen("http://", "ws://", 1)
    } else {
        url.to_string()
    }
}
