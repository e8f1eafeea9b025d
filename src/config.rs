//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend base URL and the last used login email.
//!
//! Configuration is stored at `~/.config/chatterm/config.json`. The
//! `CHATTERM_API_URL` environment variable overrides the configured base
//! URL (useful together with a `.env` file).

use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::claims;

/// Application name used for config/state directory paths
const APP_NAME: &str = "chatterm";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured backend base URL
const API_URL_ENV: &str = "CHATTERM_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_email: Option<String>,
    /// Near-expiry lookahead override, seconds.
    pub expiry_lookahead_secs: Option<i64>,
    /// Background revalidation cadence override, seconds.
    pub revalidate_interval_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Backend base URL: environment override first, then the config file.
    /// Trailing slashes are trimmed so endpoint paths concatenate cleanly.
    pub fn api_base_url(&self) -> Result<String> {
        let url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api_base_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No backend URL configured - set {} or api_base_url in the config file",
                    API_URL_ENV
                )
            })?;
        Ok(url.trim_end_matches('/').to_string())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The near-expiry lookahead window, falling back to the default for
    /// an absent, non-positive, or out-of-range configured value.
    pub fn expiry_lookahead(&self) -> ChronoDuration {
        match self.expiry_lookahead_secs {
            None => claims::default_lookahead(),
            Some(secs) => match Some(secs)
                .filter(|s| *s > 0)
                .and_then(ChronoDuration::try_seconds)
            {
                Some(lookahead) => lookahead,
                None => {
                    warn!(secs, "ignoring unusable expiry_lookahead_secs");
                    claims::default_lookahead()
                }
            },
        }
    }

    /// Directory holding the credential store (token slot + gate cookie).
    pub fn state_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trims_trailing_slash() {
        let config = Config {
            api_base_url: Some("https://api.example.com/".to_string()),
            ..Default::default()
        };
        // Only meaningful when the env override is unset.
        if std::env::var(API_URL_ENV).is_err() {
            assert_eq!(config.api_base_url().unwrap(), "https://api.example.com");
        }
    }

    #[test]
    fn missing_base_url_is_an_error() {
        if std::env::var(API_URL_ENV).is_err() {
            assert!(Config::default().api_base_url().is_err());
        }
    }

    #[test]
    fn lookahead_honors_a_sane_override() {
        let config = Config {
            expiry_lookahead_secs: Some(600),
            ..Default::default()
        };
        assert_eq!(config.expiry_lookahead(), ChronoDuration::seconds(600));
    }

    #[test]
    fn lookahead_falls_back_on_unusable_values() {
        for secs in [None, Some(0), Some(-5), Some(i64::MAX)] {
            let config = Config {
                expiry_lookahead_secs: secs,
                ..Default::default()
            };
            assert_eq!(
                config.expiry_lookahead(),
                claims::default_lookahead(),
                "for {secs:?}"
            );
        }
    }
}
