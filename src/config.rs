//! Client configuration
//!
//! Defaults target the production B2 service. Both values can be overridden
//! from the environment, which is how tests and staging setups point the
//! client at another authorization endpoint.

use std::env;
use std::time::Duration;

use crate::b2::errors::{B2Error, Result};

/// B2 API authorization URL (v1 returns a flat session document)
pub const DEFAULT_AUTH_URL: &str = "https://api.backblazeb2.com/b2api/v1/b2_authorize_account";

/// HTTP client timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the authorization URL
pub const ENV_AUTH_URL: &str = "B2_AUTH_URL";

/// Environment variable overriding the request timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "B2_TIMEOUT_SECS";

/// Settings for building a [`crate::B2Client`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Full URL of b2_authorize_account
    pub auth_url: String,
    /// Per-request timeout applied by the HTTP client
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `B2_AUTH_URL` and `B2_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_AUTH_URL).filter(|v| !v.trim().is_empty()) {
            config.auth_url = url.trim().to_string();
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                B2Error::InvalidArgument(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_TIMEOUT_SECS, secs
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_AUTH_URL, "http://127.0.0.1:9000/b2api/v1/b2_authorize_account"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(
            config.auth_url,
            "http://127.0.0.1:9000/b2api/v1/b2_authorize_account"
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[(ENV_AUTH_URL, "  "), (ENV_TIMEOUT_SECS, "")]))
                .unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_invalid_timeout() {
        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(err.is_local());
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }
}
