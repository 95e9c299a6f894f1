//! Connection settings for a Pasty server
//!
//! A `ClientConfig` is fixed when the client is built. The transport choice
//! (plain or TLS) in particular never changes for the lifetime of a client.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

const DEFAULT_PLAIN_PORT: u16 = 80;
const DEFAULT_SECURE_PORT: u16 = 443;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub host: String,
    /// Port to connect to; defaults to 80, or 443 when `secure` is set
    #[serde(default)]
    pub port: Option<u16>,
    /// Use HTTPS instead of plain HTTP
    #[serde(default)]
    pub secure: bool,
    /// API key sent along when creating users
    #[serde(default)]
    pub api_key: Option<String>,
    /// Value of the `Accept-Version` header, if any
    #[serde(default)]
    pub api_version: Option<String>,
    /// Request timeout, given in (possibly fractional) seconds in config files;
    /// the transport default applies when unset
    #[serde(default, deserialize_with = "deserialize_secs")]
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
            secure: false,
            api_key: None,
            api_version: None,
            timeout: None,
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.secure {
            DEFAULT_SECURE_PORT
        } else {
            DEFAULT_PLAIN_PORT
        })
    }

    /// Base URL of the server, e.g. `http://localhost:4444`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.effective_port())
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
