//! Client configuration.
//!
//! A `Configuration` is an explicit value handed to the `Requestor`; there is
//! no process-wide default instance. It is meant to be set up once and read
//! afterwards.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::auth::{AuthScheme, DEFAULT_AUTH_NAME};
use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://petstore-api.herokuapp.com/pet";
pub const DEFAULT_USER_AGENT: &str = "ramc";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable overriding the base URL in [`Configuration::from_env`].
pub const BASE_URL_ENV: &str = "PETSTORE_BASE_URL";
/// Environment variable overriding the timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "PETSTORE_TIMEOUT_MS";

/// Settings shared by every call made through one `Requestor`.
#[derive(Debug, Clone)]
pub struct Configuration {
    base_url: String,
    /// Headers sent with every request; request-specific headers win.
    pub default_headers: BTreeMap<String, String>,
    /// Upper bound on the duration of a single call.
    pub timeout: Duration,
    authentications: HashMap<String, AuthScheme>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_headers: BTreeMap::from([(
                "User-Agent".to_string(),
                DEFAULT_USER_AGENT.to_string(),
            )]),
            timeout: DEFAULT_TIMEOUT,
            authentications: HashMap::new(),
        }
    }
}

/// Partial overrides accepted by [`Configuration::configure`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl From<&str> for ClientOptions {
    fn from(base_url: &str) -> Self {
        Self {
            base_url: Some(base_url.to_string()),
            ..Self::default()
        }
    }
}

impl Configuration {
    pub fn new(base_url: &str) -> Self {
        let mut config = Self::default();
        config.set_base_url(base_url);
        config
    }

    /// Defaults overridden by `PETSTORE_BASE_URL` and `PETSTORE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.set_base_url(&base_url);
        }
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.parse::<u64>() {
                Ok(ms) => config.timeout = Duration::from_millis(ms),
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets the base URL; a trailing `/` is dropped. Empty values are ignored.
    pub fn set_base_url(&mut self, base_url: &str) {
        let trimmed = base_url.trim_end_matches('/');
        if !trimmed.is_empty() {
            self.base_url = trimmed.to_string();
        }
    }

    /// Applies the options that are set, leaving the rest untouched.
    pub fn configure(&mut self, options: impl Into<ClientOptions>) {
        let options = options.into();
        if let Some(base_url) = options.base_url {
            self.set_base_url(&base_url);
        }
        if let Some(ms) = options.timeout_ms {
            self.timeout = Duration::from_millis(ms);
        }
        self.default_headers.extend(options.default_headers);
    }

    /// Registers `scheme` under `name` (`"default"` when `None`), replacing
    /// any previous entry.
    pub fn auth(&mut self, name: Option<&str>, scheme: AuthScheme) {
        let name = name.unwrap_or(DEFAULT_AUTH_NAME);
        self.authentications.insert(name.to_string(), scheme);
    }

    /// Registers loosely-typed auth data, see [`AuthScheme::from_json`].
    ///
    /// # Errors
    /// `InvalidAuthentication` when the data does not describe a known scheme.
    pub fn auth_from_json(&mut self, name: Option<&str>, data: &Value) -> Result<(), ApiError> {
        let scheme = AuthScheme::from_json(data)?;
        self.auth(name, scheme);
        Ok(())
    }

    /// Removes the scheme registered under `name` (`"default"` when `None`).
    pub fn remove_auth(&mut self, name: Option<&str>) -> Option<AuthScheme> {
        self.authentications
            .remove(name.unwrap_or(DEFAULT_AUTH_NAME))
    }

    pub fn authentications(&self) -> &HashMap<String, AuthScheme> {
        &self.authentications
    }
}
