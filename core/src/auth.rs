//! Authentication schemes and their application to outgoing requests.
//!
//! # Design
//! Schemes are a closed enum, so applying them cannot meet an unknown kind.
//! Loosely-typed auth data (JSON configuration) is validated once, in
//! [`AuthScheme::from_json`], which is where `InvalidAuthentication` comes
//! from. Schemes whose credential is absent are registered but apply as a
//! no-op.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{BasicCredentials, HttpRequest};

/// Name used when a request or a registration does not name a scheme.
pub const DEFAULT_AUTH_NAME: &str = "default";

/// Where a key or token is placed on the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLocation {
    #[default]
    Header,
    Query,
}

/// A named, typed credential configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthScheme {
    Basic {
        username: Option<String>,
        password: Option<String>,
    },
    ApiKey {
        name: String,
        api_key: Option<String>,
        prefix: Option<String>,
        location: AuthLocation,
    },
    OAuth2 {
        access_token: Option<String>,
        name: Option<String>,
        location: AuthLocation,
    },
}

impl AuthScheme {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthScheme::Basic {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// An API key sent in the header `name`.
    pub fn api_key(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        AuthScheme::ApiKey {
            name: name.into(),
            api_key: Some(api_key.into()),
            prefix: None,
            location: AuthLocation::Header,
        }
    }

    /// An OAuth2 access token sent as `Authorization: Bearer <token>`.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        AuthScheme::OAuth2 {
            access_token: Some(access_token.into()),
            name: None,
            location: AuthLocation::Header,
        }
    }

    /// Moves a key or token to `location`. Basic schemes are unaffected.
    #[must_use]
    pub fn located(mut self, new_location: AuthLocation) -> Self {
        match &mut self {
            AuthScheme::ApiKey { location, .. } | AuthScheme::OAuth2 { location, .. } => {
                *location = new_location;
            }
            AuthScheme::Basic { .. } => {}
        }
        self
    }

    /// Sets the prefix written before an API key (e.g. `Token`).
    #[must_use]
    pub fn with_prefix(mut self, new_prefix: impl Into<String>) -> Self {
        if let AuthScheme::ApiKey { prefix, .. } = &mut self {
            *prefix = Some(new_prefix.into());
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthScheme::Basic { .. } => "basic",
            AuthScheme::ApiKey { .. } => "apiKey",
            AuthScheme::OAuth2 { .. } => "oauth2",
        }
    }

    /// Builds a scheme from loosely-typed auth data.
    ///
    /// The `type` field selects the scheme (`basic`, `apiKey`, `oauth2`).
    /// Without it the scheme is inferred from the credential present:
    /// `username`, then `apiKey`, then `accessToken`.
    ///
    /// # Errors
    /// `InvalidAuthentication` when the data is null, malformed, names an
    /// unknown type or carries no recognizable credential.
    pub fn from_json(data: &Value) -> Result<Self, ApiError> {
        if data.is_null() {
            return Err(ApiError::InvalidAuthentication(
                "authentication data is required".to_string(),
            ));
        }
        let raw: RawAuthData = serde_json::from_value(data.clone())
            .map_err(|e| ApiError::InvalidAuthentication(e.to_string()))?;

        let kind = match raw.kind.as_deref() {
            Some(kind) => kind,
            None if raw.username.is_some() => "basic",
            None if raw.api_key.is_some() => "apiKey",
            None if raw.access_token.is_some() => "oauth2",
            None => {
                return Err(ApiError::InvalidAuthentication(format!(
                    "unknown authentication data: {data}"
                )))
            }
        };

        match kind {
            "basic" => Ok(AuthScheme::Basic {
                username: raw.username,
                password: raw.password,
            }),
            "apiKey" | "api" => Ok(AuthScheme::ApiKey {
                name: raw.name.ok_or_else(|| {
                    ApiError::InvalidAuthentication("apiKey scheme requires a name".to_string())
                })?,
                api_key: raw.api_key,
                prefix: raw.api_key_prefix,
                location: raw.location.unwrap_or_default(),
            }),
            "oauth2" => Ok(AuthScheme::OAuth2 {
                access_token: raw.access_token,
                name: raw.name,
                location: raw.location.unwrap_or_default(),
            }),
            other => Err(ApiError::InvalidAuthentication(format!(
                "unknown authentication type: {other}"
            ))),
        }
    }
}

impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(secret: Option<&String>) -> Option<&'static str> {
            secret.map(|_| "<redacted>")
        }
        match self {
            AuthScheme::Basic { username, password } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &redact(password.as_ref()))
                .finish(),
            AuthScheme::ApiKey {
                name,
                api_key,
                prefix,
                location,
            } => f
                .debug_struct("ApiKey")
                .field("name", name)
                .field("api_key", &redact(api_key.as_ref()))
                .field("prefix", prefix)
                .field("location", location)
                .finish(),
            AuthScheme::OAuth2 {
                access_token,
                name,
                location,
            } => f
                .debug_struct("OAuth2")
                .field("access_token", &redact(access_token.as_ref()))
                .field("name", name)
                .field("location", location)
                .finish(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthData {
    #[serde(rename = "type")]
    kind: Option<String>,
    username: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
    api_key_prefix: Option<String>,
    name: Option<String>,
    #[serde(rename = "in")]
    location: Option<AuthLocation>,
    access_token: Option<String>,
}

/// Applies the named schemes to `request`.
///
/// An empty name list means `["default"]`. Names without a registered
/// scheme are skipped.
pub fn apply_auth(
    request: &mut HttpRequest,
    authentications: &HashMap<String, AuthScheme>,
    auth_names: &[String],
) {
    let default_names = [DEFAULT_AUTH_NAME.to_string()];
    let names = if auth_names.is_empty() {
        &default_names[..]
    } else {
        auth_names
    };

    for name in names {
        let Some(scheme) = authentications.get(name) else {
            debug!(auth = %name, "no authentication registered under this name, skipping");
            continue;
        };
        debug!(auth = %name, kind = scheme.kind(), "applying authentication");
        match scheme {
            AuthScheme::Basic { username, password } => {
                if username.is_some() || password.is_some() {
                    request.basic_auth = Some(BasicCredentials {
                        username: username.clone().unwrap_or_default(),
                        password: password.clone().unwrap_or_default(),
                    });
                }
            }
            AuthScheme::ApiKey {
                name,
                api_key,
                prefix,
                location,
            } => {
                if let Some(api_key) = api_key {
                    let value = match prefix {
                        Some(prefix) => format!("{prefix} {api_key}"),
                        None => api_key.clone(),
                    };
                    place(request, *location, name, value);
                }
            }
            AuthScheme::OAuth2 {
                access_token,
                name,
                location,
            } => {
                if let Some(token) = access_token {
                    match name {
                        Some(name) => place(request, *location, name, token.clone()),
                        None => request.set_header("Authorization", format!("Bearer {token}")),
                    }
                }
            }
        }
    }
}

fn place(request: &mut HttpRequest, location: AuthLocation, name: &str, value: String) {
    match location {
        AuthLocation::Query => request.query.push((name.to_string(), value)),
        AuthLocation::Header => request.set_header(name, value),
    }
}
