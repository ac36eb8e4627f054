//! Authentication header construction
//!
//! The session layer that owns bearer and CSRF tokens lives outside this crate.
//! It is reached through [`AuthProvider`]; [`build_auth_headers`] turns whatever
//! the provider currently holds into request headers and never fails.

use crate::types::constants::headers;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::sync::RwLock;

/// Source of request credentials
pub trait AuthProvider: Send + Sync {
    /// Current bearer token, if the user is signed in
    fn bearer_token(&self) -> Option<String>;

    /// Current CSRF token, if the session issued one
    fn csrf_token(&self) -> Option<String> {
        None
    }
}

/// Credentials held in memory, replaceable at runtime
#[derive(Debug, Default)]
pub struct StaticAuth {
    bearer: RwLock<Option<String>>,
    csrf: RwLock<Option<String>>,
}

impl StaticAuth {
    /// Provider with a bearer token
    pub fn new(bearer: impl Into<String>) -> Self {
        Self {
            bearer: RwLock::new(Some(bearer.into())),
            csrf: RwLock::new(None),
        }
    }

    /// Provider with no credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the CSRF token
    pub fn with_csrf(self, csrf: impl Into<String>) -> Self {
        self.set_csrf(Some(csrf.into()));
        self
    }

    /// Replace the bearer token (e.g. after a refresh)
    pub fn set_bearer(&self, bearer: Option<String>) {
        if let Ok(mut guard) = self.bearer.write() {
            *guard = bearer;
        }
    }

    /// Replace the CSRF token
    pub fn set_csrf(&self, csrf: Option<String>) {
        if let Ok(mut guard) = self.csrf.write() {
            *guard = csrf;
        }
    }
}

impl AuthProvider for StaticAuth {
    fn bearer_token(&self) -> Option<String> {
        self.bearer.read().ok().and_then(|guard| guard.clone())
    }

    fn csrf_token(&self) -> Option<String> {
        self.csrf.read().ok().and_then(|guard| guard.clone())
    }
}

/// Build request headers from the provider's current credentials
///
/// The result always contains `Authorization`; an anonymous provider yields a
/// bare `Bearer` scheme. Tokens that are not valid header values are dropped
/// with a warning.
pub fn build_auth_headers(provider: &dyn AuthProvider) -> HeaderMap {
    let mut map = HeaderMap::new();

    let token = provider.bearer_token().unwrap_or_default();
    let value = HeaderValue::from_str(format!("Bearer {}", token).trim_end())
        .unwrap_or_else(|_| {
            tracing::warn!("Bearer token is not a valid header value, sending bare scheme");
            HeaderValue::from_static("Bearer")
        });
    map.insert(AUTHORIZATION, value);

    if let Some(csrf) = provider.csrf_token() {
        match HeaderValue::from_str(&csrf) {
            Ok(value) => {
                map.insert(HeaderName::from_static(headers::CSRF_TOKEN), value);
            }
            Err(_) => tracing::warn!("CSRF token is not a valid header value, omitting it"),
        }
    }

    map
}
