//! Client configuration.
//!
//! The backend lives behind a configurable base URL with a versioned path
//! prefix. Legacy deployments of the API accepted `PUT` for resource
//! updates where current ones use `PATCH`; that difference is a
//! configuration point here rather than a second client.

use std::time::Duration;

/// Default request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used specifically for the lightweight connectivity test.
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Versioned API path prefix.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// HTTP verb used for resource updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateVerb {
    /// Current backend contract.
    #[default]
    Patch,
    /// Legacy deployments.
    Put,
}

impl UpdateVerb {
    pub fn as_method(self) -> reqwest::Method {
        match self {
            Self::Patch => reqwest::Method::PATCH,
            Self::Put => reqwest::Method::PUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Normalized backend origin, e.g. `https://pos.example.com`.
    pub base_url: String,
    /// Path prefix prepended to every endpoint, e.g. `/api/v1`.
    pub api_prefix: String,
    pub timeout: Duration,
    pub update_verb: UpdateVerb,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
            update_verb: UpdateVerb::default(),
        }
    }

    /// Read `POSDESK_API_URL` (required) and `POSDESK_UPDATE_VERB`
    /// (optional, `patch`/`put`) from the environment.
    pub fn from_env() -> Option<Self> {
        let base = std::env::var("POSDESK_API_URL").ok()?;
        let mut config = Self::new(&base);
        if let Ok(verb) = std::env::var("POSDESK_UPDATE_VERB") {
            if verb.eq_ignore_ascii_case("put") {
                config.update_verb = UpdateVerb::Put;
            }
        }
        Some(config)
    }

    pub fn with_update_verb(mut self, verb: UpdateVerb) -> Self {
        self.update_verb = verb;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for an endpoint path (which must include the leading
    /// slash, e.g. `/users/`).
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }
}

/// Normalize the backend base URL:
/// - strip trailing slashes
/// - strip a trailing `/api` or `/api/v1` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip a trailing version prefix if the caller pasted the full API root
    if url.ends_with("/api/v1") {
        url.truncate(url.len() - 7);
    }
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}
