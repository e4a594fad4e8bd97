//! Client library for a multi-tenant POS backend.
//!
//! Layers, bottom up:
//! - [`storage`] / [`token`]: bearer-token persistence across a primary and
//!   a backup backend, with expiry tracking and role/permission predicates.
//! - [`api`] + [`endpoints`]: one authenticated HTTP client and a typed
//!   request builder per backend resource. No retries, no caching; every
//!   call is a fresh round trip.
//! - [`state`]: per-resource in-memory containers with confirm-then-patch
//!   mutation semantics, plus derived cross-entity queries.
//! - [`validation`]: pure form-field checks applied before submission.
//!
//! Nothing here renders anything; this crate ends where a UI begins.

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod token;
pub mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{ApiClient, ConnectivityResult};
pub use config::{ClientConfig, UpdateVerb};
pub use error::{ApiError, ApiResult};
pub use token::{decode_token, Claims, TokenManager};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a console subscriber honoring `RUST_LOG`, defaulting to `info`
/// with debug detail for this crate. `POSDESK_LOG_JSON=1` switches to
/// JSON-line output for log shippers. Call once at startup; embedding
/// applications that install their own subscriber should skip this.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,posdesk_client=debug"));
    let registry = tracing_subscriber::registry().with(env_filter);
    let json = std::env::var("POSDESK_LOG_JSON").map(|v| v == "1").unwrap_or(false);
    let result = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    let _ = result;
}
