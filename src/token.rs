//! Bearer token lifecycle: decode, dual-backend persistence, expiry
//! tracking, and role/permission predicates.
//!
//! Every failure path here degrades to `None`/`false` with a logged
//! diagnostic. A missing or invalid token must read as "not authenticated",
//! never as an error the caller has to handle.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Permission, Role};
use crate::storage::{FileBackend, KeyringBackend, TokenBackend};

/// Storage key for the raw bearer token.
const TOKEN_KEY: &str = "access_token";
/// Storage key for the absolute expiry (unix seconds).
const EXPIRY_KEY: &str = "access_token_expiry";

/// How often the auto-refresh task re-checks the remaining lifetime.
const REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
/// Remaining lifetime below which the refresh callback fires.
const REFRESH_LOW_WATER: Duration = Duration::from_secs(5 * 60);

/// Claims carried in the backend-issued JWT.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    /// Expiry, unix seconds.
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode the payload segment of a JWT without verifying the signature.
/// Returns `None` on any malformed input; verification is the backend's
/// job, the client only needs the claims for expiry and role checks.
pub fn decode_token(token: &str) -> Option<Claims> {
    let payload = decode_payload(token)?;
    serde_json::from_value(payload).ok()
}

fn decode_payload(token: &str) -> Option<serde_json::Value> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    segments.next()?;

    // JWTs use unpadded base64url; tolerate padded input too.
    let standard = payload.replace('-', "+").replace('_', "/");
    let padded = format!(
        "{}{}",
        standard,
        "=".repeat((4usize.wrapping_sub(standard.len() % 4)) % 4)
    );
    let decoded = BASE64_STANDARD.decode(padded).ok()?;
    let value = serde_json::from_slice::<serde_json::Value>(&decoded).ok()?;
    value.is_object().then_some(value)
}

/// Manages the bearer token across a primary and a backup storage backend.
pub struct TokenManager {
    primary: Box<dyn TokenBackend>,
    backup: Box<dyn TokenBackend>,
}

impl TokenManager {
    pub fn new(primary: Box<dyn TokenBackend>, backup: Box<dyn TokenBackend>) -> Self {
        Self { primary, backup }
    }

    /// OS credential store primary with a JSON file backup at `backup_path`.
    pub fn with_default_backends(backup_path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            Box::new(KeyringBackend::new()),
            Box::new(FileBackend::new(backup_path)),
        )
    }

    /// Validate and persist a token to both backends.
    ///
    /// The absolute expiry comes from `expires_in` when given, otherwise
    /// from the token's own `exp` claim. Returns `false` (never an error)
    /// when the token does not decode or neither backend accepts the write.
    pub fn set_token(&self, token: &str, expires_in: Option<Duration>) -> bool {
        let Some(claims) = decode_token(token) else {
            warn!("rejecting token that does not decode to a JSON payload");
            return false;
        };

        let expiry = match expires_in {
            Some(d) => Utc::now().timestamp() + d.as_secs() as i64,
            None => match claims.exp {
                Some(exp) => exp,
                None => {
                    warn!("rejecting token with no expiry information");
                    return false;
                }
            },
        };

        let expiry_s = expiry.to_string();
        let mut ok = true;
        for (backend, label) in [(&self.primary, "primary"), (&self.backup, "backup")] {
            if let Err(e) = backend
                .set(TOKEN_KEY, token)
                .and_then(|()| backend.set(EXPIRY_KEY, &expiry_s))
            {
                warn!(backend = label, error = %e, "failed to persist token");
                ok = false;
            }
        }
        if ok {
            debug!(user_id = %claims.sub, expiry, "token persisted");
        }
        ok
    }

    /// Current token, if one is stored, unexpired, and decodable.
    ///
    /// Prefers the primary backend; falls back to the backup and re-syncs
    /// the primary from it. An expired or undecodable stored token purges
    /// all storage and reads as absent.
    pub fn token(&self) -> Option<String> {
        let (token, expiry) = match self.read_pair(self.primary.as_ref()) {
            Some(pair) => pair,
            None => {
                let pair = self.read_pair(self.backup.as_ref())?;
                // Primary lost its copy; restore it from the backup.
                if self
                    .primary
                    .set(TOKEN_KEY, &pair.0)
                    .and_then(|()| self.primary.set(EXPIRY_KEY, &pair.1.to_string()))
                    .is_err()
                {
                    warn!("failed to re-sync token into primary backend");
                }
                pair
            }
        };

        if Utc::now().timestamp() >= expiry {
            debug!("stored token expired, purging");
            self.clear();
            return None;
        }
        if decode_token(&token).is_none() {
            warn!("stored token no longer decodes, purging");
            self.clear();
            return None;
        }
        Some(token)
    }

    fn read_pair(&self, backend: &dyn TokenBackend) -> Option<(String, i64)> {
        let token = backend.get(TOKEN_KEY)?;
        let expiry = backend.get(EXPIRY_KEY)?.parse::<i64>().ok()?;
        Some((token, expiry))
    }

    /// Purge token material from both backends unconditionally.
    pub fn clear(&self) {
        for backend in [&self.primary, &self.backup] {
            for key in [TOKEN_KEY, EXPIRY_KEY] {
                if let Err(e) = backend.remove(key) {
                    warn!(key, error = %e, "failed to remove token key");
                }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.token().is_some()
    }

    pub fn claims(&self) -> Option<Claims> {
        self.token().as_deref().and_then(decode_token)
    }

    /// Absolute expiry of the stored token.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let expiry = self
            .read_pair(self.primary.as_ref())
            .or_else(|| self.read_pair(self.backup.as_ref()))?
            .1;
        Utc.timestamp_opt(expiry, 0).single()
    }

    /// Remaining lifetime of the stored token, if still valid.
    pub fn remaining(&self) -> Option<Duration> {
        self.token()?;
        let expires_at = self.expires_at()?;
        (expires_at - Utc::now()).to_std().ok()
    }

    /// Role check. Super admins match every role.
    pub fn has_role(&self, role: Role) -> bool {
        match self.claims() {
            Some(claims) => claims.role.is_admin() || claims.role == role,
            None => false,
        }
    }

    /// Permission check against the role's closed permission table.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.claims()
            .map(|c| c.role.has_permission(permission))
            .unwrap_or(false)
    }

    /// Spawn a background task that polls the token lifetime and invokes
    /// `callback` once per token when the remaining lifetime drops under the
    /// low-water mark. The task runs for the life of the process; there is
    /// no cancellation handle beyond aborting the returned join handle.
    pub fn spawn_auto_refresh<F>(self: Arc<Self>, callback: F) -> JoinHandle<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let fired_for = Mutex::new(None::<DateTime<Utc>>);
        tokio::spawn(async move {
            info!("token auto-refresh watcher started");
            loop {
                if let Some(remaining) = self.remaining() {
                    if remaining <= REFRESH_LOW_WATER {
                        let expires_at = self.expires_at();
                        let should_fire = match fired_for.lock() {
                            Ok(mut fired) if *fired != expires_at => {
                                *fired = expires_at;
                                true
                            }
                            _ => false,
                        };
                        if should_fire {
                            debug!(remaining_secs = remaining.as_secs(), "token near expiry");
                            callback();
                        }
                    }
                }
                tokio::time::sleep(REFRESH_CHECK_INTERVAL).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }

    fn valid_token(exp: i64) -> String {
        make_token(json!({
            "sub": "5f6f5c3a-92c1-4e87-9a63-cc2b60f8a5a1",
            "email": "admin@example.com",
            "name": "Admin",
            "role": "super_admin",
            "tenant_id": "0a3f2a92-1b5e-4b53-8a7f-3d2f9b7c4e21",
            "exp": exp,
        }))
    }

    fn memory_manager() -> TokenManager {
        TokenManager::new(Box::new(MemoryBackend::new()), Box::new(MemoryBackend::new()))
    }

    #[test]
    fn decode_rejects_all_malformed_shapes() {
        assert!(decode_token("").is_none());
        assert!(decode_token("garbage").is_none());
        assert!(decode_token("only.two").is_none());
        assert!(decode_token("a.%%%%.c").is_none());
        // Valid base64 but not a JSON object
        let not_object = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"\"just a string\""));
        assert!(decode_token(&not_object).is_none());
    }

    #[test]
    fn decode_extracts_claims() {
        let token = valid_token(Utc::now().timestamp() + 3600);
        let claims = decode_token(&token).expect("claims");
        assert_eq!(claims.role, Role::SuperAdmin);
        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
        assert!(claims.tenant_id.is_some());
    }

    #[test]
    fn token_round_trip() {
        let manager = memory_manager();
        let token = valid_token(Utc::now().timestamp() + 3600);

        assert!(manager.set_token(&token, None));
        assert_eq!(manager.token().as_deref(), Some(token.as_str()));
        assert!(manager.is_valid());
    }

    #[test]
    fn set_rejects_undecodable_token() {
        let manager = memory_manager();
        assert!(!manager.set_token("not-a-jwt", Some(Duration::from_secs(60))));
        assert_eq!(manager.token(), None);
    }

    #[test]
    fn expired_token_is_purged_on_read() {
        let manager = memory_manager();
        let token = valid_token(Utc::now().timestamp() - 10);

        // Stored fine (set does not judge expiry), but reads as absent.
        assert!(manager.set_token(&token, None));
        assert_eq!(manager.token(), None);
        assert!(!manager.is_valid());
        // Purge is unconditional: the backup copy is gone too.
        assert_eq!(manager.expires_at(), None);
    }

    #[test]
    fn backup_fallback_resyncs_primary() {
        let primary = Box::new(MemoryBackend::new());
        let backup = Box::new(MemoryBackend::new());
        let manager = TokenManager::new(primary, backup);
        let token = valid_token(Utc::now().timestamp() + 3600);

        assert!(manager.set_token(&token, None));
        // Simulate the primary losing its copy.
        manager.primary.remove(TOKEN_KEY).unwrap();
        manager.primary.remove(EXPIRY_KEY).unwrap();

        assert_eq!(manager.token().as_deref(), Some(token.as_str()));
        // Primary must have been repopulated from the backup.
        assert_eq!(manager.primary.get(TOKEN_KEY).as_deref(), Some(token.as_str()));
    }

    #[test]
    fn explicit_expiry_overrides_claim() {
        let manager = memory_manager();
        // Claim says valid for an hour, caller says 1 second ago.
        let token = valid_token(Utc::now().timestamp() + 3600);
        assert!(manager.set_token(&token, Some(Duration::from_secs(0))));
        assert_eq!(manager.token(), None);
    }

    #[test]
    fn role_and_permission_checks() {
        let manager = memory_manager();
        let cashier = make_token(json!({
            "sub": "5f6f5c3a-92c1-4e87-9a63-cc2b60f8a5a1",
            "role": "cashier",
            "exp": Utc::now().timestamp() + 3600,
        }));
        assert!(manager.set_token(&cashier, None));
        assert!(manager.has_role(Role::Cashier));
        assert!(!manager.has_role(Role::Manager));
        assert!(manager.has_permission(Permission::CreateSale));
        assert!(!manager.has_permission(Permission::ManageSettings));

        let admin = valid_token(Utc::now().timestamp() + 3600);
        assert!(manager.set_token(&admin, None));
        // Admin matches every role and permission.
        assert!(manager.has_role(Role::Cashier));
        assert!(manager.has_permission(Permission::ManageSettings));
    }

    #[test]
    fn clear_purges_both_backends() {
        let manager = memory_manager();
        let token = valid_token(Utc::now().timestamp() + 3600);
        assert!(manager.set_token(&token, None));
        manager.clear();
        assert_eq!(manager.token(), None);
        assert_eq!(manager.backup.get(TOKEN_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_fires_once_per_token_under_low_water() {
        let manager = Arc::new(memory_manager());
        // Three minutes left: already under the five-minute low-water mark.
        let token = valid_token(Utc::now().timestamp() + 180);
        assert!(manager.set_token(&token, None));

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let handle = Arc::clone(&manager).spawn_auto_refresh(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Paused clock auto-advances through the watcher's sleeps.
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Further checks for the same token must not re-fire.
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        handle.abort();
    }
}
