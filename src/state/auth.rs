//! Session state: login/logout, the current user, and permission checks.
//!
//! Token material lives in the [`TokenManager`] the client was built with;
//! this container only caches the user record and tenant identity that came
//! with the session.

use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginResponse, Permission, Role, SessionUser, SignupRequest};

pub struct SessionState {
    client: Arc<ApiClient>,
    user: Mutex<Option<SessionUser>>,
    tenant_id: Mutex<Option<Uuid>>,
    error: Mutex<Option<String>>,
}

impl SessionState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            user: Mutex::new(None),
            tenant_id: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.user.lock().ok().and_then(|u| u.clone())
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id.lock().ok().and_then(|t| *t)
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|e| e.clone())
    }

    /// Authenticated means a stored, unexpired token exists. The cached user
    /// record may lag behind (e.g. before [`Self::restore`] runs).
    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().is_valid()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.client.tokens().has_role(role)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.client.tokens().has_permission(permission)
    }

    /// OAuth2 password login. On success the token is persisted and the
    /// session user cached; a token the storage rejects fails the login
    /// rather than leaving a half-open session.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionUser> {
        self.set_error(None);
        match self.client.auth().login(email, password).await {
            Ok(response) => self.open_session(response),
            Err(err) => {
                self.set_error(Some(err.message().to_string()));
                Err(err)
            }
        }
    }

    /// Super-admin signup; opens a session just like login does.
    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<SessionUser> {
        self.set_error(None);
        match self.client.auth().signup(request).await {
            Ok(response) => self.open_session(response),
            Err(err) => {
                self.set_error(Some(err.message().to_string()));
                Err(err)
            }
        }
    }

    fn open_session(&self, response: LoginResponse) -> ApiResult<SessionUser> {
        if !self.client.tokens().set_token(&response.access_token, None) {
            self.set_error(Some("failed to store session token".into()));
            return Err(ApiError::network("failed to store session token"));
        }
        if let Ok(mut user) = self.user.lock() {
            *user = Some(response.user.clone());
        }
        if let Ok(mut tenant) = self.tenant_id.lock() {
            *tenant = Some(response.tenant_id);
        }
        info!(user_id = %response.user.id, role = response.user.role.as_str(), "session opened");
        Ok(response.user)
    }

    /// Rebuild the session from a stored token at startup: the claims fill
    /// the user slot immediately, then `/users/me` confirms the account is
    /// still active. A rejected confirmation tears the session down.
    pub async fn restore(&self) -> ApiResult<Option<SessionUser>> {
        let Some(claims) = self.client.tokens().claims() else {
            return Ok(None);
        };

        let from_claims = SessionUser {
            id: claims.sub,
            email: claims.email.clone().unwrap_or_default(),
            name: claims.name.clone().unwrap_or_default(),
            role: claims.role,
            tenant_id: claims.tenant_id,
            store_id: None,
            status: None,
        };
        if let Ok(mut user) = self.user.lock() {
            *user = Some(from_claims);
        }
        if let Ok(mut tenant) = self.tenant_id.lock() {
            *tenant = claims.tenant_id;
        }

        match self.client.users().me().await {
            Ok(me) => {
                let session = SessionUser {
                    id: me.id,
                    email: me.email,
                    name: me.name,
                    role: me.role,
                    tenant_id: claims.tenant_id,
                    store_id: me.store_id,
                    status: Some(me.status),
                };
                if let Ok(mut user) = self.user.lock() {
                    *user = Some(session.clone());
                }
                Ok(Some(session))
            }
            Err(err) if err.status() == 401 || err.status() == 403 => {
                warn!(status = err.status(), "stored session rejected, logging out");
                self.logout();
                Err(err)
            }
            // Offline or transient failure: keep the claims-derived session.
            Err(err) => {
                warn!(error = %err, "could not confirm session, keeping claims");
                Ok(self.current_user())
            }
        }
    }

    /// Drop the session locally. There is no server-side session to revoke;
    /// purging both token stores is the whole operation.
    pub fn logout(&self) {
        self.client.tokens().clear();
        if let Ok(mut user) = self.user.lock() {
            *user = None;
        }
        if let Ok(mut tenant) = self.tenant_id.lock() {
            *tenant = None;
        }
        info!("session closed");
    }

    fn set_error(&self, message: Option<String>) {
        if let Ok(mut error) = self.error.lock() {
            *error = message;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{auth_token, one_shot_server, sequence_server, test_client_arc};

    const USER_ID: &str = "5f6f5c3a-92c1-4e87-9a63-cc2b60f8a5a1";
    const TENANT_ID: &str = "0a3f2a92-1b5e-4b53-8a7f-3d2f9b7c4e21";

    fn login_body(token: &str, role: &str) -> String {
        format!(
            r#"{{
                "access_token": "{token}",
                "token_type": "bearer",
                "user": {{
                    "id": "{USER_ID}",
                    "email": "someone@example.com",
                    "name": "Someone",
                    "role": "{role}"
                }},
                "tenant_id": "{TENANT_ID}"
            }}"#
        )
    }

    #[tokio::test]
    async fn login_persists_token_and_caches_user() {
        let token = auth_token("manager");
        let (base, rx) = one_shot_server("200 OK", &login_body(&token, "manager")).await;
        let state = SessionState::new(test_client_arc(&base));
        assert!(!state.is_authenticated());

        let user = state.login("someone@example.com", "hunter2!").await.unwrap();
        assert_eq!(user.role, Role::Manager);
        assert!(state.is_authenticated());
        assert!(state.has_role(Role::Manager));
        assert!(state.has_permission(Permission::ManageUsers));
        assert!(!state.has_permission(Permission::ManageStores));
        assert_eq!(state.tenant_id(), Some(TENANT_ID.parse().unwrap()));

        // The login request is an url-encoded form with `username`.
        let request = rx.await.unwrap();
        assert!(request.contains("POST /api/v1/auth/login"));
        assert!(request.contains("username=someone%40example.com"));
        assert!(request.contains("password=hunter2%21"));
    }

    #[tokio::test]
    async fn failed_login_records_the_backend_detail() {
        let (base, _rx) = one_shot_server(
            "401 Unauthorized",
            r#"{ "detail": "Incorrect email or password" }"#,
        )
        .await;
        let state = SessionState::new(test_client_arc(&base));

        let err = state.login("someone@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.status(), 401);
        assert_eq!(
            state.last_error().as_deref(),
            Some("Incorrect email or password")
        );
        assert!(!state.is_authenticated());
        assert!(state.current_user().is_none());
    }

    #[tokio::test]
    async fn logout_purges_the_session_entirely() {
        let token = auth_token("cashier");
        let (base, _rx) = one_shot_server("200 OK", &login_body(&token, "cashier")).await;
        let state = SessionState::new(test_client_arc(&base));
        state.login("someone@example.com", "hunter2!").await.unwrap();
        assert!(state.is_authenticated());

        state.logout();
        assert!(!state.is_authenticated());
        assert!(state.current_user().is_none());
        assert!(state.tenant_id().is_none());
        assert!(!state.has_role(Role::Cashier));
    }

    #[tokio::test]
    async fn restore_keeps_claims_session_when_confirmation_is_transient() {
        // One connection only: the login succeeds, then /users/me gets a
        // connection error and restore falls back to the claims.
        let token = auth_token("manager");
        let base = sequence_server(vec![(
            "200 OK".into(),
            login_body(&token, "manager"),
        )])
        .await;
        let state = SessionState::new(test_client_arc(&base));
        state.login("someone@example.com", "hunter2!").await.unwrap();

        let restored = state.restore().await.unwrap().unwrap();
        assert_eq!(restored.id, USER_ID.parse::<Uuid>().unwrap());
        assert_eq!(restored.role, Role::Manager);
        assert!(state.is_authenticated());
    }
}
