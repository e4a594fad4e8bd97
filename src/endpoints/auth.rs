//! Auth endpoints: OAuth2 password login and super-admin signup.

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{LoginResponse, SignupRequest};

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }
}

impl AuthApi<'_> {
    /// OAuth2 password flow: url-encoded form, `username` carries the email.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        self.client
            .post_form("/auth/login", &[("username", email), ("password", password)])
            .await
    }

    /// Registers a new super admin and their tenant. The backend rejects
    /// signup for any other role; managers and cashiers are created through
    /// the users resource.
    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<LoginResponse> {
        self.client.post_json("/auth/signup", request).await
    }
}
