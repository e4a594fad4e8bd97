//! User management endpoints. Visibility is role-scoped server-side:
//! super admins see the whole tenant, managers their stores, cashiers
//! themselves.

use uuid::Uuid;

use super::push_opt;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Role, User, UserCreate, UserUpdate};

/// Optional list filters; only present keys reach the query string.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub store_id: Option<Uuid>,
    pub role: Option<Role>,
}

pub struct UsersApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn users(&self) -> UsersApi<'_> {
        UsersApi { client: self }
    }
}

impl UsersApi<'_> {
    pub async fn list(&self, filter: &UserFilter) -> ApiResult<Vec<User>> {
        let mut query = Vec::new();
        push_opt(&mut query, "store_id", filter.store_id.map(|id| id.to_string()));
        push_opt(&mut query, "role", filter.role.map(|r| r.as_str().to_string()));
        self.client.get_json("/users/", &query).await
    }

    /// Profile of the currently authenticated user.
    pub async fn me(&self) -> ApiResult<User> {
        self.client.get_json("/users/me", &[]).await
    }

    pub async fn create(&self, payload: &UserCreate) -> ApiResult<User> {
        self.client.post_json("/users/", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &UserUpdate) -> ApiResult<User> {
        self.client.update_json(&format!("/users/{id}"), payload).await
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.client.delete(&format!("/users/{id}")).await
    }

    pub async fn by_store(&self, store_id: Uuid) -> ApiResult<Vec<User>> {
        self.client
            .get_json(&format!("/users/store/{store_id}"), &[])
            .await
    }

    /// All managers in the tenant (for store assignment pickers).
    pub async fn managers(&self) -> ApiResult<Vec<User>> {
        self.client.get_json("/users/managers", &[]).await
    }
}
