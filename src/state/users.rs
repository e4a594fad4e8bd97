//! User directory state.

use std::sync::Arc;
use uuid::Uuid;

use super::ResourceCache;
use crate::api::ApiClient;
use crate::endpoints::UserFilter;
use crate::error::ApiResult;
use crate::models::{Role, User, UserCreate, UserUpdate};

pub struct UserState {
    client: Arc<ApiClient>,
    cache: ResourceCache<User>,
}

impl UserState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            cache: ResourceCache::new(),
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.cache.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    /// Replace the cached collection from the backend.
    pub async fn fetch(&self, filter: &UserFilter) -> ApiResult<Vec<User>> {
        self.cache.begin();
        match self.client.users().list(filter).await {
            Ok(users) => {
                self.cache.replace(users.clone());
                self.cache.finish();
                Ok(users)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, payload: &UserCreate) -> ApiResult<User> {
        self.cache.begin();
        match self.client.users().create(payload).await {
            Ok(user) => {
                self.cache.push(user.clone());
                self.cache.finish();
                Ok(user)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn update(&self, id: Uuid, payload: &UserUpdate) -> ApiResult<User> {
        self.cache.begin();
        match self.client.users().update(id, payload).await {
            Ok(user) => {
                self.cache.upsert(user.clone(), |u| u.id == id);
                self.cache.finish();
                Ok(user)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.cache.begin();
        match self.client.users().delete(id).await {
            Ok(()) => {
                self.cache.remove(|u| u.id == id);
                self.cache.finish();
                Ok(())
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Derived getters over the cached snapshot
    // -----------------------------------------------------------------------

    pub fn find(&self, id: Uuid) -> Option<User> {
        self.cache
            .snapshot()
            .into_iter()
            .find(|u| u.id == id)
    }

    pub fn by_role(&self, role: Role) -> Vec<User> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|u| u.role == role)
            .collect()
    }

    pub fn by_store(&self, store_id: Uuid) -> Vec<User> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|u| u.store_id == Some(store_id))
            .collect()
    }
}
