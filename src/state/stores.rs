//! Store directory state, plus the persisted "selected store" preference.

use std::sync::Arc;
use uuid::Uuid;

use super::ResourceCache;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Status, Store, StoreCreate, StoreStats, StoreUpdate};
use crate::storage::Preferences;

pub struct StoreState {
    client: Arc<ApiClient>,
    cache: ResourceCache<Store>,
}

impl StoreState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            cache: ResourceCache::new(),
        }
    }

    pub fn stores(&self) -> Vec<Store> {
        self.cache.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    pub async fn fetch(&self, status: Option<Status>) -> ApiResult<Vec<Store>> {
        self.cache.begin();
        match self.client.stores().list(status, 0, 1000).await {
            Ok(stores) => {
                self.cache.replace(stores.clone());
                self.cache.finish();
                Ok(stores)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, payload: &StoreCreate) -> ApiResult<Store> {
        self.cache.begin();
        match self.client.stores().create(payload).await {
            Ok(store) => {
                self.cache.push(store.clone());
                self.cache.finish();
                Ok(store)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn update(&self, id: Uuid, payload: &StoreUpdate) -> ApiResult<Store> {
        self.cache.begin();
        match self.client.stores().update(id, payload).await {
            Ok(store) => {
                self.cache.upsert(store.clone(), |s| s.id == id);
                self.cache.finish();
                Ok(store)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    /// Status transition; the cached record is patched once confirmed.
    pub async fn set_status(&self, id: Uuid, status: Status) -> ApiResult<()> {
        self.cache.begin();
        match self.client.stores().set_status(id, status).await {
            Ok(()) => {
                self.cache.patch(|s| s.id == id, |s| s.status = status);
                self.cache.finish();
                Ok(())
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.cache.begin();
        match self.client.stores().delete(id).await {
            Ok(()) => {
                self.cache.remove(|s| s.id == id);
                self.cache.finish();
                Ok(())
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn stats(&self, id: Uuid) -> ApiResult<StoreStats> {
        self.client.stores().stats(id).await
    }

    // -----------------------------------------------------------------------
    // Derived getters
    // -----------------------------------------------------------------------

    pub fn find(&self, id: Uuid) -> Option<Store> {
        self.cache.snapshot().into_iter().find(|s| s.id == id)
    }

    pub fn active(&self) -> Vec<Store> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|s| s.status == Status::Active)
            .collect()
    }

    /// Currently selected store, resolved against the cache. The selection
    /// persists independently of backend state; a stale id simply resolves
    /// to `None` here without being cleared.
    pub fn selected(&self, prefs: &Preferences) -> Option<Store> {
        prefs.selected_store().and_then(|id| self.find(id))
    }

    pub fn select(&self, prefs: &Preferences, id: Uuid) -> Result<(), String> {
        prefs.set_selected_store(id)
    }
}
