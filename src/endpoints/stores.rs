//! Store (retail location) endpoints.

use uuid::Uuid;

use super::push_opt;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Status, Store, StoreCreate, StoreStats, StoreUpdate};

pub struct StoresApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn stores(&self) -> StoresApi<'_> {
        StoresApi { client: self }
    }
}

impl StoresApi<'_> {
    pub async fn list(
        &self,
        status: Option<Status>,
        skip: u32,
        limit: u32,
    ) -> ApiResult<Vec<Store>> {
        let mut query = vec![("skip", skip.to_string()), ("limit", limit.to_string())];
        push_opt(&mut query, "status", status.map(|s| s.as_str().to_string()));
        self.client.get_json("/stores/", &query).await
    }

    pub async fn active(&self) -> ApiResult<Vec<Store>> {
        self.client.get_json("/stores/active", &[]).await
    }

    /// Search by name or address.
    pub async fn search(&self, term: &str) -> ApiResult<Vec<Store>> {
        self.client
            .get_json("/stores/search", &[("search_term", term.to_string())])
            .await
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Store> {
        self.client.get_json(&format!("/stores/{id}"), &[]).await
    }

    pub async fn stats(&self, id: Uuid) -> ApiResult<StoreStats> {
        self.client
            .get_json(&format!("/stores/{id}/stats"), &[])
            .await
    }

    pub async fn create(&self, payload: &StoreCreate) -> ApiResult<Store> {
        self.client.post_json("/stores/", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &StoreUpdate) -> ApiResult<Store> {
        self.client
            .update_json(&format!("/stores/{id}"), payload)
            .await
    }

    /// Status transitions go through a dedicated query-encoded endpoint
    /// (super admin only).
    pub async fn set_status(&self, id: Uuid, status: Status) -> ApiResult<()> {
        self.client
            .patch_query(
                &format!("/stores/{id}/status"),
                &[("status", status.as_str().to_string())],
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.client.delete(&format!("/stores/{id}")).await
    }
}
