//! Customer endpoints. Derived metrics (order counts, spend) are computed
//! client-side in [`crate::state::queries`], not served by the backend.

use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Customer, CustomerCreate, CustomerUpdate};

pub struct CustomersApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn customers(&self) -> CustomersApi<'_> {
        CustomersApi { client: self }
    }
}

impl CustomersApi<'_> {
    pub async fn list(&self) -> ApiResult<Vec<Customer>> {
        self.client.get_json("/customers/", &[]).await
    }

    /// Creation requires a store: either in the payload or implied by the
    /// caller's own store assignment (the backend rejects neither-case with
    /// a 400 and duplicate phones with a 409).
    pub async fn create(&self, payload: &CustomerCreate) -> ApiResult<Customer> {
        self.client.post_json("/customers/", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &CustomerUpdate) -> ApiResult<Customer> {
        self.client
            .update_json(&format!("/customers/{id}"), payload)
            .await
    }
}
