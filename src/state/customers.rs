//! Customer directory state.

use std::sync::Arc;
use uuid::Uuid;

use super::ResourceCache;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Customer, CustomerCreate, CustomerUpdate};

pub struct CustomerState {
    client: Arc<ApiClient>,
    cache: ResourceCache<Customer>,
}

impl CustomerState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            cache: ResourceCache::new(),
        }
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.cache.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    pub async fn fetch(&self) -> ApiResult<Vec<Customer>> {
        self.cache.begin();
        match self.client.customers().list().await {
            Ok(customers) => {
                self.cache.replace(customers.clone());
                self.cache.finish();
                Ok(customers)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, payload: &CustomerCreate) -> ApiResult<Customer> {
        self.cache.begin();
        match self.client.customers().create(payload).await {
            Ok(customer) => {
                self.cache.push(customer.clone());
                self.cache.finish();
                Ok(customer)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn update(&self, id: Uuid, payload: &CustomerUpdate) -> ApiResult<Customer> {
        self.cache.begin();
        match self.client.customers().update(id, payload).await {
            Ok(customer) => {
                self.cache.upsert(customer.clone(), |c| c.id == id);
                self.cache.finish();
                Ok(customer)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Derived getters
    // -----------------------------------------------------------------------

    pub fn find(&self, id: Uuid) -> Option<Customer> {
        self.cache.snapshot().into_iter().find(|c| c.id == id)
    }

    /// Exact-phone lookup, the register's usual path for repeat customers.
    pub fn by_phone(&self, phone: &str) -> Option<Customer> {
        self.cache
            .snapshot()
            .into_iter()
            .find(|c| c.phone == phone)
    }

    /// Case-insensitive substring search over name and phone.
    pub fn search(&self, term: &str) -> Vec<Customer> {
        let needle = term.to_lowercase();
        self.cache
            .snapshot()
            .into_iter()
            .filter(|c| c.name.to_lowercase().contains(&needle) || c.phone.contains(term))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{one_shot_server, sequence_server, test_client_arc};

    const CUSTOMER_ID: &str = "1e2d3c4b-5a69-4788-9691-a0b1c2d3e4f5";
    const STORE_ID: &str = "9b2c1d40-3f21-4a5b-8a60-f2e4d3c2b1a0";

    fn customer_json(name: &str, phone: &str) -> String {
        format!(
            r#"{{
                "id": "{CUSTOMER_ID}",
                "store_id": "{STORE_ID}",
                "name": "{name}",
                "phone": "{phone}",
                "created_at": "2026-01-05T10:00:00Z"
            }}"#
        )
    }

    #[tokio::test]
    async fn phone_and_name_lookups_work_over_the_snapshot() {
        let body = format!("[{}]", customer_json("Priya Sharma", "9876543210"));
        let (base, _rx) = one_shot_server("200 OK", &body).await;
        let state = CustomerState::new(test_client_arc(&base));
        state.fetch().await.unwrap();

        assert!(state.by_phone("9876543210").is_some());
        assert!(state.by_phone("9000000000").is_none());
        assert_eq!(state.search("priya").len(), 1);
        assert_eq!(state.search("98765").len(), 1);
        assert!(state.search("nobody").is_empty());
    }

    #[tokio::test]
    async fn duplicate_phone_conflict_surfaces_the_backend_detail() {
        let base = sequence_server(vec![
            ("200 OK".into(), "[]".into()),
            (
                "409 Conflict".into(),
                r#"{ "detail": "Customer with this phone number already exists" }"#.into(),
            ),
        ])
        .await;
        let state = CustomerState::new(test_client_arc(&base));
        state.fetch().await.unwrap();

        let err = state
            .create(&CustomerCreate {
                name: "Priya Sharma".into(),
                phone: "9876543210".into(),
                store_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), 409);
        assert_eq!(
            state.last_error().as_deref(),
            Some("Customer with this phone number already exists")
        );
        assert!(state.customers().is_empty());
    }
}
