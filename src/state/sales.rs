//! Sales history state: the fetched window of sales plus the statistics
//! summary for the same scope.

use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

use super::ResourceCache;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{
    PaymentStatus, Sale, SaleCreate, SaleFilter, SaleSummary, SaleUpdate,
};

pub struct SaleState {
    client: Arc<ApiClient>,
    cache: ResourceCache<Sale>,
    summary: Mutex<Option<SaleSummary>>,
}

impl SaleState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            cache: ResourceCache::new(),
            summary: Mutex::new(None),
        }
    }

    pub fn sales(&self) -> Vec<Sale> {
        self.cache.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    pub fn summary(&self) -> Option<SaleSummary> {
        self.summary.lock().ok().and_then(|s| s.clone())
    }

    pub async fn fetch(&self, filter: &SaleFilter) -> ApiResult<Vec<Sale>> {
        self.cache.begin();
        match self.client.sales().list(filter).await {
            Ok(sales) => {
                self.cache.replace(sales.clone());
                self.cache.finish();
                Ok(sales)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    /// Record a checkout. The created sale is prepended so the newest row
    /// shows first, matching the backend's ordering.
    pub async fn create(&self, payload: &SaleCreate) -> ApiResult<Sale> {
        self.cache.begin();
        match self.client.sales().create(payload).await {
            Ok(sale) => {
                let mut window = self.cache.snapshot();
                window.insert(0, sale.clone());
                self.cache.replace(window);
                self.cache.finish();
                Ok(sale)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    /// Admin-only correction of a recorded sale.
    pub async fn update(&self, id: Uuid, payload: &SaleUpdate) -> ApiResult<Sale> {
        self.cache.begin();
        match self.client.sales().update(id, payload).await {
            Ok(sale) => {
                self.cache.upsert(sale.clone(), |s| s.id == id);
                self.cache.finish();
                Ok(sale)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> ApiResult<()> {
        self.cache.begin();
        match self.client.sales().set_payment_status(id, status).await {
            Ok(()) => {
                self.cache
                    .patch(|s| s.id == id, |s| s.payment_status = Some(status));
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
        match self.client.sales().delete(id).await {
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

    pub async fn refresh_summary(&self) -> ApiResult<SaleSummary> {
        let summary = self.client.sales().statistics().await?;
        if let Ok(mut slot) = self.summary.lock() {
            *slot = Some(summary.clone());
        }
        Ok(summary)
    }

    pub async fn next_invoice(&self) -> ApiResult<String> {
        self.client.sales().next_invoice().await
    }

    // -----------------------------------------------------------------------
    // Derived getters
    // -----------------------------------------------------------------------

    pub fn find(&self, id: Uuid) -> Option<Sale> {
        self.cache.snapshot().into_iter().find(|s| s.id == id)
    }

    pub fn by_invoice(&self, invoice_no: &str) -> Option<Sale> {
        self.cache
            .snapshot()
            .into_iter()
            .find(|s| s.invoice_no == invoice_no)
    }

    pub fn for_customer(&self, customer_id: Uuid) -> Vec<Sale> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|s| s.customer_id == Some(customer_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountType, PaymentMethod, SaleItemCreate, SaleStatus, UpiStatus};
    use crate::testutil::{sequence_server, test_client_arc};
    use rust_decimal_macros::dec;

    const SALE_ID: &str = "7d1f9a52-7a8f-4f7a-9a1d-0d5c4e3f2b10";
    const OLDER_ID: &str = "2a3b4c5d-6e7f-4a8b-9c0d-1e2f3a4b5c6d";

    fn sale_json(id: &str, invoice: &str, payment_status: &str) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "invoice_no": "{invoice}",
                "payment_method": "cash",
                "payment_status": "{payment_status}",
                "subtotal": "100.00",
                "discount": "0.00",
                "tax": "5.00",
                "total": "105.00",
                "paid_amount": "105.00",
                "status": "completed",
                "created_at": "2026-01-05T10:00:00Z"
            }}"#
        )
    }

    #[tokio::test]
    async fn created_sale_is_prepended_to_the_window() {
        let base = sequence_server(vec![
            (
                "200 OK".into(),
                format!("[{}]", sale_json(OLDER_ID, "INV-0001", "paid")),
            ),
            (
                "201 Created".into(),
                sale_json(SALE_ID, "INV-0002", "paid"),
            ),
        ])
        .await;
        let state = SaleState::new(test_client_arc(&base));
        state.fetch(&SaleFilter::default()).await.unwrap();

        let sale = state
            .create(&SaleCreate {
                invoice_no: "INV-0002".into(),
                customer_id: None,
                store_id: None,
                cashier_id: None,
                payment_method: PaymentMethod::Cash,
                subtotal: dec!(100.00),
                discount: dec!(0.00),
                discount_type: DiscountType::Flat,
                discount_value_input: dec!(0.00),
                tax: dec!(5.00),
                total: dec!(105.00),
                paid_amount: dec!(105.00),
                change_amount: None,
                upi_status: UpiStatus::NotApplicable,
                status: SaleStatus::Completed,
                items: vec![SaleItemCreate {
                    product_id: Uuid::new_v4(),
                    quantity: 4,
                    unit_price: dec!(25.00),
                    total: Some(dec!(100.00)),
                    store_id: None,
                }],
            })
            .await
            .unwrap();

        let window = state.sales();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].id, sale.id);
        assert_eq!(window[1].invoice_no, "INV-0001");
        assert!(state.by_invoice("INV-0002").is_some());
    }

    #[tokio::test]
    async fn payment_status_change_patches_the_cached_row() {
        let base = sequence_server(vec![
            (
                "200 OK".into(),
                format!("[{}]", sale_json(SALE_ID, "INV-0002", "pending")),
            ),
            (
                "200 OK".into(),
                r#"{ "message": "Payment status updated" }"#.into(),
            ),
        ])
        .await;
        let state = SaleState::new(test_client_arc(&base));
        state.fetch(&SaleFilter::default()).await.unwrap();

        let id: Uuid = SALE_ID.parse().unwrap();
        state.set_payment_status(id, PaymentStatus::Paid).await.unwrap();
        assert_eq!(
            state.find(id).unwrap().payment_status,
            Some(PaymentStatus::Paid)
        );
    }
}
