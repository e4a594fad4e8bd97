//! Sales endpoints: the register's checkout path, invoice handling, and
//! the statistics summary.

use bytes::Bytes;
use uuid::Uuid;

use super::push_opt;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{
    NextInvoice, PaymentStatus, Sale, SaleCreate, SaleFilter, SaleSummary, SaleUpdate,
};

pub struct SalesApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn sales(&self) -> SalesApi<'_> {
        SalesApi { client: self }
    }
}

impl SalesApi<'_> {
    pub async fn list(&self, filter: &SaleFilter) -> ApiResult<Vec<Sale>> {
        let mut query = Vec::new();
        push_opt(&mut query, "store_id", filter.store_id.map(|id| id.to_string()));
        push_opt(&mut query, "date_from", filter.date_from.map(|d| d.to_string()));
        push_opt(&mut query, "date_to", filter.date_to.map(|d| d.to_string()));
        push_opt(&mut query, "status", filter.status.map(|s| s.as_str().to_string()));
        push_opt(
            &mut query,
            "payment_method",
            filter.payment_method.map(|m| m.as_str().to_string()),
        );
        push_opt(&mut query, "skip", filter.skip.map(|n| n.to_string()));
        push_opt(&mut query, "limit", filter.limit.map(|n| n.to_string()));
        self.client.get_json("/sales/", &query).await
    }

    /// Next free invoice number for the tenant.
    pub async fn next_invoice(&self) -> ApiResult<String> {
        let next: NextInvoice = self.client.get_json("/sales/next-invoice", &[]).await?;
        Ok(next.invoice_number)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Sale> {
        self.client.get_json(&format!("/sales/{id}"), &[]).await
    }

    /// Record a completed checkout. Sales are immutable to the register
    /// after this; corrections go through [`Self::update`] (admin only).
    pub async fn create(&self, payload: &SaleCreate) -> ApiResult<Sale> {
        self.client.post_json("/sales/", payload).await
    }

    pub async fn update(&self, id: Uuid, payload: &SaleUpdate) -> ApiResult<Sale> {
        // Sales updates are PUT in every backend version.
        self.client.put_json(&format!("/sales/{id}"), payload).await
    }

    pub async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> ApiResult<()> {
        self.client
            .patch_query(
                &format!("/sales/{id}/payment-status"),
                &[("payment_status", status.as_str().to_string())],
            )
            .await?;
        Ok(())
    }

    /// Download the invoice PDF bytes (404 when none was generated).
    pub async fn download_invoice(&self, id: Uuid) -> ApiResult<Bytes> {
        self.client.get_bytes(&format!("/sales/{id}/invoice")).await
    }

    /// Attach a generated invoice PDF to a sale, with upload progress.
    pub async fn upload_invoice<F>(&self, id: Uuid, data: Vec<u8>, on_progress: F) -> ApiResult<()>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let _: Option<serde_json::Value> = self
            .client
            .upload_with_progress(
                &format!("/sales/{id}/invoice"),
                "file",
                &format!("invoice_{id}.pdf"),
                "application/pdf",
                data,
                on_progress,
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.client.delete(&format!("/sales/{id}")).await
    }

    pub async fn statistics(&self) -> ApiResult<SaleSummary> {
        self.client.get_json("/sales/statistics/summary", &[]).await
    }
}
