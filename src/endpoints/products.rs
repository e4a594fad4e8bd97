//! Product catalog endpoints, including image upload with progress.

use serde::Deserialize;
use uuid::Uuid;

use super::push_opt;
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Product, ProductCreate, ProductStatus, ProductUpdate};

/// Optional list filters; only present keys reach the query string.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub store_id: Option<Uuid>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ImageUploadResponse {
    image_url: String,
}

pub struct ProductsApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn products(&self) -> ProductsApi<'_> {
        ProductsApi { client: self }
    }
}

impl ProductsApi<'_> {
    pub async fn list(&self, filter: &ProductFilter) -> ApiResult<Vec<Product>> {
        let mut query = Vec::new();
        push_opt(&mut query, "store_id", filter.store_id.map(|id| id.to_string()));
        push_opt(&mut query, "category", filter.category.clone());
        push_opt(&mut query, "search", filter.search.clone());
        push_opt(&mut query, "status", filter.status.map(|s| s.as_str().to_string()));
        push_opt(&mut query, "skip", filter.skip.map(|n| n.to_string()));
        push_opt(&mut query, "limit", filter.limit.map(|n| n.to_string()));
        self.client.get_json("/products/", &query).await
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Product> {
        self.client.get_json(&format!("/products/{id}"), &[]).await
    }

    pub async fn by_sku(&self, sku: &str) -> ApiResult<Product> {
        self.client.get_json(&format!("/products/sku/{sku}"), &[]).await
    }

    /// Barcode lookup for the register's scan path.
    pub async fn by_barcode(&self, barcode: &str) -> ApiResult<Product> {
        self.client
            .get_json(&format!("/products/barcode/{barcode}"), &[])
            .await
    }

    pub async fn low_stock(&self, threshold: u32) -> ApiResult<Vec<Product>> {
        self.client
            .get_json(
                "/products/stock/low",
                &[("threshold", threshold.to_string())],
            )
            .await
    }

    pub async fn categories(&self) -> ApiResult<Vec<String>> {
        self.client.get_json("/products/categories/", &[]).await
    }

    pub async fn create(&self, payload: &ProductCreate) -> ApiResult<Product> {
        self.client.post_json("/products/", payload).await
    }

    /// Products update via `PUT` in every backend version, like sales.
    pub async fn update(&self, id: Uuid, payload: &ProductUpdate) -> ApiResult<Product> {
        self.client
            .put_json(&format!("/products/{id}"), payload)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.client.delete(&format!("/products/{id}")).await
    }

    /// Set an absolute stock quantity (query-encoded endpoint).
    pub async fn set_stock(&self, id: Uuid, new_stock: u32) -> ApiResult<()> {
        self.client
            .patch_query(
                &format!("/products/{id}/stock"),
                &[("new_stock", new_stock.to_string())],
            )
            .await?;
        Ok(())
    }

    /// Upload a product image (max 5 MB server-side), reporting
    /// `(bytes_sent, total)` through `on_progress`. Returns the stored
    /// image URL.
    pub async fn upload_image<F>(
        &self,
        id: Uuid,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        on_progress: F,
    ) -> ApiResult<String>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let response: ImageUploadResponse = self
            .client
            .upload_with_progress(
                &format!("/products/{id}/image"),
                "file",
                file_name,
                mime,
                data,
                on_progress,
            )
            .await?;
        Ok(response.image_url)
    }

    pub async fn delete_image(&self, id: Uuid) -> ApiResult<()> {
        self.client.delete(&format!("/products/{id}/image")).await
    }
}
