//! Product catalog state.

use std::sync::Arc;
use uuid::Uuid;

use super::ResourceCache;
use crate::api::ApiClient;
use crate::endpoints::ProductFilter;
use crate::error::ApiResult;
use crate::models::{Product, ProductCreate, ProductStatus, ProductUpdate};

/// Low-stock cutoff used when neither the product nor the caller supplies one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

pub struct ProductState {
    client: Arc<ApiClient>,
    cache: ResourceCache<Product>,
}

impl ProductState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            cache: ResourceCache::new(),
        }
    }

    pub fn products(&self) -> Vec<Product> {
        self.cache.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    pub async fn fetch(&self, filter: &ProductFilter) -> ApiResult<Vec<Product>> {
        self.cache.begin();
        match self.client.products().list(filter).await {
            Ok(products) => {
                self.cache.replace(products.clone());
                self.cache.finish();
                Ok(products)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, payload: &ProductCreate) -> ApiResult<Product> {
        self.cache.begin();
        match self.client.products().create(payload).await {
            Ok(product) => {
                self.cache.push(product.clone());
                self.cache.finish();
                Ok(product)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn update(&self, id: Uuid, payload: &ProductUpdate) -> ApiResult<Product> {
        self.cache.begin();
        match self.client.products().update(id, payload).await {
            Ok(product) => {
                self.cache.upsert(product.clone(), |p| p.id == id);
                self.cache.finish();
                Ok(product)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.cache.begin();
        match self.client.products().delete(id).await {
            Ok(()) => {
                self.cache.remove(|p| p.id == id);
                self.cache.finish();
                Ok(())
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    /// Absolute stock write; the cached quantity is patched once confirmed.
    pub async fn set_stock(&self, id: Uuid, new_stock: u32) -> ApiResult<()> {
        self.cache.begin();
        match self.client.products().set_stock(id, new_stock).await {
            Ok(()) => {
                self.cache.patch(|p| p.id == id, |p| p.stock = new_stock as i32);
                self.cache.finish();
                Ok(())
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    /// Upload a product image and patch the cached `img_url` with the URL
    /// the backend stored.
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
        self.cache.begin();
        match self
            .client
            .products()
            .upload_image(id, file_name, mime, data, on_progress)
            .await
        {
            Ok(url) => {
                self.cache
                    .patch(|p| p.id == id, |p| p.img_url = Some(url.clone()));
                self.cache.finish();
                Ok(url)
            }
            Err(err) => {
                self.cache.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn delete_image(&self, id: Uuid) -> ApiResult<()> {
        self.cache.begin();
        match self.client.products().delete_image(id).await {
            Ok(()) => {
                self.cache.patch(|p| p.id == id, |p| p.img_url = None);
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
    // Derived getters
    // -----------------------------------------------------------------------

    pub fn find(&self, id: Uuid) -> Option<Product> {
        self.cache.snapshot().into_iter().find(|p| p.id == id)
    }

    /// Scan-path lookup against the cache; exact match on barcode first,
    /// then SKU.
    pub fn by_code(&self, code: &str) -> Option<Product> {
        let items = self.cache.snapshot();
        items
            .iter()
            .find(|p| p.barcode.as_deref() == Some(code))
            .or_else(|| items.iter().find(|p| p.sku == code))
            .cloned()
    }

    pub fn active(&self) -> Vec<Product> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|p| p.status == ProductStatus::Active)
            .collect()
    }

    /// Products at or below their low-stock threshold (per-product override,
    /// falling back to [`DEFAULT_LOW_STOCK_THRESHOLD`]).
    pub fn low_stock(&self) -> Vec<Product> {
        self.cache
            .snapshot()
            .into_iter()
            .filter(|p| p.stock <= p.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD))
            .collect()
    }

    /// Distinct categories present in the cache, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self
            .cache
            .snapshot()
            .into_iter()
            .filter_map(|p| p.category)
            .collect();
        cats.sort();
        cats.dedup();
        cats
    }
}
