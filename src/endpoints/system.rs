//! Health and public endpoints (no auth required server-side).

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::HealthStatus;
use serde_json::Value;

pub struct SystemApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn system(&self) -> SystemApi<'_> {
        SystemApi { client: self }
    }
}

impl SystemApi<'_> {
    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.client.get_json("/health/", &[]).await
    }

    /// Database-level health (slower; exercises a real query).
    pub async fn health_db(&self) -> ApiResult<HealthStatus> {
        self.client.get_json("/health/db", &[]).await
    }

    pub async fn public_health(&self) -> ApiResult<HealthStatus> {
        self.client.get_json("/public/health", &[]).await
    }

    /// Deployment metadata (version, exposed route roots).
    pub async fn public_info(&self) -> ApiResult<Value> {
        let value = self.client.get_value("/public/info", &[]).await?;
        Ok(value.unwrap_or(Value::Null))
    }
}
