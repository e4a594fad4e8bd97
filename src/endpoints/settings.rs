//! Tenant settings endpoints.

use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Settings, SettingsUpdate};

#[derive(Debug, Deserialize)]
struct LogoUploadResponse {
    image_url: String,
}

pub struct SettingsApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn settings(&self) -> SettingsApi<'_> {
        SettingsApi { client: self }
    }
}

impl SettingsApi<'_> {
    pub async fn get(&self) -> ApiResult<Settings> {
        self.client.get_json("/settings/", &[]).await
    }

    pub async fn update(&self, payload: &SettingsUpdate) -> ApiResult<Settings> {
        self.client.update_json("/settings/", payload).await
    }

    /// Upload the store logo with progress reporting; returns the stored
    /// logo URL.
    pub async fn upload_logo<F>(
        &self,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        on_progress: F,
    ) -> ApiResult<String>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let response: LogoUploadResponse = self
            .client
            .upload_with_progress("/settings/logo", "file", file_name, mime, data, on_progress)
            .await?;
        Ok(response.image_url)
    }
}
