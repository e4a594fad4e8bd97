//! HTTP request core.
//!
//! One request path for the whole client: resolve the absolute URL from the
//! configured base + version prefix, attach bearer auth when a token is
//! stored, serialize the body (JSON by default; form and multipart bodies
//! keep their own content types), and normalize every failure into the
//! two-level error taxonomy from [`crate::error`].

use bytes::Bytes;
use reqwest::{multipart, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{ClientConfig, CONNECTIVITY_TIMEOUT};
use crate::error::{resolve_error_message, status_message, ApiError, ApiResult};
use crate::token::TokenManager;

/// Upload chunk size for progress reporting.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Authenticated client for the PosDesk REST API.
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    tokens: Arc<TokenManager>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: Arc<TokenManager>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    // -----------------------------------------------------------------------
    // Request core
    // -----------------------------------------------------------------------

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.config.endpoint(path);
        let mut req = self.http.request(method, url);
        if let Some(token) = self.tokens.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Execute a prepared request and normalize the response.
    ///
    /// `204` (or an empty body) resolves to `None` without ever touching the
    /// JSON parser. Non-2xx responses become [`ApiError::Api`] with the
    /// message drawn from the body's known fields and the raw payload
    /// attached. Transport failures become [`ApiError::Network`] (status 0).
    async fn execute(&self, req: reqwest::RequestBuilder) -> ApiResult<Option<Value>> {
        let resp = req.send().await.map_err(|e| friendly_error(&e))?;
        let status = resp.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let payload = serde_json::from_str::<Value>(&body_text).ok();
            let message = payload
                .as_ref()
                .and_then(resolve_error_message)
                .unwrap_or_else(|| status_message(status.as_u16()));
            debug!(status = status.as_u16(), %message, "API error response");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                payload,
            });
        }

        if body_text.is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&body_text)?;
        Ok(Some(value))
    }

    fn decode<T: DeserializeOwned>(value: Option<Value>) -> ApiResult<T> {
        Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
    }

    // -----------------------------------------------------------------------
    // Verb helpers
    // -----------------------------------------------------------------------

    /// Raw GET returning the JSON body (or `None` for no content). Query
    /// pairs are appended as-is; callers only pass keys that are present.
    pub async fn get_value(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Option<Value>> {
        let mut req = self.builder(Method::GET, path);
        if !query.is_empty() {
            req = req.query(query);
        }
        self.execute(req).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        Self::decode(self.get_value(path, query).await?)
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let req = self.builder(Method::POST, path).json(body);
        Self::decode(self.execute(req).await?)
    }

    /// Resource update using the configured verb (PATCH by default, PUT for
    /// legacy deployments).
    pub async fn update_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let method = self.config.update_verb.as_method();
        let req = self.builder(method, path).json(body);
        Self::decode(self.execute(req).await?)
    }

    /// PUT regardless of the configured update verb (sales updates are PUT
    /// in every backend version).
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let req = self.builder(Method::PUT, path).json(body);
        Self::decode(self.execute(req).await?)
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let req = self.builder(Method::PATCH, path).json(body);
        Self::decode(self.execute(req).await?)
    }

    /// PATCH with query-encoded parameters and no body (a couple of
    /// endpoints take their input this way).
    pub async fn patch_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Option<Value>> {
        let req = self.builder(Method::PATCH, path).query(query);
        self.execute(req).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let req = self.builder(Method::DELETE, path);
        self.execute(req).await?;
        Ok(())
    }

    /// POST a url-encoded form (the OAuth2 login flow). The form encoder
    /// sets its own content type; no JSON default is applied.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> ApiResult<T> {
        let req = self.builder(Method::POST, path).form(form);
        Self::decode(self.execute(req).await?)
    }

    /// GET returning the raw response body (invoice PDFs). Non-2xx
    /// responses go through the same error normalization as JSON calls.
    pub async fn get_bytes(&self, path: &str) -> ApiResult<Bytes> {
        let resp = self
            .builder(Method::GET, path)
            .send()
            .await
            .map_err(|e| friendly_error(&e))?;
        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            let payload = serde_json::from_str::<Value>(&body_text).ok();
            let message = payload
                .as_ref()
                .and_then(resolve_error_message)
                .unwrap_or_else(|| status_message(status.as_u16()));
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                payload,
            });
        }
        Ok(resp.bytes().await.map_err(|e| friendly_error(&e))?)
    }

    // -----------------------------------------------------------------------
    // Binary upload with progress
    // -----------------------------------------------------------------------

    /// Multipart upload streaming `data` in chunks, reporting
    /// `(bytes_sent, total_bytes)` to `on_progress` as the transport
    /// consumes them. Mirrors the normal error-wrapping contract.
    pub async fn upload_with_progress<T, F>(
        &self,
        path: &str,
        field: &'static str,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        on_progress: F,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let total = data.len() as u64;
        let sent = AtomicU64::new(0);
        let chunks: Vec<Bytes> = data
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(Bytes::copy_from_slice)
            .collect();

        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            let so_far = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
            on_progress(so_far, total);
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| ApiError::network(format!("invalid upload mime type: {e}")))?;
        let form = multipart::Form::new().part(field, part);

        let req = self.builder(Method::POST, path).multipart(form);
        Self::decode(self.execute(req).await?)
    }

    // -----------------------------------------------------------------------
    // Connectivity test
    // -----------------------------------------------------------------------

    /// Lightweight reachability probe against the public health endpoint,
    /// with latency measurement. Never fails; the result carries the error.
    pub async fn test_connectivity(&self) -> ConnectivityResult {
        let url = self.config.endpoint("/public/health");
        let start = Instant::now();

        let resp = match self.http.get(&url).timeout(CONNECTIVITY_TIMEOUT).send().await {
            Ok(r) => r,
            Err(e) => {
                return ConnectivityResult {
                    success: false,
                    latency_ms: None,
                    error: Some(friendly_error(&e).message().to_string()),
                };
            }
        };

        let latency = start.elapsed().as_millis() as u64;
        if resp.status().is_success() {
            info!(latency_ms = latency, "connectivity test passed");
            ConnectivityResult {
                success: true,
                latency_ms: Some(latency),
                error: None,
            }
        } else {
            ConnectivityResult {
                success: false,
                latency_ms: Some(latency),
                error: Some(status_message(resp.status().as_u16())),
            }
        }
    }
}

/// Result of a connectivity test.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Convert a `reqwest::Error` into the status-0 taxonomy with a message a
/// user can act on.
fn friendly_error(err: &reqwest::Error) -> ApiError {
    let message = if err.is_connect() {
        "Cannot reach the POS backend".to_string()
    } else if err.is_timeout() {
        "Connection to the POS backend timed out".to_string()
    } else if err.is_builder() {
        "Invalid backend URL".to_string()
    } else {
        format!("Network error communicating with the POS backend: {err}")
    };
    ApiError::Network { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{auth_token, one_shot_server, test_client};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn no_content_resolves_to_none() {
        let (base, _rx) = one_shot_server("204 No Content", "").await;
        let client = test_client(&base);
        let result = client.get_value("/health/", &[]).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn error_body_detail_becomes_the_message() {
        let (base, _rx) = one_shot_server("404 Not Found", r#"{ "detail": "Not found" }"#).await;
        let client = test_client(&base);
        let err = client.get_value("/users/", &[]).await.unwrap_err();
        match err {
            ApiError::Api {
                status,
                message,
                payload,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not found");
                assert!(payload.is_some());
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_status_message() {
        let (base, _rx) = one_shot_server("500 Internal Server Error", "<html>oops</html>").await;
        let client = test_client(&base);
        let err = client.get_value("/users/", &[]).await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.message().contains("server error"));
    }

    #[tokio::test]
    async fn connection_failure_maps_to_status_zero() {
        // Bind then drop to get a port that refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = test_client(&format!("http://{addr}"));
        let err = client.get_value("/users/", &[]).await.unwrap_err();
        assert_eq!(err.status(), 0);
    }

    #[tokio::test]
    async fn bearer_token_and_versioned_path_are_sent() {
        let (base, rx) = one_shot_server("200 OK", "[]").await;
        let client = test_client(&base);

        let token = auth_token("manager");
        assert!(client.tokens().set_token(&token, None));

        let _: Vec<Value> = client
            .get_json("/users/", &[("role", "cashier".to_string())])
            .await
            .unwrap();
        let request = rx.await.unwrap();
        assert!(request.starts_with("GET /api/v1/users/?role=cashier"));
        assert!(request.contains(&format!("authorization: Bearer {token}"))
            || request.contains(&format!("Authorization: Bearer {token}")));
    }

    /// Like `one_shot_server` but drains the whole request (streamed
    /// multipart bodies span many reads) before responding.
    async fn draining_server(body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut collected = Vec::new();
                let mut buf = vec![0u8; 16 * 1024];
                loop {
                    match sock.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            collected.extend_from_slice(&buf[..n]);
                            // Multipart bodies end with "--<boundary>--\r\n".
                            if collected.ends_with(b"--\r\n") {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&collected).to_string());
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        (format!("http://{addr}"), rx)
    }

    #[tokio::test]
    async fn upload_reports_progress_to_completion() {
        let (base, rx) = draining_server(r#"{ "img_url": "/files/x.png" }"#).await;
        let client = test_client(&base);

        let progress = Arc::new(std::sync::Mutex::new(Vec::new()));
        let progress_clone = Arc::clone(&progress);
        let data = vec![0u8; 150 * 1024]; // three chunks
        let total = data.len() as u64;

        let result: Value = client
            .upload_with_progress("/products/1/image", "file", "x.png", "image/png", data, {
                move |sent, of| progress_clone.lock().unwrap().push((sent, of))
            })
            .await
            .unwrap();
        assert_eq!(result["img_url"], "/files/x.png");

        let recorded = progress.lock().unwrap();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded.last().copied(), Some((total, total)));

        let request = rx.await.unwrap();
        assert!(request.contains("multipart/form-data"));
    }
}
