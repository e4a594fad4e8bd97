//! Shared test plumbing: canned-response HTTP servers on a loopback socket
//! and clients wired to in-memory token storage.

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::storage::MemoryBackend;
use crate::token::TokenManager;

pub(crate) fn memory_tokens() -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        Box::new(MemoryBackend::new()),
        Box::new(MemoryBackend::new()),
    ))
}

pub(crate) fn test_client(base_url: &str) -> ApiClient {
    ApiClient::new(ClientConfig::new(base_url), memory_tokens()).unwrap()
}

pub(crate) fn test_client_arc(base_url: &str) -> Arc<ApiClient> {
    Arc::new(test_client(base_url))
}

/// Unsigned JWT-shaped token with the given role, valid for an hour.
pub(crate) fn auth_token(role: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "sub": "5f6f5c3a-92c1-4e87-9a63-cc2b60f8a5a1",
            "email": "someone@example.com",
            "name": "Someone",
            "role": role,
            "tenant_id": "0a3f2a92-1b5e-4b53-8a7f-3d2f9b7c4e21",
            "exp": chrono::Utc::now().timestamp() + 3600,
        })
        .to_string(),
    );
    format!("h.{payload}.s")
}

/// Serve one canned HTTP response, returning the base URL and a channel
/// that yields the raw request the client sent.
pub(crate) async fn one_shot_server(
    status_line: &str,
    body: &str,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let n = sock.read(&mut buf).await.unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());
            let _ = sock.write_all(response.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });
    (format!("http://{addr}"), rx)
}

/// Serve a sequence of canned responses, one per connection, in order.
pub(crate) async fn sequence_server(responses: Vec<(String, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for (status_line, body) in responses {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let mut buf = vec![0u8; 8192];
            let _ = sock.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(response.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });
    format!("http://{addr}")
}
