//! Shared fixtures for tagscan-server integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tagscan_common::config::TagscanConfig;
use tagscan_server::db::SqliteTagStore;
use tagscan_server::models::{DetailLevel, ImageItem};
use tagscan_server::services::{ExtractionError, TagExtractor};
use tagscan_server::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const BOUNDARY: &str = "tagscan-test-boundary";

/// Mint an HS256 token expiring `ttl_secs` from now (negative = already expired)
pub fn mint_token(user_id: i64, email: &str, ttl_secs: i64) -> String {
    mint_token_with_secret(user_id, email, ttl_secs, SECRET)
}

pub fn mint_token_with_secret(user_id: i64, email: &str, ttl_secs: i64, secret: &str) -> String {
    let claims = serde_json::json!({
        "id": user_id,
        "email": email,
        "exp": chrono::Utc::now().timestamp() + ttl_secs,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

/// Replies with the image bytes as UTF-8; an image whose bytes are `FAIL`
/// errors like an unreachable model
#[derive(Default)]
pub struct EchoExtractor {
    pub calls: AtomicUsize,
    pub last_detail: std::sync::Mutex<Option<DetailLevel>>,
}

impl EchoExtractor {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagExtractor for EchoExtractor {
    async fn extract(
        &self,
        image: &ImageItem,
        _instruction: &str,
        detail: DetailLevel,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_detail.lock().unwrap() = Some(detail);
        if image.bytes == b"FAIL" {
            return Err(ExtractionError::Network("connection refused".to_string()));
        }
        Ok(String::from_utf8_lossy(&image.bytes).into_owned())
    }
}

pub fn test_config() -> TagscanConfig {
    let mut config = TagscanConfig::default();
    config.auth.jwt_secret = Some(SECRET.to_string());
    config.vision.timeout_secs = 5;
    config
}

/// App state over an in-memory database and the echo extractor
pub async fn test_app_state(extractor: Arc<EchoExtractor>) -> AppState {
    test_app_state_with(test_config(), extractor).await
}

pub async fn test_app_state_with(config: TagscanConfig, extractor: Arc<EchoExtractor>) -> AppState {
    let pool = tagscan_server::db::init_in_memory_pool().await.unwrap();
    let store = Arc::new(SqliteTagStore::new(pool.clone()));
    AppState::new(&config, pool, extractor, store)
}

/// One multipart part
pub enum Part<'a> {
    File { name: &'a str, filename: &'a str, mime: &'a str, bytes: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

/// Encode a multipart/form-data body with [`BOUNDARY`]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File { name, filename, mime, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, mime
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read SSE frames until one complete `data:` event arrives; heartbeat
/// comments are skipped
pub async fn next_sse_json(body: &mut Body) -> Value {
    let mut buffer = String::new();
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let block: String = buffer.drain(..end + 2).collect();
            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if !data.is_empty() {
                return serde_json::from_str(&data.join("\n")).unwrap();
            }
            continue;
        }

        let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
            .await
            .expect("timed out waiting for SSE event")
            .expect("stream ended")
            .expect("body error");
        if let Ok(data) = frame.into_data() {
            buffer.push_str(std::str::from_utf8(&data).unwrap());
        }
    }
}

/// Assert no SSE data event arrives within `wait`
pub async fn assert_no_sse_event(body: &mut Body, wait: Duration) {
    let result = tokio::time::timeout(wait, next_sse_json(body)).await;
    assert!(result.is_err(), "unexpected SSE event: {:?}", result);
}
