//! Shared harness: the real router on an ephemeral port, backed by the
//! in-memory record store and a recording photo storage.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use umapic_api::{app_with_body_limit, AppState};
use umapic_core::defaults::MAX_BODY_BYTES;
use umapic_core::{CursorCodec, Error, PhotoStorage, PhotoUrls, Result};
use umapic_db::MemoryRecordRepository;

pub const BASE_URL: &str = "https://umapic-photos.s3.amazonaws.com/";

/// PhotoStorage fake that signs nothing and remembers deletions.
#[derive(Default)]
pub struct RecordingStorage {
    pub deleted: Mutex<Vec<String>>,
    pub fail_presign: bool,
    pub fail_delete: bool,
}

impl RecordingStorage {
    pub fn deleted_keys(&self) -> Vec<String> {
        let mut keys = self.deleted.lock().unwrap().clone();
        keys.sort();
        keys
    }
}

#[async_trait]
impl PhotoStorage for RecordingStorage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String> {
        if self.fail_presign {
            return Err(Error::Storage("signer unavailable: secret detail".to_string()));
        }
        Ok(format!(
            "https://signed.test/{key}?content-type={content_type}&X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.fail_delete {
            return Err(Error::Storage("bucket unavailable".to_string()));
        }
        Ok(())
    }
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub records: Arc<MemoryRecordRepository>,
    pub photos: Arc<RecordingStorage>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(RecordingStorage::default()).await
    }

    pub async fn start_with(photos: RecordingStorage) -> Self {
        Self::start_full(photos, MAX_BODY_BYTES).await
    }

    pub async fn start_with_body_limit(max_body_bytes: usize) -> Self {
        Self::start_full(RecordingStorage::default(), max_body_bytes).await
    }

    async fn start_full(photos: RecordingStorage, max_body_bytes: usize) -> Self {
        let records = Arc::new(MemoryRecordRepository::new());
        let photos = Arc::new(photos);
        let state = AppState {
            records: records.clone(),
            photos: photos.clone(),
            cursor: CursorCodec::new(b"test-cursor-secret".to_vec()),
            urls: PhotoUrls::new(BASE_URL),
            upload_url_expires: Duration::from_secs(3600),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app_with_body_limit(state, max_body_bytes))
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            records,
            photos,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, user: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).header("X-User-ID", user)
    }

    pub fn post(&self, path: &str, user: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).header("X-User-ID", user)
    }

    pub fn patch(&self, path: &str, user: &str) -> reqwest::RequestBuilder {
        self.client.patch(self.url(path)).header("X-User-ID", user)
    }

    pub fn put(&self, path: &str, user: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path)).header("X-User-ID", user)
    }

    pub fn delete(&self, path: &str, user: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).header("X-User-ID", user)
    }

    /// Create a record and return its id.
    pub async fn create(&self, user: &str, body: Value) -> String {
        let resp = self.post("/records", user).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 201, "create failed");
        let json: Value = resp.json().await.unwrap();
        json["data"]["recordId"].as_str().unwrap().to_string()
    }
}

/// Minimal valid create body.
pub fn record_body(store_name: &str, visit_date: &str) -> Value {
    serde_json::json!({
        "storeName": store_name,
        "latitude": 35.6812,
        "longitude": 139.7671,
        "visitDate": visit_date,
        "rating": 4.5,
    })
}

/// Assert an error envelope and return it.
pub async fn expect_error(resp: reqwest::Response, status: u16, code: &str) -> Value {
    assert_eq!(resp.status().as_u16(), status);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"]["code"], code, "unexpected envelope: {json}");
    assert!(json["error"]["message"].is_string());
    json
}
