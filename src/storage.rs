use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::StorageConfig;

/// Upper bound on entries returned by a single listing.
pub const LIST_LIMIT: usize = 100;

const RANDOM_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid object name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// One stored lecture document as the library sees it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LectureFile {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
struct ListedObject {
    name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<ObjectMetadata>,
}

#[derive(Deserialize, Debug, Default)]
struct ObjectMetadata {
    #[serde(default)]
    size: Option<u64>,
}

/// Client for the hosted object store's REST surface.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stores `data` under a freshly generated key in the subject's folder and
    /// returns that key.
    pub async fn upload(&self, subject: &str, file_name: &str, content_type: &str, data: Bytes) -> Result<String> {
        if subject.trim().is_empty() {
            return Err(StorageError::InvalidName("subject is empty".to_string()));
        }

        let key = object_key(subject, file_name, Utc::now().timestamp_millis());
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, encode_key(&key));

        info!("📤 Uploading {} ({} bytes) as {}", file_name, data.len(), key);

        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(transport_error("upload"))?;

        check_status(response, "upload").await?;
        Ok(key)
    }

    /// Newest-first listing of up to [`LIST_LIMIT`] files under the subject
    /// prefix, each with its public URL.
    pub async fn list(&self, subject: &str) -> Result<Vec<LectureFile>> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let body = json!({
            "prefix": subject,
            "limit": LIST_LIMIT,
            "offset": 0,
            "sortBy": { "column": "created_at", "order": "desc" },
        });

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error("list"))?;
        let response = check_status(response, "list").await?;
        let objects: Vec<ListedObject> = response.json().await.map_err(transport_error("list"))?;

        let files = objects
            .into_iter()
            .take(LIST_LIMIT)
            .map(|object| {
                let key = format!("{}/{}", subject, object.name);
                LectureFile {
                    url: self.public_url(&key),
                    size: object.metadata.and_then(|m| m.size).unwrap_or(0),
                    name: object.name,
                    created_at: object.created_at,
                }
            })
            .collect::<Vec<_>>();

        info!("📚 Listed {} files for subject '{}'", files.len(), subject);
        Ok(files)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, encode_key(key))
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.delete(&url))
            .json(&json!({ "prefixes": [key] }))
            .send()
            .await
            .map_err(transport_error("delete"))?;

        check_status(response, "delete").await?;
        info!("🗑️ Deleted {}", key);
        Ok(())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    error!("Storage {} failed with {}: {}", operation, status, message);
    Err(StorageError::Status {
        status: status.as_u16(),
        message,
    })
}

/// `{subject}/{millis}-{random}.{ext}`. The extension comes from the original
/// file name; names without one are stored as `pdf`.
fn transport_error(action: &'static str) -> impl FnOnce(reqwest::Error) -> StorageError {
    move |e| {
        error!("Storage {} request failed: {}", action, e);
        StorageError::Http(e)
    }
}

pub fn object_key(subject: &str, file_name: &str, millis: i64) -> String {
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => {
            warn!("File '{}' has no extension, storing as pdf", file_name);
            "pdf".to_string()
        }
    };
    format!("{}/{}-{}.{}", subject, millis, random_suffix(), extension)
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
