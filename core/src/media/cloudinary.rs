use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::config::CloudinaryCredentials;

use super::{
    ListFilter, MediaError, MediaStoreProvider, ObjectMetadata, RemoteOutcome, StoredObject,
    UploadRequest,
};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const LIST_PAGE_SIZE: u32 = 500;

/// Cloudinary image storage through its upload and admin REST APIs.
pub struct CloudinaryStore {
    credentials: CloudinaryCredentials,
    http: reqwest::Client,
    api_base: String,
}

impl std::fmt::Debug for CloudinaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryStore")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ResourceResponse {
    public_id: String,
    url: Option<String>,
    secure_url: String,
    format: Option<String>,
    bytes: Option<i64>,
    width: Option<i32>,
    height: Option<i32>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    context: Option<ContextResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ContextResponse {
    #[serde(default)]
    custom: ObjectMetadata,
}

#[derive(Debug, Clone, Deserialize)]
struct ListResponse {
    resources: Vec<ResourceResponse>,
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl From<ResourceResponse> for StoredObject {
    fn from(resource: ResourceResponse) -> Self {
        StoredObject {
            url: resource.url.unwrap_or_else(|| resource.secure_url.clone()),
            public_id: resource.public_id,
            secure_url: resource.secure_url,
            format: resource.format,
            bytes: resource.bytes,
            width: resource.width,
            height: resource.height,
            created_at: resource.created_at,
            metadata: resource.context.unwrap_or_default().custom,
        }
    }
}

impl CloudinaryStore {
    pub fn new(credentials: CloudinaryCredentials, timeout: Duration) -> eyre::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(CloudinaryStore {
            api_base: format!("{}/{}", API_BASE, credentials.cloud_name),
            credentials,
            http,
        })
    }

    fn signed_form(&self, params: BTreeMap<&'static str, String>) -> Form {
        let timestamp = Utc::now().timestamp().to_string();
        let mut params = params;
        params.insert("timestamp", timestamp);
        let signature = sign_params(&params, &self.credentials.api_secret);
        let mut form = Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        form.text("api_key", self.credentials.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, MediaError> {
        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(classify_reqwest_error)?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status, &body))
        }
    }
}

/// Cloudinary request signature: the parameters sorted by name, joined as
/// `k1=v1&k2=v2`, the api secret appended, hashed with SHA-256.
/// Empty values are not signed.
fn sign_params(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encodes metadata as a Cloudinary context string `k1=v1|k2=v2`.
fn encode_context(metadata: &ObjectMetadata) -> String {
    fn escape(s: &str) -> String {
        s.replace('|', "\\|").replace('=', "\\=")
    }
    metadata
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("|")
}

fn classify_status(status: StatusCode, body: &str) -> MediaError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|err| err.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    let message = format!("HTTP {}: {}", status.as_u16(), message);
    match status.as_u16() {
        408 | 420 | 429 => MediaError::Transient(message),
        s if s >= 500 => MediaError::Transient(message),
        _ => MediaError::Rejected(message),
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> MediaError {
    if err.is_builder() || err.is_decode() {
        MediaError::Rejected(err.to_string())
    } else {
        MediaError::Transient(err.to_string())
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, MediaError> {
    serde_json::from_str(body)
        .map_err(|err| MediaError::Rejected(format!("unexpected response from Cloudinary: {}", err)))
}

fn destroy_outcome(body: &str) -> Result<RemoteOutcome, MediaError> {
    let response: DestroyResponse = parse_json(body)?;
    match response.result.as_str() {
        "ok" => Ok(RemoteOutcome::Done),
        "not found" => Ok(RemoteOutcome::NotFound),
        other => Err(MediaError::Rejected(format!("destroy returned {}", other))),
    }
}

#[async_trait]
impl MediaStoreProvider for CloudinaryStore {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    #[instrument(skip(self, request), fields(filename = %request.filename))]
    async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, MediaError> {
        let mut params = BTreeMap::new();
        params.insert("folder", request.folder.clone());
        if !request.metadata.is_empty() {
            params.insert("context", encode_context(&request.metadata));
        }
        let file = Part::bytes(request.data.to_vec()).file_name(request.filename.clone());
        let form = self.signed_form(params).part("file", file);
        let url = format!("{}/image/upload", self.api_base);
        let body = self.send(self.http.post(url).multipart(form)).await?;
        let resource: ResourceResponse = parse_json(&body)?;
        debug!(public_id = %resource.public_id, "uploaded to Cloudinary");
        Ok(resource.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> Result<RemoteOutcome, MediaError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_owned());
        let form = self.signed_form(params);
        let url = format!("{}/image/destroy", self.api_base);
        let body = self.send(self.http.post(url).multipart(form)).await?;
        destroy_outcome(&body)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &ListFilter) -> Result<Vec<StoredObject>, MediaError> {
        let url = format!("{}/resources/image/upload", self.api_base);
        let prefix = format!("{}/", filter.folder);
        let mut objects = Vec::new();
        let mut next_cursor: Option<String> = None;
        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("prefix", prefix.clone()),
                ("max_results", LIST_PAGE_SIZE.to_string()),
                ("context", "true".to_owned()),
            ];
            if let Some(cursor) = next_cursor.take() {
                query.push(("next_cursor", cursor));
            }
            let request = self
                .http
                .get(&url)
                .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
                .query(&query);
            let page: ListResponse = parse_json(&self.send(request).await?)?;
            objects.extend(page.resources.into_iter().map(StoredObject::from));
            match page.next_cursor {
                Some(cursor) if !cursor.is_empty() => next_cursor = Some(cursor),
                _ => break,
            }
        }
        Ok(objects)
    }

    #[instrument(skip(self, metadata))]
    async fn update_metadata(
        &self,
        public_id: &str,
        metadata: &ObjectMetadata,
    ) -> Result<RemoteOutcome, MediaError> {
        let url = format!("{}/resources/image/upload/{}", self.api_base, public_id);
        let form = Form::new().text("context", encode_context(metadata));
        let request = self
            .http
            .post(url)
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .multipart(form);
        match self.send(request).await {
            Ok(_) => Ok(RemoteOutcome::Done),
            Err(MediaError::Rejected(message)) if message.starts_with("HTTP 404") => {
                Ok(RemoteOutcome::NotFound)
            }
            Err(err) => Err(err),
        }
    }
}
