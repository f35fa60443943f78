use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{info, error};

use crate::config::Settings;
use crate::error::ClientError;
use crate::models::{
    CopyResponse, ErrorBody, ExportRequest, GenerationRequest, HistoryEntry, Platform,
    SaveConfigRequest, ShareUrlsResponse,
};

/// The external copy service. Every call is a single round trip.
#[async_trait]
pub trait CopyBackend: Send + Sync {
    async fn save_config(&self, body: &SaveConfigRequest) -> Result<serde_json::Value, ClientError>;
    async fn generate_copy(&self, body: &GenerationRequest) -> Result<CopyResponse, ClientError>;
    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError>;
    async fn export_zip(&self, body: &ExportRequest) -> Result<Bytes, ClientError>;
    async fn share_urls(&self, platform: Platform, copy_text: &str) -> Result<ShareUrlsResponse, ClientError>;
    async fn health(&self) -> Result<serde_json::Value, ClientError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { client, base_url: settings.api_url.clone() })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    /// Turns a non-2xx response into `ClientError::Server`, reading `detail` if any.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        info!("📥 Response status: {}", status);
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("❌ Backend error response: {}", preview(&body, 300));
        Err(ClientError::Server { status, detail: extract_detail(&body) })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let text = Self::check(response).await?.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(format!("{}: {}", e, preview(&text, 200))))
    }
}

#[async_trait]
impl CopyBackend for HttpBackend {
    async fn save_config(&self, body: &SaveConfigRequest) -> Result<serde_json::Value, ClientError> {
        info!("🔧 Saving configuration: {:?}", body);
        let response = self.client.post(self.url("/api/config")).json(body).send().await?;
        Self::json(response).await
    }

    async fn generate_copy(&self, body: &GenerationRequest) -> Result<CopyResponse, ClientError> {
        info!("🚀 Requesting copy for '{}' on {}", body.product_name, body.platform);
        let response = self.client.post(self.url("/api/generate/copy")).json(body).send().await?;
        let parsed: CopyResponse = Self::json(response).await?;
        info!("✅ Copy received ({} chars) from {}/{}", parsed.copy_text.chars().count(), parsed.metadata.provider, parsed.metadata.model);
        Ok(parsed)
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError> {
        let response = self.client
            .get(self.url("/api/history"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::json(response).await
    }

    async fn export_zip(&self, body: &ExportRequest) -> Result<Bytes, ClientError> {
        info!("📦 Requesting export bundle for '{}' ({} platforms)", body.product_name, body.copy_data.len());
        let response = self.client.post(self.url("/api/export/zip")).json(body).send().await?;
        let bytes = Self::check(response).await?.bytes().await?;
        info!("📦 Export bundle received: {} bytes", bytes.len());
        Ok(bytes)
    }

    async fn share_urls(&self, platform: Platform, copy_text: &str) -> Result<ShareUrlsResponse, ClientError> {
        let response = self.client
            .post(self.url("/api/export/share-urls"))
            .query(&[("platform", platform.as_str()), ("copy_text", copy_text)])
            .send()
            .await?;
        Self::json(response).await
    }

    async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::json(response).await
    }
}

/// Reads a FastAPI-style `{"detail": ...}` body. Validation errors arrive as a list of `{msg}`.
pub fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        serde_json::Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|i| i.get("msg").and_then(|m| m.as_str()).map(str::to_string))
                .collect();
            if msgs.is_empty() { None } else { Some(msgs.join("; ")) }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...[{} chars]", cut, s.chars().count())
    }
}
