#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use mango_copy::backend::CopyBackend;
use mango_copy::error::ClientError;
use mango_copy::models::{
    CopyMetadata, CopyResponse, ExportRequest, GenerationRequest, HistoryEntry, Platform,
    SaveConfigRequest, ShareUrlsResponse,
};

/// Scripted backend that records every call it receives.
#[derive(Default)]
pub struct MockBackend {
    pub generate_calls: Mutex<Vec<GenerationRequest>>,
    pub generate_results: Mutex<VecDeque<Result<CopyResponse, ClientError>>>,
    pub history_calls: Mutex<Vec<usize>>,
    pub history_results: Mutex<VecDeque<Result<Vec<HistoryEntry>, ClientError>>>,
    pub export_calls: Mutex<Vec<ExportRequest>>,
    pub export_results: Mutex<VecDeque<Result<Bytes, ClientError>>>,
    pub share_calls: Mutex<Vec<(Platform, String)>>,
    pub config_calls: Mutex<Vec<SaveConfigRequest>>,
}

impl MockBackend {
    pub fn new() -> Self { Self::default() }

    pub fn push_copy(&self, result: Result<CopyResponse, ClientError>) {
        self.generate_results.lock().push_back(result);
    }

    pub fn push_history(&self, result: Result<Vec<HistoryEntry>, ClientError>) {
        self.history_results.lock().push_back(result);
    }

    pub fn push_export(&self, result: Result<Bytes, ClientError>) {
        self.export_results.lock().push_back(result);
    }

    pub fn generate_count(&self) -> usize { self.generate_calls.lock().len() }
}

#[async_trait]
impl CopyBackend for MockBackend {
    async fn save_config(&self, body: &SaveConfigRequest) -> Result<serde_json::Value, ClientError> {
        self.config_calls.lock().push(body.clone());
        Ok(serde_json::json!({ "status": "saved" }))
    }

    async fn generate_copy(&self, body: &GenerationRequest) -> Result<CopyResponse, ClientError> {
        self.generate_calls.lock().push(body.clone());
        self.generate_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("no scripted response".into())))
    }

    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError> {
        self.history_calls.lock().push(limit);
        self.history_results.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn export_zip(&self, body: &ExportRequest) -> Result<Bytes, ClientError> {
        self.export_calls.lock().push(body.clone());
        self.export_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Bytes::from_static(b"PK\x03\x04")))
    }

    async fn share_urls(&self, platform: Platform, copy_text: &str) -> Result<ShareUrlsResponse, ClientError> {
        self.share_calls.lock().push((platform, copy_text.to_string()));
        let mut urls = std::collections::BTreeMap::new();
        if matches!(platform, Platform::Facebook | Platform::Whatsapp | Platform::Linkedin) {
            urls.insert(platform.as_str().to_string(), format!("https://share.example/{}", platform));
        }
        Ok(ShareUrlsResponse { urls })
    }

    async fn health(&self) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::json!({ "status": "healthy" }))
    }
}

pub fn copy_response(text: &str, platform: &str) -> CopyResponse {
    CopyResponse {
        copy_text: text.to_string(),
        metadata: CopyMetadata {
            provider: "groq".into(),
            model: "llama-4-scout".into(),
            platform: platform.into(),
            language: "es-MX".into(),
        },
    }
}
