//! Bulk packaging and clipboard export of the per-platform copy.

use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, error};

use crate::backend::CopyBackend;
use crate::capabilities::Clipboard;
use crate::error::ClientError;
use crate::models::{CopyData, ExportRequest, Platform};
use crate::renderer::{copy_text, CopyOutcome};

pub const EXPORT_SUFFIX: &str = "_mango_export.zip";
pub const STATUS_DISPLAY: Duration = Duration::from_secs(3);
pub const SINGLE_COPY_DISPLAY: Duration = Duration::from_secs(2);

const BLOCK_SEPARATOR: &str = "\n---\n\n";

/// File name offered for the bundle: whitespace runs become `_`.
pub fn bundle_filename(product_name: &str) -> String {
    let mut out = String::with_capacity(product_name.len() + EXPORT_SUFFIX.len());
    let mut in_run = false;
    for c in product_name.chars() {
        if c.is_whitespace() {
            if !in_run { out.push('_'); }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.push_str(EXPORT_SUFFIX);
    out
}

/// All platform texts as one clipboard payload, one labeled block per platform.
pub fn aggregate_for_clipboard(copy_data: &CopyData) -> String {
    copy_data
        .iter()
        .map(|(platform, copy)| format!("=== {} ===\n\n{}\n", platform.as_str().to_uppercase(), copy))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Why a bundle download did not happen. Each variant carries the text shown to the user.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExportError {
    #[error("Exportación en progreso")] Busy,
    #[error("{0}")] Invalid(String),
    #[error("{0}")] Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

pub async fn export_bundle(
    backend: &dyn CopyBackend,
    copy_data: CopyData,
    product_name: &str,
    hashtags: Vec<String>,
) -> Result<Download, ClientError> {
    if copy_data.is_empty() {
        return Err(ClientError::Validation("Genera contenido primero para exportar".into()));
    }
    let request = ExportRequest {
        platforms: copy_data.keys().copied().collect(),
        copy_data,
        product_name: product_name.to_string(),
        include_hashtags: true,
        hashtags,
    };
    match backend.export_zip(&request).await {
        Ok(bytes) => {
            let file_name = bundle_filename(product_name);
            info!("📥 Bundle ready: {} ({} bytes)", file_name, bytes.len());
            Ok(Download { file_name, content_type: "application/zip", bytes })
        }
        Err(e) => {
            error!("❌ Error downloading bundle: {}", e);
            Err(e)
        }
    }
}

pub async fn copy_all(clipboard: &dyn Clipboard, copy_data: &CopyData) -> CopyOutcome {
    if copy_data.is_empty() {
        return CopyOutcome::NothingToCopy;
    }
    copy_text(clipboard, Some(&aggregate_for_clipboard(copy_data))).await
}

pub async fn copy_single(clipboard: &dyn Clipboard, copy_data: &CopyData, platform: Platform) -> CopyOutcome {
    copy_text(clipboard, copy_data.get(&platform).map(String::as_str)).await
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ExportPhase {
    Idle,
    Exporting,
    Success { message: String },
    Failed { message: String },
}

/// Idle → Exporting → Success | Failed, with the terminal states fading back
/// to Idle once their display interval has elapsed.
#[derive(Debug, Clone)]
pub struct ExportTracker {
    phase: ExportPhase,
    since: Instant,
    display: Duration,
}

impl ExportTracker {
    pub fn new(display: Duration) -> Self {
        Self { phase: ExportPhase::Idle, since: Instant::now(), display }
    }

    pub fn phase_at(&self, now: Instant) -> ExportPhase {
        match &self.phase {
            ExportPhase::Success { .. } | ExportPhase::Failed { .. }
                if now.saturating_duration_since(self.since) >= self.display => ExportPhase::Idle,
            other => other.clone(),
        }
    }

    pub fn phase(&self) -> ExportPhase { self.phase_at(Instant::now()) }

    pub fn is_busy(&self) -> bool { self.phase == ExportPhase::Exporting }

    /// Returns false if an export is already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_busy() {
            return false;
        }
        self.phase = ExportPhase::Exporting;
        self.since = now;
        true
    }

    pub fn succeed(&mut self, message: impl Into<String>, now: Instant) {
        self.phase = ExportPhase::Success { message: message.into() };
        self.since = now;
    }

    pub fn fail(&mut self, message: impl Into<String>, now: Instant) {
        self.phase = ExportPhase::Failed { message: message.into() };
        self.since = now;
    }

    /// Records a clipboard outcome as a terminal phase.
    pub fn record_copy(&mut self, outcome: &CopyOutcome, success_message: impl Into<String>, now: Instant) {
        match outcome {
            CopyOutcome::Copied => self.succeed(success_message, now),
            CopyOutcome::Failed { instruction } => self.fail(instruction.clone(), now),
            CopyOutcome::NothingToCopy => {}
        }
    }
}

/// Store links for installing each platform's app.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct AppDownloadUrls {
    pub ios: &'static str,
    pub android: &'static str,
}

pub fn app_download_urls(platform: Platform) -> AppDownloadUrls {
    let (ios, android) = match platform {
        Platform::Facebook => ("https://apps.apple.com/app/facebook/id284882215", "https://play.google.com/store/apps/details?id=com.facebook.katana"),
        Platform::Instagram => ("https://apps.apple.com/app/instagram/id389801252", "https://play.google.com/store/apps/details?id=com.instagram.android"),
        Platform::Tiktok => ("https://apps.apple.com/app/tiktok/id835599320", "https://play.google.com/store/apps/details?id=com.zhiliaoapp.musically"),
        Platform::Whatsapp => ("https://apps.apple.com/app/whatsapp-messenger/id310633997", "https://play.google.com/store/apps/details?id=com.whatsapp"),
        Platform::Linkedin => ("https://apps.apple.com/app/linkedin/id288429040", "https://play.google.com/store/apps/details?id=com.linkedin.android"),
    };
    AppDownloadUrls { ios, android }
}
