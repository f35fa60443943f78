//! Environment capabilities the export/share helpers depend on.
//!
//! The helpers only see these traits. The server wires an [`ActionRecorder`]
//! that turns each side effect into a [`ClientAction`] for the browser page to
//! perform; tests wire their own fakes.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};

use crate::error::{ClipboardError, ShareError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShareCapability {
    NativeShareAvailable,
    #[default]
    ClipboardOnly,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NativeShareOutcome {
    Shared,
    /// The user dismissed the share sheet. Not an error.
    Cancelled,
    Unavailable,
    Failed(String),
    /// Handed to the page; the result arrives in a later request.
    Delegated,
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[async_trait]
pub trait NativeShare: Send + Sync {
    async fn share(&self, payload: &SharePayload) -> NativeShareOutcome;
}

/// Opens a URL in a new browser context.
pub trait Launcher: Send + Sync {
    fn open(&self, url: &str, target: &str) -> Result<(), ShareError>;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    WriteClipboard { text: String },
    OpenUrl { url: String, target: String },
    NativeShare { title: String, text: String, url: Option<String> },
}

/// Records side effects instead of performing them.
#[derive(Debug)]
pub struct ActionRecorder {
    capability: ShareCapability,
    clipboard_available: bool,
    native_report: Option<NativeShareOutcome>,
    actions: Mutex<Vec<ClientAction>>,
}

impl ActionRecorder {
    pub fn new(capability: ShareCapability, clipboard_available: bool) -> Self {
        Self { capability, clipboard_available, native_report: None, actions: Mutex::new(Vec::new()) }
    }

    /// Outcome of a native share the page already attempted.
    pub fn with_native_report(mut self, report: Option<NativeShareOutcome>) -> Self {
        self.native_report = report;
        self
    }

    pub fn take_actions(&self) -> Vec<ClientAction> {
        std::mem::take(&mut *self.actions.lock())
    }
}

#[async_trait]
impl Clipboard for ActionRecorder {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if !self.clipboard_available {
            return Err(ClipboardError::Unsupported);
        }
        self.actions.lock().push(ClientAction::WriteClipboard { text: text.to_string() });
        Ok(())
    }
}

#[async_trait]
impl NativeShare for ActionRecorder {
    async fn share(&self, payload: &SharePayload) -> NativeShareOutcome {
        if self.capability == ShareCapability::ClipboardOnly {
            return NativeShareOutcome::Unavailable;
        }
        if let Some(report) = &self.native_report {
            return report.clone();
        }
        self.actions.lock().push(ClientAction::NativeShare {
            title: payload.title.clone(),
            text: payload.text.clone(),
            url: payload.url.clone(),
        });
        NativeShareOutcome::Delegated
    }
}

impl Launcher for ActionRecorder {
    fn open(&self, url: &str, target: &str) -> Result<(), ShareError> {
        self.actions.lock().push(ClientAction::OpenUrl { url: url.to_string(), target: target.to_string() });
        Ok(())
    }
}
