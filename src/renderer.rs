use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::capabilities::Clipboard;
use crate::models::GenerationResult;

pub const CLIPBOARD_FALLBACK: &str = "No se pudo copiar automáticamente. Selecciona el texto y cópialo manualmente (Ctrl+C / Cmd+C).";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RenderedResult {
    pub text: String,
    pub footer: String,
    pub char_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CopyOutcome {
    Copied,
    Failed { instruction: String },
    NothingToCopy,
}

pub fn render(result: &GenerationResult) -> RenderedResult {
    RenderedResult {
        text: result.copy_text.clone(),
        footer: format!("Generado con {} ({}) • {} • {}", result.model, result.provider, result.language, result.platform),
        char_count: result.copy_text.chars().count(),
    }
}

/// Writes `text` to the clipboard, reporting failure distinctly from success.
pub async fn copy_text(clipboard: &dyn Clipboard, text: Option<&str>) -> CopyOutcome {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return CopyOutcome::NothingToCopy;
    };
    match clipboard.write_text(text).await {
        Ok(()) => CopyOutcome::Copied,
        Err(e) => {
            warn!("📋 Clipboard write failed: {}", e);
            CopyOutcome::Failed { instruction: CLIPBOARD_FALLBACK.to_string() }
        }
    }
}

pub async fn copy_to_clipboard(clipboard: &dyn Clipboard, result: Option<&GenerationResult>) -> CopyOutcome {
    copy_text(clipboard, result.map(|r| r.copy_text.as_str())).await
}
