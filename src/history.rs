//! Recent generations as reported by the backend.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::backend::CopyBackend;
use crate::error::ClientError;
use crate::models::{HistoryEntry, Platform};

pub const HISTORY_LIMIT: usize = 10;
const GENERIC_HISTORY_ERROR: &str = "Error cargando historial";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Loading,
    Empty,
    Populated,
}

#[derive(Debug, Default)]
pub struct HistoryViewer {
    entries: Vec<HistoryEntry>,
    loaded: bool,
    seq: u64,
    pending: Option<u64>,
    error: Option<String>,
}

/// Issued by `begin_refresh`; only the latest ticket's outcome is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTicket {
    pub token: u64,
    pub limit: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryRow {
    pub id: String,
    pub icons: Vec<String>,
    pub quality_level: Option<String>,
    pub date_label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryView {
    pub status: HistoryStatus,
    pub loading: bool,
    pub error: Option<String>,
    pub rows: Vec<HistoryRow>,
}

impl HistoryViewer {
    pub fn new() -> Self { Self::default() }

    pub fn entries(&self) -> &[HistoryEntry] { &self.entries }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn is_loading(&self) -> bool { self.pending.is_some() }
    /// True until a fetch has succeeded, unless one is already pending.
    pub fn needs_activation(&self) -> bool { !self.loaded && self.pending.is_none() }

    pub fn status(&self) -> HistoryStatus {
        if self.entries.is_empty() && (self.is_loading() || (!self.loaded && self.error.is_none())) {
            HistoryStatus::Loading
        } else if self.entries.is_empty() {
            HistoryStatus::Empty
        } else {
            HistoryStatus::Populated
        }
    }

    pub fn begin_refresh(&mut self) -> HistoryTicket {
        self.seq += 1;
        self.pending = Some(self.seq);
        self.error = None;
        HistoryTicket { token: self.seq, limit: HISTORY_LIMIT }
    }

    /// Applies a fetch outcome if `token` is the latest one issued. A failure
    /// keeps whatever was already shown. Returns whether the outcome was applied.
    pub fn complete_refresh(&mut self, token: u64, outcome: Result<Vec<HistoryEntry>, ClientError>) -> bool {
        if self.pending != Some(token) {
            warn!("⏭️ Discarding stale history response (token {}, latest {})", token, self.seq);
            return false;
        }
        self.pending = None;
        match outcome {
            Ok(entries) => {
                info!("📜 History loaded: {} entries", entries.len());
                self.entries = entries;
                self.loaded = true;
            }
            Err(e) => {
                warn!("❌ History refresh failed: {}", e);
                self.error = Some(e.user_message(GENERIC_HISTORY_ERROR));
            }
        }
        true
    }

    pub async fn refresh(&mut self, backend: &dyn CopyBackend) {
        let ticket = self.begin_refresh();
        let outcome = backend.history(ticket.limit).await;
        self.complete_refresh(ticket.token, outcome);
    }

    pub fn view(&self) -> HistoryView {
        HistoryView {
            status: self.status(),
            loading: self.is_loading(),
            error: self.error.clone(),
            rows: self.entries.iter().map(row).collect(),
        }
    }
}

fn row(entry: &HistoryEntry) -> HistoryRow {
    HistoryRow {
        id: entry.id.clone(),
        icons: entry
            .platforms
            .iter()
            .flatten()
            .map(|name| Platform::icon_for(name).to_string())
            .collect(),
        quality_level: entry.quality_level.clone(),
        date_label: date_label(&entry.created_at),
    }
}

pub fn date_label(at: &DateTime<Utc>) -> String {
    at.format("%d %b %H:%M").to_string()
}
