//! One request/response cycle against `/api/generate/copy`.
//!
//! The cycle is split in two halves so callers can release their lock while
//! the request is in flight: [`GenerationClient::begin`] validates and issues
//! a token, [`GenerationClient::complete`] applies the outcome only if the
//! token is still the latest one.

use thiserror::Error;
use tracing::{info, warn};

use crate::backend::CopyBackend;
use crate::error::ClientError;
use crate::models::{CopyResponse, GenerationRequest, GenerationResult};
use crate::store::ConfigStore;

pub const GENERIC_GENERATION_ERROR: &str = "Error generando copy";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")] Validation(String),
    #[error("a generation is already in progress")] InFlight,
    #[error(transparent)] Backend(#[from] ClientError),
}

/// Issued by `begin`; must be handed back to `complete`.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub token: u64,
    pub request: GenerationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied(GenerationResult),
    Failed(String),
    /// A newer request was issued or the cycle was abandoned.
    Stale,
}

#[derive(Debug, Default)]
pub struct GenerationClient {
    seq: u64,
    in_flight: Option<u64>,
    error: Option<String>,
}

impl GenerationClient {
    pub fn new() -> Self { Self::default() }

    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn in_flight(&self) -> bool { self.in_flight.is_some() }
    pub fn dismiss_error(&mut self) { self.error = None; }

    pub fn begin(&mut self, store: &mut ConfigStore, llm_provider: &str, llm_model: &str) -> Result<Ticket, GenerationError> {
        if self.in_flight.is_some() {
            return Err(GenerationError::InFlight);
        }
        if let Some(msg) = store.validation_error() {
            self.error = Some(msg.to_string());
            return Err(GenerationError::Validation(msg.to_string()));
        }
        self.seq += 1;
        self.in_flight = Some(self.seq);
        self.error = None;
        store.set_is_generating(true);
        Ok(Ticket { token: self.seq, request: store.to_request(llm_provider, llm_model) })
    }

    pub fn complete(&mut self, store: &mut ConfigStore, token: u64, outcome: Result<CopyResponse, ClientError>) -> Completion {
        if self.in_flight != Some(token) {
            warn!("⏭️ Discarding stale generation response (token {}, latest {})", token, self.seq);
            return Completion::Stale;
        }
        self.in_flight = None;
        store.set_is_generating(false);
        match outcome {
            Ok(response) => {
                let result = GenerationResult::from(response);
                info!("✅ Generation {} applied ({} chars)", token, result.copy_text.chars().count());
                store.set_generated(Some(result.clone()));
                self.error = None;
                Completion::Applied(result)
            }
            Err(e) => {
                warn!("❌ Generation {} failed: {}", token, e);
                let msg = e.user_message(GENERIC_GENERATION_ERROR);
                self.error = Some(msg.clone());
                Completion::Failed(msg)
            }
        }
    }

    /// Drops the pending request; its response will be treated as stale.
    pub fn abandon(&mut self, store: &mut ConfigStore) {
        if let Some(token) = self.in_flight.take() {
            info!("🛑 Abandoning generation {}", token);
            store.set_is_generating(false);
        }
    }

    /// Full cycle for callers that own the store exclusively.
    pub async fn generate(
        &mut self,
        store: &mut ConfigStore,
        backend: &dyn CopyBackend,
        llm_provider: &str,
        llm_model: &str,
    ) -> Result<Completion, GenerationError> {
        let ticket = self.begin(store, llm_provider, llm_model)?;
        let outcome = backend.generate_copy(&ticket.request).await;
        Ok(self.complete(store, ticket.token, outcome))
    }
}
