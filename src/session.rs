//! Browser sessions and the workflows that run against them.
//!
//! A session is the explicitly owned state of one page: its store,
//! generation client, history view, uploads and export trackers. Workflows
//! take the session lock only to read inputs and apply outcomes; it is never
//! held across a backend call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::backend::CopyBackend;
use crate::capabilities::{ActionRecorder, ClientAction, NativeShareOutcome, ShareCapability};
use crate::config::Settings;
use crate::error::ClientError;
use crate::export::{self, Download, ExportError, ExportPhase, ExportTracker, SINGLE_COPY_DISPLAY, STATUS_DISPLAY};
use crate::gallery::{ImageGallery, ImageSummary};
use crate::generator::{Completion, GenerationClient, GenerationError};
use crate::history::{HistoryView, HistoryViewer};
use crate::models::{CopyData, Platform};
use crate::renderer::{self, CopyOutcome, RenderedResult};
use crate::share::{self, ShareContext, ShareOutcome, ShareTarget};
use crate::store::{ConfigStore, StoreSnapshot};

const GENERIC_EXPORT_ERROR: &str = "Error al descargar ZIP";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionOptions {
    #[serde(default)]
    pub share_capability: ShareCapability,
    #[serde(default = "default_true")]
    pub clipboard: bool,
    /// Page URL attached to share intents.
    #[serde(default)]
    pub page_url: Option<String>,
}

fn default_true() -> bool { true }

impl Default for SessionOptions {
    fn default() -> Self {
        Self { share_capability: ShareCapability::default(), clipboard: true, page_url: None }
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub options: SessionOptions,
    pub store: ConfigStore,
    pub generator: GenerationClient,
    pub history: HistoryViewer,
    pub gallery: ImageGallery,
    pub copy_data: CopyData,
    pub hashtags: Vec<String>,
    pub zip_export: ExportTracker,
    pub clipboard_export: ExportTracker,
    pub single_copy: ExportTracker,
    /// Last time a request resolved this session.
    pub last_seen: Instant,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
            store: ConfigStore::new(),
            generator: GenerationClient::new(),
            history: HistoryViewer::new(),
            gallery: ImageGallery::new(),
            copy_data: CopyData::new(),
            hashtags: Vec::new(),
            zip_export: ExportTracker::new(STATUS_DISPLAY),
            clipboard_export: ExportTracker::new(STATUS_DISPLAY),
            single_copy: ExportTracker::new(SINGLE_COPY_DISPLAY),
            last_seen: Instant::now(),
        }
    }

    fn recorder(&self) -> ActionRecorder {
        ActionRecorder::new(self.options.share_capability, self.options.clipboard)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            store: self.store.snapshot(),
            error: self.generator.error().map(str::to_string),
            copy_data: self.copy_data.clone(),
            hashtags: self.hashtags.clone(),
            images: self.gallery.summaries(),
            classified_images: self.gallery.classified_count(),
            share_capability: self.options.share_capability,
        }
    }

    pub fn export_status(&self) -> ExportStatus {
        let now = Instant::now();
        ExportStatus {
            zip: self.zip_export.phase_at(now),
            clipboard: self.clipboard_export.phase_at(now),
            single: self.single_copy.phase_at(now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub store: StoreSnapshot,
    pub error: Option<String>,
    pub copy_data: CopyData,
    pub hashtags: Vec<String>,
    pub images: Vec<ImageSummary>,
    pub classified_images: usize,
    pub share_capability: ShareCapability,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportStatus {
    pub zip: ExportPhase,
    pub clipboard: ExportPhase,
    pub single: ExportPhase,
}

/// Result of a workflow plus the browser side effects it produced.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WithActions<T> {
    pub outcome: T,
    pub actions: Vec<ClientAction>,
}

pub type SharedSession = Arc<RwLock<Session>>;

/// Everything the HTTP handlers need: sessions, the backend and settings.
#[derive(Clone)]
pub struct Workbench {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
    pub backend: Arc<dyn CopyBackend>,
    pub settings: Arc<Settings>,
}

impl Workbench {
    pub fn new(backend: Arc<dyn CopyBackend>, settings: Settings) -> Self {
        Self { sessions: Arc::default(), backend, settings: Arc::new(settings) }
    }

    pub fn create_session(&self, options: SessionOptions) -> SharedSession {
        self.evict_idle(Instant::now());
        let session = Session::new(options);
        let id = session.id;
        let shared = Arc::new(RwLock::new(session));
        self.sessions.write().insert(id, shared.clone());
        info!("🆕 Session {} created", id);
        shared
    }

    /// Looks a session up and marks it as seen.
    pub fn session(&self, id: Uuid) -> Option<SharedSession> {
        let shared = self.sessions.read().get(&id).cloned()?;
        shared.write().last_seen = Instant::now();
        Some(shared)
    }

    /// Ends a session; anything still in flight is abandoned.
    pub fn end_session(&self, id: Uuid) -> bool {
        let Some(shared) = self.sessions.write().remove(&id) else {
            return false;
        };
        close(&shared);
        info!("👋 Session {} ended", id);
        true
    }

    /// Drops sessions idle for longer than the configured TTL as of `now`.
    /// Pages that close without ending their session are reclaimed here.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let ttl = self.settings.session_ttl;
        let expired: Vec<SharedSession> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, s)| now.saturating_duration_since(s.read().last_seen) >= ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for shared in &expired {
            close(shared);
            info!("⌛ Session {} evicted after {:?} idle", shared.read().id, ttl);
        }
        expired.len()
    }

    /// Sweeps idle sessions every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let workbench = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                workbench.evict_idle(Instant::now());
            }
        })
    }

    pub fn session_count(&self) -> usize { self.sessions.read().len() }

    pub async fn generate(&self, session: &SharedSession) -> Result<Completion, GenerationError> {
        let ticket = {
            let mut guard = session.write();
            let s = &mut *guard;
            s.generator.begin(&mut s.store, &self.settings.llm_provider, &self.settings.llm_model)?
        };
        let platform = ticket.request.platform;
        let outcome = self.backend.generate_copy(&ticket.request).await;

        let mut guard = session.write();
        let s = &mut *guard;
        let completion = s.generator.complete(&mut s.store, ticket.token, outcome);
        if let Completion::Applied(result) = &completion {
            s.copy_data.insert(platform, result.copy_text.clone());
        }
        Ok(completion)
    }

    /// The page navigated away mid-generation; a late response will be ignored.
    pub fn abandon_generation(&self, session: &SharedSession) {
        let mut guard = session.write();
        let s = &mut *guard;
        s.generator.abandon(&mut s.store);
    }

    pub async fn save_config(&self, session: &SharedSession) -> Result<serde_json::Value, ClientError> {
        let body = session.read().store.to_save_config(&self.settings.llm_provider, &self.settings.llm_model);
        self.backend.save_config(&body).await
    }

    pub async fn refresh_history(&self, session: &SharedSession) -> HistoryView {
        let ticket = session.write().history.begin_refresh();
        let outcome = self.backend.history(ticket.limit).await;
        let mut guard = session.write();
        guard.history.complete_refresh(ticket.token, outcome);
        guard.history.view()
    }

    /// First activation fetches; later views reuse what is loaded.
    pub async fn history_view(&self, session: &SharedSession) -> HistoryView {
        let needs_fetch = session.read().history.needs_activation();
        if needs_fetch {
            return self.refresh_history(session).await;
        }
        session.read().history.view()
    }

    pub fn rendered_result(&self, session: &SharedSession) -> Option<RenderedResult> {
        session.read().store.generated().map(renderer::render)
    }

    pub async fn copy_result(&self, session: &SharedSession) -> WithActions<CopyOutcome> {
        let (recorder, result) = {
            let s = session.read();
            (s.recorder(), s.store.generated().cloned())
        };
        let outcome = renderer::copy_to_clipboard(&recorder, result.as_ref()).await;
        WithActions { outcome, actions: recorder.take_actions() }
    }

    pub async fn export_zip(&self, session: &SharedSession) -> Result<Download, ExportError> {
        let (copy_data, product_name, hashtags) = {
            let mut s = session.write();
            if !s.zip_export.start(Instant::now()) {
                return Err(ExportError::Busy);
            }
            (s.copy_data.clone(), s.store.product_name().to_string(), s.hashtags.clone())
        };
        let outcome = export::export_bundle(self.backend.as_ref(), copy_data, &product_name, hashtags).await;

        let mut s = session.write();
        match outcome {
            Ok(download) => {
                s.zip_export.succeed("¡ZIP descargado exitosamente!", Instant::now());
                Ok(download)
            }
            Err(e) => {
                let err = match e {
                    ClientError::Validation(msg) => ExportError::Invalid(msg),
                    other => ExportError::Backend(other.user_message(GENERIC_EXPORT_ERROR)),
                };
                s.zip_export.fail(err.to_string(), Instant::now());
                Err(err)
            }
        }
    }

    pub async fn copy_all(&self, session: &SharedSession) -> WithActions<CopyOutcome> {
        let (recorder, copy_data) = {
            let s = session.read();
            (s.recorder(), s.copy_data.clone())
        };
        let outcome = export::copy_all(&recorder, &copy_data).await;
        session.write().clipboard_export.record_copy(&outcome, "¡Todo copiado al portapapeles!", Instant::now());
        WithActions { outcome, actions: recorder.take_actions() }
    }

    pub async fn copy_platform(&self, session: &SharedSession, platform: Platform) -> WithActions<CopyOutcome> {
        let (recorder, copy_data) = {
            let s = session.read();
            (s.recorder(), s.copy_data.clone())
        };
        let outcome = export::copy_single(&recorder, &copy_data, platform).await;
        session.write().single_copy.record_copy(&outcome, format!("¡{} copiado!", platform), Instant::now());
        WithActions { outcome, actions: recorder.take_actions() }
    }

    pub async fn share(
        &self,
        session: &SharedSession,
        platform: Platform,
        native_report: Option<NativeShareOutcome>,
    ) -> WithActions<ShareOutcome> {
        let (recorder, copy_data, product_name, page_url) = {
            let s = session.read();
            (
                s.recorder().with_native_report(native_report),
                s.copy_data.clone(),
                s.store.product_name().to_string(),
                s.options.page_url.clone().unwrap_or_else(|| self.settings.public_url.clone()),
            )
        };
        let ctx = ShareContext { native: &recorder, launcher: &recorder, clipboard: &recorder };
        let outcome = share::share_platform(&ctx, &copy_data, platform, &product_name, &page_url).await;
        WithActions { outcome, actions: recorder.take_actions() }
    }

    pub fn share_intent(
        &self,
        session: &SharedSession,
        platform: Platform,
        target: ShareTarget,
        image_url: Option<&str>,
    ) -> WithActions<ShareOutcome> {
        let s = session.read();
        let recorder = s.recorder();
        let page_url = s.options.page_url.as_deref().unwrap_or(&self.settings.public_url);
        let outcome = share::open_intent(&recorder, &s.copy_data, platform, target, s.store.product_name(), page_url, image_url);
        WithActions { outcome, actions: recorder.take_actions() }
    }

    pub async fn share_via_backend(&self, session: &SharedSession, platform: Platform) -> Result<WithActions<ShareOutcome>, ClientError> {
        let (recorder, copy_data) = {
            let s = session.read();
            (s.recorder(), s.copy_data.clone())
        };
        let outcome = share::share_via_backend(self.backend.as_ref(), &recorder, &copy_data, platform).await?;
        Ok(WithActions { outcome, actions: recorder.take_actions() })
    }
}

fn close(shared: &SharedSession) {
    let mut guard = shared.write();
    let s = &mut *guard;
    s.generator.abandon(&mut s.store);
}
