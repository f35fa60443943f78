mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use tokio::sync::Notify;

use common::{copy_response, MockBackend};
use mango_copy::backend::CopyBackend;
use mango_copy::capabilities::{ClientAction, NativeShareOutcome, ShareCapability};
use mango_copy::config::Settings;
use mango_copy::error::ClientError;
use mango_copy::export::{ExportError, ExportPhase};
use mango_copy::generator::{Completion, GenerationError};
use mango_copy::history::HistoryStatus;
use mango_copy::models::{
    CopyResponse, ExportRequest, GenerationRequest, HistoryEntry, Platform, SaveConfigRequest,
    ShareUrlsResponse,
};
use mango_copy::renderer::CopyOutcome;
use mango_copy::session::{SessionOptions, SharedSession, Workbench};
use mango_copy::share::ShareOutcome;

fn workbench(mock: Arc<MockBackend>) -> Workbench {
    Workbench::new(mock, Settings::default())
}

fn fill(session: &SharedSession, api_key: &str) {
    let mut s = session.write();
    s.store.set_api_key(api_key);
    s.store.set_product_name("Café Artesanal");
    s.store.set_description("Café orgánico de Oaxaca");
    s.store.set_platform(Platform::Instagram);
}

fn entry(id: &str) -> HistoryEntry {
    HistoryEntry {
        id: id.into(),
        product_id: Some("p1".into()),
        platforms: Some(vec!["facebook".into()]),
        quality_level: Some("elite".into()),
        created_at: Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn cafe_scenario_sets_generated_copy() {
    let mock = Arc::new(MockBackend::new());
    mock.push_copy(Ok(copy_response("¡Prueba nuestro café!", "instagram")));
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());
    fill(&session, "gsk_test");

    let completion = wb.generate(&session).await.unwrap();
    assert!(matches!(completion, Completion::Applied(_)));

    let calls = mock.generate_calls.lock().clone();
    assert_eq!(calls.len(), 1);
    let body = serde_json::to_value(&calls[0]).unwrap();
    assert_eq!(body["product_name"], "Café Artesanal");
    assert_eq!(body["description"], "Café orgánico de Oaxaca");
    assert_eq!(body["platform"], "instagram");
    assert_eq!(body["api_key"], "gsk_test");
    assert_eq!(body["use_emojis"], false);

    let s = session.read();
    assert_eq!(s.store.generated_copy(), Some("¡Prueba nuestro café!"));
    assert_eq!(s.copy_data.get(&Platform::Instagram).map(String::as_str), Some("¡Prueba nuestro café!"));
    assert!(!s.store.is_generating());
}

#[tokio::test]
async fn missing_api_key_never_calls_backend() {
    let mock = Arc::new(MockBackend::new());
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());
    fill(&session, "");

    let err = wb.generate(&session).await.unwrap_err();
    assert!(matches!(err, GenerationError::Validation(_)));
    assert_eq!(mock.generate_count(), 0);
    let s = session.read();
    assert!(!s.store.is_generating());
    assert!(s.generator.error().is_some());
}

#[tokio::test]
async fn empty_product_fields_never_call_backend() {
    for (name, desc) in [("", "desc"), ("name", ""), ("", "")] {
        let mock = Arc::new(MockBackend::new());
        let wb = workbench(mock.clone());
        let session = wb.create_session(SessionOptions::default());
        {
            let mut s = session.write();
            s.store.set_api_key("gsk_test");
            s.store.set_product_name(name);
            s.store.set_description(desc);
        }
        assert!(matches!(wb.generate(&session).await, Err(GenerationError::Validation(_))));
        assert_eq!(mock.generate_count(), 0);
    }
}

#[tokio::test]
async fn server_error_keeps_previous_copy() {
    let mock = Arc::new(MockBackend::new());
    mock.push_copy(Ok(copy_response("primera versión", "instagram")));
    mock.push_copy(Err(ClientError::Server {
        status: StatusCode::BAD_REQUEST,
        detail: Some("Modelo no disponible".into()),
    }));
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());
    fill(&session, "gsk_test");

    wb.generate(&session).await.unwrap();
    let second = wb.generate(&session).await.unwrap();
    assert_eq!(second, Completion::Failed("Modelo no disponible".into()));
    let s = session.read();
    assert_eq!(s.store.generated_copy(), Some("primera versión"));
    assert_eq!(s.generator.error(), Some("Modelo no disponible"));
}

/// First call parks until released; later calls answer immediately.
struct GatedBackend {
    inner: MockBackend,
    started: Notify,
    release: Notify,
    calls: parking_lot::Mutex<usize>,
}

#[async_trait]
impl CopyBackend for GatedBackend {
    async fn save_config(&self, body: &SaveConfigRequest) -> Result<serde_json::Value, ClientError> { self.inner.save_config(body).await }
    async fn generate_copy(&self, _: &GenerationRequest) -> Result<CopyResponse, ClientError> {
        let n = {
            let mut c = self.calls.lock();
            *c += 1;
            *c
        };
        if n == 1 {
            self.started.notify_one();
            self.release.notified().await;
            return Ok(copy_response("viejo", "instagram"));
        }
        Ok(copy_response("nuevo", "instagram"))
    }
    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ClientError> { self.inner.history(limit).await }
    async fn export_zip(&self, body: &ExportRequest) -> Result<Bytes, ClientError> { self.inner.export_zip(body).await }
    async fn share_urls(&self, p: Platform, t: &str) -> Result<ShareUrlsResponse, ClientError> { self.inner.share_urls(p, t).await }
    async fn health(&self) -> Result<serde_json::Value, ClientError> { self.inner.health().await }
}

fn gated() -> Arc<GatedBackend> {
    Arc::new(GatedBackend {
        inner: MockBackend::new(),
        started: Notify::new(),
        release: Notify::new(),
        calls: parking_lot::Mutex::new(0),
    })
}

#[tokio::test]
async fn late_response_after_abandon_is_discarded() {
    let backend = gated();
    let wb = Workbench::new(backend.clone(), Settings::default());
    let session = wb.create_session(SessionOptions::default());
    fill(&session, "gsk_test");

    let slow = {
        let wb = wb.clone();
        let session = session.clone();
        tokio::spawn(async move { wb.generate(&session).await })
    };
    backend.started.notified().await;

    assert!(matches!(wb.generate(&session).await, Err(GenerationError::InFlight)));
    wb.abandon_generation(&session);
    assert_eq!(wb.generate(&session).await.unwrap(), Completion::Applied(copy_response("nuevo", "instagram").into()));

    backend.release.notify_one();
    assert_eq!(slow.await.unwrap().unwrap(), Completion::Stale);
    assert_eq!(session.read().store.generated_copy(), Some("nuevo"));
}

#[tokio::test]
async fn history_refresh_failure_keeps_entries() {
    let mock = Arc::new(MockBackend::new());
    mock.push_history(Ok(vec![entry("2"), entry("1")]));
    mock.push_history(Err(ClientError::Network("timeout".into())));
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());

    let first = wb.history_view(&session).await;
    assert_eq!(first.status, HistoryStatus::Populated);
    assert_eq!(first.rows.len(), 2);

    // A plain view does not refetch once loaded.
    wb.history_view(&session).await;
    assert_eq!(mock.history_calls.lock().as_slice(), &[10]);

    let after = wb.refresh_history(&session).await;
    assert_eq!(after.rows, first.rows);
    assert!(after.error.is_some());
    assert_eq!(mock.history_calls.lock().as_slice(), &[10, 10]);
}

#[tokio::test]
async fn empty_history() {
    let mock = Arc::new(MockBackend::new());
    mock.push_history(Ok(vec![]));
    let wb = workbench(mock);
    let session = wb.create_session(SessionOptions::default());
    assert_eq!(wb.history_view(&session).await.status, HistoryStatus::Empty);
}

#[tokio::test]
async fn bundle_export_names_file_from_product() {
    let mock = Arc::new(MockBackend::new());
    mock.push_export(Ok(Bytes::from_static(b"PK\x03\x04zip")));
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());
    {
        let mut s = session.write();
        s.store.set_product_name("Café Artesanal");
        s.copy_data.insert(Platform::Facebook, "A".into());
        s.copy_data.insert(Platform::Instagram, "B".into());
    }

    let download = wb.export_zip(&session).await.unwrap();
    assert_eq!(download.file_name, "Café_Artesanal_mango_export.zip");
    assert_eq!(download.bytes, Bytes::from_static(b"PK\x03\x04zip"));

    let sent = mock.export_calls.lock()[0].clone();
    assert_eq!(sent.platforms, vec![Platform::Facebook, Platform::Instagram]);
    assert!(sent.include_hashtags);
    assert!(matches!(session.read().export_status().zip, ExportPhase::Success { .. }));
}

#[tokio::test]
async fn bundle_export_failure_is_reported() {
    let mock = Arc::new(MockBackend::new());
    mock.push_export(Err(ClientError::Server { status: StatusCode::INTERNAL_SERVER_ERROR, detail: None }));
    let wb = workbench(mock);
    let session = wb.create_session(SessionOptions::default());
    session.write().copy_data.insert(Platform::Facebook, "A".into());

    assert_eq!(wb.export_zip(&session).await.unwrap_err(), ExportError::Backend("Error al descargar ZIP".into()));
    assert!(matches!(session.read().export_status().zip, ExportPhase::Failed { .. }));
}

#[tokio::test]
async fn bundle_export_rejects_empty_copy_and_concurrent_runs() {
    let mock = Arc::new(MockBackend::new());
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());

    assert_eq!(
        wb.export_zip(&session).await.unwrap_err(),
        ExportError::Invalid("Genera contenido primero para exportar".into())
    );
    assert!(mock.export_calls.lock().is_empty());

    session.write().copy_data.insert(Platform::Facebook, "A".into());
    assert!(session.write().zip_export.start(Instant::now()));
    assert_eq!(wb.export_zip(&session).await.unwrap_err(), ExportError::Busy);
    assert_eq!(session.read().export_status().zip, ExportPhase::Exporting);
    assert!(mock.export_calls.lock().is_empty());
}

#[tokio::test]
async fn copy_all_returns_aggregated_clipboard_action() {
    let wb = workbench(Arc::new(MockBackend::new()));
    let session = wb.create_session(SessionOptions::default());
    {
        let mut s = session.write();
        s.copy_data.insert(Platform::Instagram, "B".into());
        s.copy_data.insert(Platform::Facebook, "A".into());
    }
    let first = wb.copy_all(&session).await;
    let second = wb.copy_all(&session).await;
    assert_eq!(first, second);
    assert_eq!(first.outcome, CopyOutcome::Copied);
    assert_eq!(first.actions, vec![ClientAction::WriteClipboard {
        text: "=== FACEBOOK ===\n\nA\n\n---\n\n=== INSTAGRAM ===\n\nB\n".into(),
    }]);
}

#[tokio::test]
async fn clipboard_failure_is_distinct() {
    let wb = workbench(Arc::new(MockBackend::new()));
    let session = wb.create_session(SessionOptions { clipboard: false, ..Default::default() });
    session.write().copy_data.insert(Platform::Facebook, "A".into());
    let out = wb.copy_platform(&session, Platform::Facebook).await;
    assert!(matches!(out.outcome, CopyOutcome::Failed { .. }));
    assert!(out.actions.is_empty());
    assert!(matches!(session.read().export_status().single, ExportPhase::Failed { .. }));
}

#[tokio::test]
async fn native_share_is_delegated_and_cancel_falls_back() {
    let wb = workbench(Arc::new(MockBackend::new()));
    let session = wb.create_session(SessionOptions {
        share_capability: ShareCapability::NativeShareAvailable,
        page_url: Some("https://tienda.mx".into()),
        ..Default::default()
    });
    {
        let mut s = session.write();
        s.store.set_product_name("Café");
        s.copy_data.insert(Platform::Linkedin, "Hola".into());
    }

    let first = wb.share(&session, Platform::Linkedin, None).await;
    assert_eq!(first.outcome, ShareOutcome::Delegated);
    assert_eq!(first.actions, vec![ClientAction::NativeShare {
        title: "Café - linkedin".into(),
        text: "Hola".into(),
        url: Some("https://tienda.mx".into()),
    }]);

    let retry = wb.share(&session, Platform::Linkedin, Some(NativeShareOutcome::Cancelled)).await;
    let expected = "https://www.linkedin.com/sharing/share-offsite/?url=https%3A%2F%2Ftienda.mx".to_string();
    assert_eq!(retry.outcome, ShareOutcome::OpenedUrl { url: expected.clone() });
    assert_eq!(retry.actions, vec![ClientAction::OpenUrl { url: expected, target: "share-linkedin".into() }]);
}

#[tokio::test]
async fn backend_share_url_is_opened() {
    let mock = Arc::new(MockBackend::new());
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());
    session.write().copy_data.insert(Platform::Whatsapp, "Promo".into());

    let out = wb.share_via_backend(&session, Platform::Whatsapp).await.unwrap();
    assert_eq!(out.outcome, ShareOutcome::OpenedUrl { url: "https://share.example/whatsapp".into() });
    assert_eq!(mock.share_calls.lock().as_slice(), &[(Platform::Whatsapp, "Promo".to_string())]);
}

#[tokio::test]
async fn ended_session_abandons_generation_and_disappears() {
    let backend = gated();
    let wb = Workbench::new(backend.clone(), Settings::default());
    let session = wb.create_session(SessionOptions::default());
    fill(&session, "gsk_test");
    let id = session.read().id;

    let pending = {
        let wb = wb.clone();
        let session = session.clone();
        tokio::spawn(async move { wb.generate(&session).await })
    };
    backend.started.notified().await;
    assert!(session.read().generator.in_flight());

    assert!(wb.end_session(id));
    assert!(!session.read().generator.in_flight());
    assert!(!session.read().store.snapshot().is_generating);

    backend.release.notify_one();
    assert_eq!(pending.await.unwrap().unwrap(), Completion::Stale);
    assert_eq!(session.read().store.generated_copy(), None);
    assert!(wb.session(id).is_none());
    assert!(!wb.end_session(id));
}

#[tokio::test]
async fn idle_sessions_are_evicted_and_their_generation_abandoned() {
    let backend = gated();
    let settings = Settings { session_ttl: Duration::from_secs(60), ..Settings::default() };
    let wb = Workbench::new(backend.clone(), settings);
    let idle = wb.create_session(SessionOptions::default());
    fill(&idle, "gsk_test");
    let idle_id = idle.read().id;

    let pending = {
        let wb = wb.clone();
        let session = idle.clone();
        tokio::spawn(async move { wb.generate(&session).await })
    };
    backend.started.notified().await;

    let later = Instant::now() + Duration::from_secs(61);
    let active = wb.create_session(SessionOptions::default());
    let active_id = active.read().id;
    active.write().last_seen = later;

    assert_eq!(wb.evict_idle(later), 1);
    assert!(wb.session(idle_id).is_none());
    assert!(wb.session(active_id).is_some());
    assert_eq!(wb.session_count(), 1);

    backend.release.notify_one();
    assert_eq!(pending.await.unwrap().unwrap(), Completion::Stale);
    assert!(!idle.read().generator.in_flight());
}

#[tokio::test]
async fn looking_a_session_up_keeps_it_alive() {
    let wb = workbench(Arc::new(MockBackend::new()));
    let session = wb.create_session(SessionOptions::default());
    let id = session.read().id;
    let before = session.read().last_seen;
    assert!(wb.session(id).is_some());
    assert!(session.read().last_seen >= before);
    assert_eq!(wb.evict_idle(Instant::now()), 0);
    assert_eq!(wb.session_count(), 1);
}

#[tokio::test]
async fn save_config_forwards_store_settings() {
    let mock = Arc::new(MockBackend::new());
    let wb = workbench(mock.clone());
    let session = wb.create_session(SessionOptions::default());
    session.write().store.set_api_key("gsk_test");
    wb.save_config(&session).await.unwrap();
    let sent = mock.config_calls.lock()[0].clone();
    assert_eq!(sent.language.as_deref(), Some("es-MX"));
    assert_eq!(sent.quality_level.as_deref(), Some("rapido"));
    assert_eq!(sent.llm_api_key.as_deref(), Some("gsk_test"));
    assert_eq!(sent.image_api_key, None);
}
