use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    capabilities::NativeShareOutcome,
    error::ClientError,
    export::{app_download_urls, ExportError},
    gallery::{GalleryError, ImageKind},
    generator::{Completion, GenerationError},
    models::{CopyData, Platform},
    session::{SessionOptions, SharedSession, Workbench},
    share::ShareTarget,
    store::ConfigPatch,
};

/// Error body mirrors the backend: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl ApiError {
    fn not_found(what: &str) -> Self { ApiError(StatusCode::NOT_FOUND, format!("{} no encontrado", what)) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

impl From<GalleryError> for ApiError {
    fn from(e: GalleryError) -> Self {
        let status = match e {
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::Full => StatusCode::CONFLICT,
            GalleryError::UnsupportedType(_) | GalleryError::NotAnImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        };
        ApiError(status, e.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        let status = match &e {
            ClientError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, e.user_message("Error del servidor"))
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        let status = match e {
            ExportError::Busy => StatusCode::CONFLICT,
            ExportError::Invalid(_) => StatusCode::BAD_REQUEST,
            ExportError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, e.to_string())
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: Workbench) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/platforms/:platform/apps", get(app_links))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(end_session))
        .route("/api/sessions/:id/config", patch(update_config))
        .route("/api/sessions/:id/config/save", post(save_config))
        .route("/api/sessions/:id/benefits", post(add_benefit))
        .route("/api/sessions/:id/benefits/:index", delete(remove_benefit))
        .route("/api/sessions/:id/generate", post(generate).delete(abandon_generation))
        .route("/api/sessions/:id/error", delete(dismiss_error))
        .route("/api/sessions/:id/result", get(get_result))
        .route("/api/sessions/:id/result/copy", post(copy_result))
        .route("/api/sessions/:id/history", get(get_history).post(refresh_history))
        .route("/api/sessions/:id/images", post(upload_image))
        .route("/api/sessions/:id/images/:image_id", patch(classify_image).delete(remove_image))
        .route("/api/sessions/:id/copy-data", put(set_copy_data))
        .route("/api/sessions/:id/export/zip", post(export_zip))
        .route("/api/sessions/:id/export/clipboard", post(copy_all))
        .route("/api/sessions/:id/export/clipboard/:platform", post(copy_platform))
        .route("/api/sessions/:id/export/status", get(export_status))
        .route("/api/sessions/:id/share/:platform", post(share))
        .route("/api/sessions/:id/share/:platform/backend", post(share_via_backend))
        .route("/api/sessions/:id/share/:platform/intent/:target", post(share_intent))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

fn lookup(state: &Workbench, id: Uuid) -> ApiResult<SharedSession> {
    state.session(id).ok_or_else(|| ApiError::not_found("Sesión"))
}

fn parse_platform(s: &str) -> ApiResult<Platform> {
    Platform::parse(s).ok_or_else(|| ApiError(StatusCode::BAD_REQUEST, format!("Plataforma '{}' no soportada", s)))
}

pub async fn health(State(state): State<Workbench>) -> Json<serde_json::Value> {
    let backend = match state.backend.health().await {
        Ok(v) => v,
        Err(e) => json!({ "status": "unreachable", "detail": e.to_string() }),
    };
    Json(json!({
        "status": "ok",
        "sessions": state.session_count(),
        "backend_url": state.settings.api_url,
        "backend": backend,
    }))
}

pub async fn app_links(Path(platform): Path<String>) -> ApiResult<Response> {
    let platform = parse_platform(&platform)?;
    Ok(Json(app_download_urls(platform)).into_response())
}

pub async fn create_session(State(state): State<Workbench>, body: Option<Json<SessionOptions>>) -> Response {
    let options = body.map(|Json(o)| o).unwrap_or_default();
    let session = state.create_session(options);
    let snapshot = session.read().snapshot();
    (StatusCode::CREATED, Json(snapshot)).into_response()
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let snapshot = session.read().snapshot();
    Ok(Json(snapshot).into_response())
}

pub async fn end_session(Path(id): Path<Uuid>, State(state): State<Workbench>) -> StatusCode {
    if state.end_session(id) { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}

pub async fn update_config(
    Path(id): Path<Uuid>,
    State(state): State<Workbench>,
    Json(patch): Json<ConfigPatch>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let snapshot = {
        let mut s = session.write();
        patch.apply(&mut s.store);
        s.snapshot()
    };
    Ok(Json(snapshot).into_response())
}

pub async fn save_config(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let saved = state.save_config(&session).await?;
    Ok(Json(saved).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BenefitBody {
    pub text: String,
}

pub async fn add_benefit(
    Path(id): Path<Uuid>,
    State(state): State<Workbench>,
    Json(body): Json<BenefitBody>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let (added, benefits) = {
        let mut s = session.write();
        let added = s.store.add_benefit(&body.text);
        (added, s.store.benefits().to_vec())
    };
    Ok(Json(json!({ "added": added, "benefits": benefits })).into_response())
}

pub async fn remove_benefit(
    Path((id, index)): Path<(Uuid, usize)>,
    State(state): State<Workbench>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let mut s = session.write();
    s.store.remove_benefit(index).ok_or_else(|| ApiError::not_found("Beneficio"))?;
    Ok(Json(json!({ "benefits": s.store.benefits() })).into_response())
}

pub async fn generate(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let completion = match state.generate(&session).await {
        Ok(c) => c,
        Err(GenerationError::InFlight) => {
            return Err(ApiError(StatusCode::CONFLICT, "Ya hay una generación en curso".into()));
        }
        Err(GenerationError::Validation(msg)) => return Err(ApiError(StatusCode::UNPROCESSABLE_ENTITY, msg)),
        Err(GenerationError::Backend(e)) => return Err(e.into()),
    };
    let status = match completion {
        Completion::Applied(_) => StatusCode::OK,
        Completion::Failed(_) => StatusCode::BAD_GATEWAY,
        Completion::Stale => StatusCode::CONFLICT,
    };
    let snapshot = session.read().snapshot();
    Ok((status, Json(snapshot)).into_response())
}

pub async fn abandon_generation(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<StatusCode> {
    let session = lookup(&state, id)?;
    state.abandon_generation(&session);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dismiss_error(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<StatusCode> {
    let session = lookup(&state, id)?;
    session.write().generator.dismiss_error();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_result(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let rendered = state.rendered_result(&session).ok_or_else(|| ApiError::not_found("Copy"))?;
    Ok(Json(rendered).into_response())
}

pub async fn copy_result(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    Ok(Json(state.copy_result(&session).await).into_response())
}

pub async fn get_history(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    Ok(Json(state.history_view(&session).await).into_response())
}

pub async fn refresh_history(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    Ok(Json(state.refresh_history(&session).await).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

pub async fn upload_image(
    Path(id): Path<Uuid>,
    Query(q): Query<UploadQuery>,
    State(state): State<Workbench>,
    body: Bytes,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let mut s = session.write();
    let image_id = s.gallery.add(&q.file_name, body)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": image_id, "images": s.gallery.summaries() }))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ClassifyBody {
    pub kind: ImageKind,
}

pub async fn classify_image(
    Path((id, image_id)): Path<(Uuid, Uuid)>,
    State(state): State<Workbench>,
    Json(body): Json<ClassifyBody>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let mut s = session.write();
    s.gallery.classify(image_id, body.kind)?;
    Ok(Json(json!({ "classified": s.gallery.classified_count() })).into_response())
}

pub async fn remove_image(
    Path((id, image_id)): Path<(Uuid, Uuid)>,
    State(state): State<Workbench>,
) -> ApiResult<StatusCode> {
    let session = lookup(&state, id)?;
    session.write().gallery.remove(image_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CopyDataBody {
    pub copy_data: CopyData,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

pub async fn set_copy_data(
    Path(id): Path<Uuid>,
    State(state): State<Workbench>,
    Json(body): Json<CopyDataBody>,
) -> ApiResult<StatusCode> {
    let session = lookup(&state, id)?;
    let mut s = session.write();
    s.copy_data = body.copy_data;
    s.hashtags = body.hashtags;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_zip(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let download = state.export_zip(&session).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(download.content_type));
    let value = HeaderValue::from_str(&content_disposition(&download.file_name))
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.insert(header::CONTENT_DISPOSITION, value);
    Ok((StatusCode::OK, headers, download.bytes).into_response())
}

/// Attachment header with a visible-ASCII fallback name and the exact
/// name in RFC 5987 form.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, urlencoding::encode(file_name))
}

pub async fn copy_all(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    Ok(Json(state.copy_all(&session).await).into_response())
}

pub async fn copy_platform(
    Path((id, platform)): Path<(Uuid, String)>,
    State(state): State<Workbench>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let platform = parse_platform(&platform)?;
    Ok(Json(state.copy_platform(&session, platform).await).into_response())
}

pub async fn export_status(Path(id): Path<Uuid>, State(state): State<Workbench>) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let status = session.read().export_status();
    Ok(Json(status).into_response())
}

#[derive(Debug, Deserialize, Default)]
pub struct ShareBody {
    /// What happened when the page showed the native share sheet, if it did.
    #[serde(default)]
    pub native_outcome: Option<NativeShareOutcome>,
}

#[derive(Debug, Deserialize, Default)]
pub struct IntentBody {
    /// Required by image-first targets such as Pinterest.
    #[serde(default)]
    pub image_url: Option<String>,
}

pub async fn share(
    Path((id, platform)): Path<(Uuid, String)>,
    State(state): State<Workbench>,
    body: Option<Json<ShareBody>>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let platform = parse_platform(&platform)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let result = state.share(&session, platform, body.native_outcome).await;
    Ok(Json(result).into_response())
}

pub async fn share_via_backend(
    Path((id, platform)): Path<(Uuid, String)>,
    State(state): State<Workbench>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let platform = parse_platform(&platform)?;
    let result = state.share_via_backend(&session, platform).await?;
    Ok(Json(result).into_response())
}

pub async fn share_intent(
    Path((id, platform, target)): Path<(Uuid, String, String)>,
    State(state): State<Workbench>,
    body: Option<Json<IntentBody>>,
) -> ApiResult<Response> {
    let session = lookup(&state, id)?;
    let platform = parse_platform(&platform)?;
    let target = ShareTarget::parse(&target)
        .ok_or_else(|| ApiError(StatusCode::BAD_REQUEST, format!("Destino '{}' no soportado", target)))?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let result = state.share_intent(&session, platform, target, body.image_url.as_deref());
    Ok(Json(result).into_response())
}
