//! Handlers for the `/solicitations` resource.
//!
//! Create and patch take `multipart/form-data`: one `solicitation` part with
//! the JSON draft and zero or more `files` parts, in the same order as the
//! draft's copies that still need an upload.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use printdesk_core::query::{Page, SolicitationFilter};
use printdesk_core::reconciler::UploadedFile;
use printdesk_core::service::SolicitationService;
use printdesk_core::solicitation::{Solicitation, SolicitationDraft, TimelineEvent};
use printdesk_core::types::DbId;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{ListParams, NotifyParams, PageParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Name of the multipart part holding the JSON draft.
const DRAFT_PART: &str = "solicitation";
/// Name of the multipart parts holding uploaded files.
const FILES_PART: &str = "files";

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// Read the draft and uploads out of a create/patch submission.
async fn read_submission(
    mut multipart: Multipart,
) -> AppResult<(SolicitationDraft, Vec<UploadedFile>)> {
    let mut draft: Option<SolicitationDraft> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some(DRAFT_PART) => {
                let raw = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let parsed = serde_json::from_slice(&raw).map_err(|e| {
                    AppError::BadRequest(format!("Invalid '{DRAFT_PART}' part: {e}"))
                })?;
                draft = Some(parsed);
            }
            Some(FILES_PART) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                uploads.push(UploadedFile::new(file_name, bytes.to_vec()));
            }
            other => {
                tracing::debug!(part = ?other, "Ignoring unknown multipart part");
            }
        }
    }

    let draft = draft.ok_or_else(|| {
        AppError::BadRequest(format!("Missing '{DRAFT_PART}' multipart part"))
    })?;
    Ok((draft, uploads))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/solicitations
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<Solicitation>>>> {
    let filter = SolicitationService::scope_filter(SolicitationFilter::from(params), &user);
    let items = state.service.find_all(&filter).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/solicitations/page
pub async fn page(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<Solicitation>>>> {
    let (filter, request) = params.into_parts();
    let filter = SolicitationService::scope_filter(filter, &user);
    let page = state.service.find_page(&filter, &request).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/solicitations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Solicitation>>> {
    let solicitation = state.service.view(id, &user).await?;
    Ok(Json(DataResponse { data: solicitation }))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// POST /api/v1/solicitations
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Solicitation>>)> {
    let (draft, uploads) = read_submission(multipart).await?;
    let created = state.service.create(draft, uploads, &user).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// PATCH /api/v1/solicitations/{id}
pub async fn patch(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<Solicitation>>> {
    let (draft, uploads) = read_submission(multipart).await?;
    let updated = state.service.patch(id, draft, uploads, &user).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// PATCH /api/v1/solicitations/{id}/toggle?notify=
pub async fn toggle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<NotifyParams>,
) -> AppResult<Json<DataResponse<Solicitation>>> {
    let updated = state
        .service
        .toggle_conclusion_date(id, params.notify, &user)
        .await?;
    Ok(Json(DataResponse { data: updated }))
}

/// Request body for adding a comment.
#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub content: String,
}

/// POST /api/v1/solicitations/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CommentInput>,
) -> AppResult<(StatusCode, Json<DataResponse<TimelineEvent>>)> {
    let event = state.service.add_comment(id, &input.content, &user).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// DELETE /api/v1/solicitations/{id}?notify=
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<NotifyParams>,
) -> AppResult<StatusCode> {
    state
        .service
        .remove_request(id, params.notify.unwrap_or(false), &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// GET /api/v1/solicitations/{id}/files/{file_name}
///
/// Streams the stored file as an attachment.
pub async fn download(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, file_name)): Path<(DbId, String)>,
) -> AppResult<Response> {
    let download = state.service.get_file(&user, id, &file_name).await?;

    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = download.content_disposition();
    let size = download.size;
    let stream = ReaderStream::new(download.file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(format!("Failed to build download response: {e}")))
}
