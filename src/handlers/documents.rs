use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::AuthUser,
    compression,
    error::{ApiResult, api_bad_gateway, api_not_found},
    models::{
        AuditAction, CreateDocumentRequest, Document, DocumentFilter, DownloadUrlResponse, Module,
        Page, UpdateDocumentRequest, UploadKind,
    },
    permissions::Action,
};

use super::{entity, require_file_size, require_object_key, require_text, require_text_if_present};

#[utoipa::path(
    get,
    path = "/documents",
    params(DocumentFilter),
    responses((status = 200, description = "Paginated documents", body = Page<Document>))
)]
pub async fn list_documents(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DocumentFilter>,
) -> ApiResult<Json<Page<Document>>> {
    state.permissions.require(&user, Module::Documents, Action::Read).await?;
    Ok(Json(state.repo.list_documents(filter).await?))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    responses(
        (status = 200, description = "Document", body = Document),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_document(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Document>> {
    state.permissions.require(&user, Module::Documents, Action::Read).await?;
    let document = state
        .repo
        .get_document(id)
        .await?
        .ok_or_else(|| api_not_found("document not found"))?;
    Ok(Json(document))
}

/// create_document
///
/// [Authenticated Route] Records metadata for a file already uploaded through
/// `POST /upload/presigned`. The stored `compressed_size` is the estimate for
/// the file's extension.
#[utoipa::path(
    post,
    path = "/documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Created", body = Document),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_document(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    state.permissions.require(&user, Module::Documents, Action::Write).await?;
    require_text("title", &payload.title)?;
    require_text("category", &payload.category)?;
    require_text("file_name", &payload.file_name)?;
    require_file_size(payload.file_size)?;
    require_object_key(&payload.file_key, UploadKind::Document.key_prefix())?;

    let estimate = compression::estimate(&payload.file_name, payload.file_size);
    let document = state
        .repo
        .create_document(payload, estimate.estimated_size, user.id)
        .await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Create, entity::DOCUMENT)
            .entity(document.id)
            .actor(user.id)
            .new_values(&document)
            .context(&ctx),
    )
    .await;

    Ok((StatusCode::CREATED, Json(document)))
}

/// update_document
///
/// [Authenticated Route] Partial metadata update. Supplying `file` replaces the
/// stored object reference and recomputes `compressed_size`; `version` is bumped
/// when the object key differs from the stored one.
#[utoipa::path(
    put,
    path = "/documents/{id}",
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Updated", body = Document),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_document(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<Document>> {
    state.permissions.require(&user, Module::Documents, Action::Write).await?;
    require_text_if_present("title", payload.title.as_deref())?;
    require_text_if_present("category", payload.category.as_deref())?;

    let compressed_size = match &payload.file {
        Some(file) => {
            require_text("file_name", &file.file_name)?;
            require_file_size(file.file_size)?;
            require_object_key(&file.file_key, UploadKind::Document.key_prefix())?;
            Some(compression::estimate(&file.file_name, file.file_size).estimated_size)
        }
        None => None,
    };

    let old = state
        .repo
        .get_document(id)
        .await?
        .ok_or_else(|| api_not_found("document not found"))?;
    let updated = state
        .repo
        .update_document(id, payload, compressed_size)
        .await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Update, entity::DOCUMENT)
            .entity(id)
            .actor(user.id)
            .old(&old)
            .new_values(&updated)
            .context(&ctx),
    )
    .await;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_document(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.permissions.require(&user, Module::Documents, Action::Delete).await?;
    let removed = state.repo.deactivate_document(id).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Delete, entity::DOCUMENT)
            .entity(id)
            .actor(user.id)
            .old(&removed)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// download_document
///
/// [Authenticated Route] Short-lived signed GET URL for the stored file.
#[utoipa::path(
    get,
    path = "/documents/{id}/download",
    responses(
        (status = 200, description = "Download URL", body = DownloadUrlResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_document(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DownloadUrlResponse>> {
    state.permissions.require(&user, Module::Documents, Action::Read).await?;
    let document = state
        .repo
        .get_document(id)
        .await?
        .ok_or_else(|| api_not_found("document not found"))?;

    let download_url = state
        .storage
        .presigned_download_url(&document.file_key)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %document.file_key, "presigning download failed");
            api_bad_gateway("storage service unavailable")
        })?;

    Ok(Json(DownloadUrlResponse {
        download_url,
        file_name: document.file_name,
    }))
}
