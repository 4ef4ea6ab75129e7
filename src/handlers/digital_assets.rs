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
        AuditAction, CreateDigitalAssetRequest, DigitalAsset, DigitalAssetFilter,
        DigitalAssetKind, DownloadUrlResponse, Module, Page, UpdateDigitalAssetRequest, UploadKind,
    },
    permissions::Action,
};

use super::{entity, require_file_size, require_object_key, require_text, require_text_if_present};

#[utoipa::path(
    get,
    path = "/digital-assets",
    params(DigitalAssetFilter),
    responses((status = 200, description = "Paginated digital assets", body = Page<DigitalAsset>))
)]
pub async fn list_digital_assets(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DigitalAssetFilter>,
) -> ApiResult<Json<Page<DigitalAsset>>> {
    state.permissions.require(&user, Module::DigitalAssets, Action::Read).await?;
    Ok(Json(state.repo.list_digital_assets(filter).await?))
}

#[utoipa::path(
    get,
    path = "/digital-assets/{id}",
    responses(
        (status = 200, description = "Digital asset", body = DigitalAsset),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_digital_asset(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DigitalAsset>> {
    state.permissions.require(&user, Module::DigitalAssets, Action::Read).await?;
    let item = state
        .repo
        .get_digital_asset(id)
        .await?
        .ok_or_else(|| api_not_found("digital asset not found"))?;
    Ok(Json(item))
}

/// create_digital_asset
///
/// [Authenticated Route] Registers an uploaded media file. `kind` falls back to
/// detection from the MIME type and extension.
#[utoipa::path(
    post,
    path = "/digital-assets",
    request_body = CreateDigitalAssetRequest,
    responses(
        (status = 201, description = "Created", body = DigitalAsset),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_digital_asset(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<CreateDigitalAssetRequest>,
) -> ApiResult<(StatusCode, Json<DigitalAsset>)> {
    state.permissions.require(&user, Module::DigitalAssets, Action::Write).await?;
    require_text("name", &payload.name)?;
    require_text("file_name", &payload.file_name)?;
    require_file_size(payload.file_size)?;
    require_object_key(&payload.file_key, UploadKind::DigitalAsset.key_prefix())?;

    let kind = payload
        .kind
        .unwrap_or_else(|| DigitalAssetKind::detect(&payload.mime_type, &payload.file_name));
    let estimate = compression::estimate(&payload.file_name, payload.file_size);
    let item = state
        .repo
        .create_digital_asset(payload, kind, estimate.estimated_size, user.id)
        .await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Create, entity::DIGITAL_ASSET)
            .entity(item.id)
            .actor(user.id)
            .new_values(&item)
            .context(&ctx),
    )
    .await;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/digital-assets/{id}",
    request_body = UpdateDigitalAssetRequest,
    responses(
        (status = 200, description = "Updated", body = DigitalAsset),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_digital_asset(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDigitalAssetRequest>,
) -> ApiResult<Json<DigitalAsset>> {
    state.permissions.require(&user, Module::DigitalAssets, Action::Write).await?;
    require_text_if_present("name", payload.name.as_deref())?;

    let old = state
        .repo
        .get_digital_asset(id)
        .await?
        .ok_or_else(|| api_not_found("digital asset not found"))?;
    let updated = state.repo.update_digital_asset(id, payload).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Update, entity::DIGITAL_ASSET)
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
    path = "/digital-assets/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_digital_asset(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.permissions.require(&user, Module::DigitalAssets, Action::Delete).await?;
    let removed = state.repo.deactivate_digital_asset(id).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Delete, entity::DIGITAL_ASSET)
            .entity(id)
            .actor(user.id)
            .old(&removed)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/digital-assets/{id}/download",
    responses(
        (status = 200, description = "Download URL", body = DownloadUrlResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_digital_asset(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DownloadUrlResponse>> {
    state.permissions.require(&user, Module::DigitalAssets, Action::Read).await?;
    let item = state
        .repo
        .get_digital_asset(id)
        .await?
        .ok_or_else(|| api_not_found("digital asset not found"))?;

    let download_url = state
        .storage
        .presigned_download_url(&item.file_key)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %item.file_key, "presigning download failed");
            api_bad_gateway("storage service unavailable")
        })?;

    Ok(Json(DownloadUrlResponse {
        download_url,
        file_name: item.file_name,
    }))
}
