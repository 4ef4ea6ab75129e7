use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    compression::{self, CompressionEstimate},
    error::{ApiResult, api_bad_gateway, api_validation_error},
    models::{
        CompressionEstimateRequest, Module, PresignedUrlRequest, PresignedUrlResponse, UploadKind,
    },
    permissions::Action,
    storage,
};

/// get_presigned_url
///
/// [Authenticated Route] Starts the direct-to-storage upload flow.
///
/// The object key is chosen by the server (`documents/<uuid>.<ext>` or
/// `digital-assets/<uuid>.<ext>`); the client filename only contributes its
/// extension. The caller needs write access to the target module.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "Presigned upload URL", body = PresignedUrlResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_presigned_url(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let module = match payload.kind {
        UploadKind::Document => Module::Documents,
        UploadKind::DigitalAsset => Module::DigitalAssets,
    };
    state.permissions.require(&user, module, Action::Write).await?;
    if payload.file_type.trim().is_empty() {
        return Err(api_validation_error("file_type must not be empty"));
    }

    let resource_key = storage::object_key(payload.kind, &payload.filename);
    let upload_url = state
        .storage
        .presigned_upload_url(&resource_key, &payload.file_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "presigning upload failed");
            api_bad_gateway("storage service unavailable")
        })?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key,
    }))
}

/// estimate_compression
///
/// [Authenticated Route] Size the file would be recorded with after compression.
#[utoipa::path(
    post,
    path = "/compression/estimate",
    request_body = CompressionEstimateRequest,
    responses((status = 200, description = "Estimate", body = CompressionEstimate))
)]
pub async fn estimate_compression(
    _user: AuthUser,
    Json(payload): Json<CompressionEstimateRequest>,
) -> ApiResult<Json<CompressionEstimate>> {
    if payload.file_size < 0 {
        return Err(api_validation_error("file_size must not be negative"));
    }
    Ok(Json(compression::estimate(&payload.file_name, payload.file_size)))
}
