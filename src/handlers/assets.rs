use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::AuthUser,
    barcode,
    error::{ApiResult, api_not_found, api_validation_error},
    models::{
        Asset, AssetFilter, AuditAction, CreateAssetRequest, Module, Page, UpdateAssetRequest,
    },
    permissions::Action,
};

use super::{entity, require_text, require_text_if_present};

fn require_order_field(field: &str, value: Option<i32>) -> ApiResult<i32> {
    let value = value.unwrap_or(1);
    if !(1..=999).contains(&value) {
        return Err(api_validation_error(&format!("{field} must be between 1 and 999")));
    }
    Ok(value)
}

/// list_assets
///
/// [Authenticated Route] Active physical assets, newest first.
#[utoipa::path(
    get,
    path = "/assets",
    params(AssetFilter),
    responses((status = 200, description = "Paginated assets", body = Page<Asset>))
)]
pub async fn list_assets(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AssetFilter>,
) -> ApiResult<Json<Page<Asset>>> {
    state.permissions.require(&user, Module::Assets, Action::Read).await?;
    Ok(Json(state.repo.list_assets(filter).await?))
}

#[utoipa::path(
    get,
    path = "/assets/{id}",
    responses(
        (status = 200, description = "Asset", body = Asset),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_asset(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Asset>> {
    state.permissions.require(&user, Module::Assets, Action::Read).await?;
    let asset = state
        .repo
        .get_asset(id)
        .await?
        .ok_or_else(|| api_not_found("asset not found"))?;
    Ok(Json(asset))
}

/// get_asset_by_barcode
///
/// [Authenticated Route] Lookup used by scanners.
#[utoipa::path(
    get,
    path = "/assets/barcode/{barcode}",
    responses(
        (status = 200, description = "Asset", body = Asset),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_asset_by_barcode(
    user: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Asset>> {
    state.permissions.require(&user, Module::Assets, Action::Read).await?;
    if barcode::parse_barcode(&code).is_none() {
        return Err(api_validation_error("malformed barcode"));
    }
    let asset = state
        .repo
        .get_asset_by_barcode(&code)
        .await?
        .ok_or_else(|| api_not_found("asset not found"))?;
    Ok(Json(asset))
}

/// create_asset
///
/// [Authenticated Route] Registers a physical asset and assigns its barcode. A
/// barcode that loses an insert race is regenerated once.
#[utoipa::path(
    post,
    path = "/assets",
    request_body = CreateAssetRequest,
    responses(
        (status = 201, description = "Created", body = Asset),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Barcode allocation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_asset(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<CreateAssetRequest>,
) -> ApiResult<(StatusCode, Json<Asset>)> {
    state.permissions.require(&user, Module::Assets, Action::Write).await?;
    require_text("name", &payload.name)?;
    let order_number = require_order_field("order_number", payload.order_number)?;
    let quota = require_order_field("quota", payload.quota)?;
    if payload.purchase_price.is_some_and(|p| p < 0.0) {
        return Err(api_validation_error("purchase_price must not be negative"));
    }

    let year = Utc::now().year();
    let category = payload.category;
    let repo = state.repo.as_ref();
    let creator = user.id;
    let asset = barcode::insert_with_unique_barcode(
        repo,
        order_number,
        quota,
        year,
        category,
        move |code| repo.create_asset(payload.clone(), code, creator),
    )
    .await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Create, entity::ASSET)
            .entity(asset.id)
            .actor(user.id)
            .new_values(&asset)
            .context(&ctx),
    )
    .await;

    Ok((StatusCode::CREATED, Json(asset)))
}

#[utoipa::path(
    put,
    path = "/assets/{id}",
    request_body = UpdateAssetRequest,
    responses(
        (status = 200, description = "Updated", body = Asset),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_asset(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssetRequest>,
) -> ApiResult<Json<Asset>> {
    state.permissions.require(&user, Module::Assets, Action::Write).await?;
    require_text_if_present("name", payload.name.as_deref())?;
    if payload.purchase_price.is_some_and(|p| p < 0.0) {
        return Err(api_validation_error("purchase_price must not be negative"));
    }

    let old = state
        .repo
        .get_asset(id)
        .await?
        .ok_or_else(|| api_not_found("asset not found"))?;
    let updated = state.repo.update_asset(id, payload).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Update, entity::ASSET)
            .entity(id)
            .actor(user.id)
            .old(&old)
            .new_values(&updated)
            .context(&ctx),
    )
    .await;

    Ok(Json(updated))
}

/// delete_asset
///
/// [Authenticated Route] Soft delete; the barcode stays reserved.
#[utoipa::path(
    delete,
    path = "/assets/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "No delete permission", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_asset(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.permissions.require(&user, Module::Assets, Action::Delete).await?;
    let removed = state.repo.deactivate_asset(id).await?;

    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::Delete, entity::ASSET)
            .entity(id)
            .actor(user.id)
            .old(&removed)
            .context(&ctx),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
