use std::time::{Duration, Instant};

use axum::{Json, extract::State};

use crate::{
    AppState,
    audit::{self, AuditContext, AuditEvent},
    auth::AuthUser,
    error::{ApiResult, api_bad_gateway, api_internal, api_validation_error},
    models::{
        AiConnectionTestResult, AiSettings, AiSettingsResponse, AuditAction, Role,
        UpdateAiSettingsRequest,
    },
    permissions::require_role,
};

use super::{entity, require_text};

const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `****` followed by the last four characters; short keys are fully masked.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

impl From<AiSettings> for AiSettingsResponse {
    fn from(s: AiSettings) -> Self {
        Self {
            enabled: s.enabled,
            provider: s.provider,
            model: s.model,
            api_key: s.api_key.as_deref().map(mask_api_key),
            base_url: s.base_url,
            temperature: s.temperature,
            max_tokens: s.max_tokens,
            updated_at: s.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/admin/ai-settings",
    responses((status = 200, description = "AI provider settings", body = AiSettingsResponse))
)]
pub async fn get_ai_settings(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<AiSettingsResponse>> {
    require_role(&user, &[Role::Admin])?;
    Ok(Json(state.repo.get_ai_settings().await?.into()))
}

/// update_ai_settings
///
/// [Admin Route] An omitted `api_key` keeps the stored key; an empty string clears it.
#[utoipa::path(
    put,
    path = "/admin/ai-settings",
    request_body = UpdateAiSettingsRequest,
    responses(
        (status = 200, description = "Updated", body = AiSettingsResponse),
        (status = 400, description = "Invalid settings", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_ai_settings(
    user: AuthUser,
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(payload): Json<UpdateAiSettingsRequest>,
) -> ApiResult<Json<AiSettingsResponse>> {
    require_role(&user, &[Role::Admin])?;
    require_text("provider", &payload.provider)?;
    require_text("model", &payload.model)?;
    if !(0.0..=2.0).contains(&payload.temperature) {
        return Err(api_validation_error("temperature must be between 0 and 2"));
    }
    if payload.max_tokens < 1 {
        return Err(api_validation_error("max_tokens must be positive"));
    }
    if let Some(url) = payload.base_url.as_deref() {
        if reqwest::Url::parse(url).is_err() {
            return Err(api_validation_error("base_url is not a valid URL"));
        }
    }

    let old: AiSettingsResponse = state.repo.get_ai_settings().await?.into();
    let updated: AiSettingsResponse = state.repo.update_ai_settings(payload).await?.into();

    // Only masked keys reach the audit trail.
    audit::record(
        state.repo.as_ref(),
        AuditEvent::new(AuditAction::SettingsUpdate, entity::AI_SETTINGS)
            .actor(user.id)
            .old(&old)
            .new_values(&updated)
            .context(&ctx),
    )
    .await;

    Ok(Json(updated))
}

/// test_ai_connection
///
/// [Admin Route] Issues `GET {base_url}/models` with the stored key. Any HTTP
/// answer is reported; transport failures are a 502.
#[utoipa::path(
    post,
    path = "/admin/ai-settings/test",
    responses(
        (status = 200, description = "Provider answered", body = AiConnectionTestResult),
        (status = 400, description = "Settings incomplete", body = crate::error::ErrorResponse),
        (status = 502, description = "Provider unreachable", body = crate::error::ErrorResponse)
    )
)]
pub async fn test_ai_connection(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<AiConnectionTestResult>> {
    require_role(&user, &[Role::Admin])?;
    let settings = state.repo.get_ai_settings().await?;
    if !settings.enabled {
        return Err(api_validation_error("AI integration is disabled"));
    }
    let (Some(base_url), Some(api_key)) = (settings.base_url.as_deref(), settings.api_key.as_deref())
    else {
        return Err(api_validation_error("base_url and api_key must be configured"));
    };

    let client = reqwest::Client::builder()
        .timeout(CONNECTION_TEST_TIMEOUT)
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build HTTP client");
            api_internal("could not build HTTP client")
        })?;

    let url = format!("{}/models", base_url.trim_end_matches('/'));
    let started = Instant::now();
    let response = client
        .get(&url)
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, provider = %settings.provider, "AI provider unreachable");
            api_bad_gateway("AI provider unreachable")
        })?;

    let status = response.status();
    Ok(Json(AiConnectionTestResult {
        ok: status.is_success(),
        status: status.as_u16(),
        latency_ms: started.elapsed().as_millis() as u64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_only_last_four_characters() {
        assert_eq!(mask_api_key("sk-test-abcdef1234"), "****1234");
        assert_eq!(mask_api_key("abcd"), "****");
        assert_eq!(mask_api_key(""), "****");
    }
}
