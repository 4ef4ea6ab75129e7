//! Audit trail helpers.
//!
//! Handlers pull an `AuditContext` from the request and call `record` after a
//! successful mutation. Failed audit writes are logged and swallowed so they
//! never fail the request that triggered them.
use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{AuditAction, NewAuditLog},
    repository::Repository,
};

/// Request metadata stored alongside every audit entry.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let ip_address = header_str("x-forwarded-for")
            .and_then(|chain| chain.split(',').next().map(|hop| hop.trim().to_string()))
            .filter(|hop| !hop.is_empty())
            .or_else(|| header_str("x-real-ip"));

        Self {
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str()),
        }
    }
}

impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// One audit event, built fluently by the handler.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    entry: NewAuditLog,
}

impl AuditEvent {
    pub fn new(action: AuditAction, entity_type: &str) -> Self {
        Self {
            entry: NewAuditLog {
                action,
                entity_type: entity_type.to_string(),
                entity_id: None,
                actor_id: None,
                old_values: None,
                new_values: None,
                ip_address: None,
                user_agent: None,
            },
        }
    }

    pub fn entity(mut self, id: impl ToString) -> Self {
        self.entry.entity_id = Some(id.to_string());
        self
    }

    pub fn actor(mut self, actor_id: Uuid) -> Self {
        self.entry.actor_id = Some(actor_id);
        self
    }

    pub fn old<T: Serialize>(mut self, value: &T) -> Self {
        self.entry.old_values = to_json(value);
        self
    }

    pub fn new_values<T: Serialize>(mut self, value: &T) -> Self {
        self.entry.new_values = to_json(value);
        self
    }

    pub fn context(mut self, ctx: &AuditContext) -> Self {
        self.entry.ip_address = ctx.ip_address.clone();
        self.entry.user_agent = ctx.user_agent.clone();
        self
    }

    pub fn into_entry(self) -> NewAuditLog {
        self.entry
    }
}

fn to_json<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(error = %e, "audit snapshot could not be serialized");
            None
        }
    }
}

/// record
///
/// Best-effort insert of `event`.
pub async fn record(repo: &dyn Repository, event: AuditEvent) {
    let entry = event.into_entry();
    let action = entry.action;
    let entity_type = entry.entity_type.clone();
    if let Err(e) = repo.insert_audit_log(entry).await {
        tracing::warn!(error = ?e, ?action, %entity_type, "audit log write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let ctx = AuditContext::from_headers(&headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        let ctx = AuditContext::from_headers(&headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.2"));
        assert_eq!(ctx.user_agent, None);
    }

    #[test]
    fn event_builder_serializes_snapshots() {
        let actor = Uuid::new_v4();
        let entry = AuditEvent::new(AuditAction::Update, "ASSET")
            .entity(42)
            .actor(actor)
            .old(&serde_json::json!({"status": "AVAILABLE"}))
            .new_values(&serde_json::json!({"status": "IN_USE"}))
            .into_entry();

        assert_eq!(entry.entity_id.as_deref(), Some("42"));
        assert_eq!(entry.actor_id, Some(actor));
        assert_eq!(entry.old_values.as_deref(), Some(r#"{"status":"AVAILABLE"}"#));
        assert_eq!(entry.new_values.as_deref(), Some(r#"{"status":"IN_USE"}"#));
    }
}
