//! Bearer API key authentication.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::AppState;
use crate::config::ApiKeyEntry;
use crate::sync::{TenantProvider, TenantScope};

/// Authenticated caller, added to request extensions after auth
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub tenant_id: Option<Uuid>,
}

impl TenantProvider for AuthUser {
    fn tenant_scope(&self) -> TenantScope {
        match self.tenant_id {
            Some(tenant_id) => TenantScope::Tenant(tenant_id),
            None => TenantScope::System,
        }
    }
}

/// API key store - maps key -> AuthUser
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    pub fn from_entries(entries: &[ApiKeyEntry]) -> Self {
        let keys = entries
            .iter()
            .map(|entry| {
                (
                    entry.key.clone(),
                    AuthUser {
                        user_id: entry.user_id.clone(),
                        tenant_id: entry.tenant_id,
                    },
                )
            })
            .collect();
        Self { keys }
    }

    /// Validate an API key and return the associated user
    pub fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Auth error response
#[derive(Serialize)]
struct AuthError {
    error: &'static str,
    message: &'static str,
}

fn unauthorized(error: &'static str, message: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(AuthError { error, message })).into_response()
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(key) => key,
            None => {
                return unauthorized(
                    "invalid_auth",
                    "Authorization header must use Bearer scheme",
                )
            }
        },
        None => return unauthorized("missing_auth", "Authorization header required"),
    };

    match state.api_keys.validate(api_key) {
        Some(user) => {
            tracing::debug!("Authenticated {} ({:?})", user.user_id, user.tenant_scope());
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => unauthorized("invalid_key", "Invalid API key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_map_to_tenant_scopes() {
        let tenant = Uuid::new_v4();
        let store = ApiKeyStore::from_entries(&[
            ApiKeyEntry {
                key: "tenant-key".to_string(),
                user_id: "erik".to_string(),
                tenant_id: Some(tenant),
            },
            ApiKeyEntry {
                key: "admin-key".to_string(),
                user_id: "ops".to_string(),
                tenant_id: None,
            },
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.validate("tenant-key").unwrap().tenant_scope(),
            TenantScope::Tenant(tenant)
        );
        assert_eq!(
            store.validate("admin-key").unwrap().tenant_scope(),
            TenantScope::System
        );
        assert!(store.validate("nope").is_none());
    }
}
