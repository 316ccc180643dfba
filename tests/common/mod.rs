#![allow(dead_code)]

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};

use trellis_api::app::with_policy;
use trellis_api::auth::{self, AccessPolicy, AccessTokenPayload, RoleAssignment, TenantMembership};
use trellis_api::context;
use trellis_api::middleware::request_context_middleware;

/// A minimal router with one probe route guarded by the given policy,
/// wrapped in the same context/gate stack as the real app. No database, so
/// gate behavior can be asserted in isolation.
pub fn probe_router(policy: AccessPolicy) -> Router {
    let router = Router::new().route("/probe", get(probe));
    with_policy(router, policy).layer(middleware::from_fn(request_context_middleware))
}

/// Echo the request context so tests can observe what the gates stored.
async fn probe() -> Json<Value> {
    match context::get() {
        Ok(ctx) => Json(json!({
            "requestId": ctx.request_id,
            "userId": ctx.user_id,
            "tenantId": ctx.tenant_id,
        })),
        Err(_) => Json(json!({ "error": "no context" })),
    }
}

/// Access token whose membership in `tenant_id` carries the given role types.
pub fn token_with_roles(tenant_id: &str, role_types: &[&str]) -> String {
    let mut payload = AccessTokenPayload::new("user-1", "user@example.com");
    payload.tenants = Some(vec![TenantMembership {
        tenant_id: tenant_id.to_string(),
        roles: role_types
            .iter()
            .enumerate()
            .map(|(i, role_type)| RoleAssignment::typed(format!("role-{}", i), *role_type))
            .collect(),
    }]);

    auth::runtime().codec.sign_access_token(&payload).unwrap()
}

/// Access token with a tenant membership (no typed roles) and a flat
/// permission grant.
pub fn token_with_permissions(tenant_id: &str, permissions: &[&str]) -> String {
    let mut payload = AccessTokenPayload::new("user-1", "user@example.com");
    payload.tenants = Some(vec![TenantMembership {
        tenant_id: tenant_id.to_string(),
        roles: vec![],
    }]);
    payload.permissions = Some(permissions.iter().map(|s| s.to_string()).collect());

    auth::runtime().codec.sign_access_token(&payload).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
