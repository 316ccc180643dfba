use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::auth::{self, AccessPolicy, AuthRuntime};
use crate::context;
use crate::error::ApiError;

/// Entry guard: verifies the bearer token (unless the route is public),
/// resolves the acting tenant and populates the request context. Rejections
/// are routine traffic, so they log at info level.
pub async fn auth_gate(request: Request, next: Next) -> Result<Response, ApiError> {
    // A route without an attached policy is treated as protected
    let policy = request
        .extensions()
        .get::<AccessPolicy>()
        .cloned()
        .unwrap_or_default();

    authenticate(auth::runtime(), &policy, request.headers()).await?;

    Ok(next.run(request).await)
}

/// The gate's decision logic, separated from the middleware plumbing so it
/// can be exercised with an explicit [`AuthRuntime`].
pub async fn authenticate(
    runtime: &AuthRuntime,
    policy: &AccessPolicy,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    if policy.public {
        // Public routes still get tenant resolution so handlers can be
        // tenant-aware, but identity stays unset
        let tenant_id = runtime.tenant_resolver.resolve_tenant_id(headers, None).await?;
        context::set_tenant_id(tenant_id)?;
        return Ok(());
    }

    let Some(token) = extract_bearer_token(headers) else {
        tracing::info!("No access token found for the request, it will be rejected with 401");
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let payload = runtime.codec.verify_access_token(&token)?;

    let tenant_id = runtime
        .tenant_resolver
        .resolve_tenant_id(headers, Some(&payload))
        .await?;

    if let Some(tenant_id) = &tenant_id {
        runtime
            .tenant_resolver
            .verify_user_belongs_to_tenant(tenant_id, &payload)
            .await?;
    }

    context::set_authenticated(payload, token, tenant_id)?;

    Ok(())
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
