use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::payload::AccessTokenPayload;
use crate::auth::{self, AccessPolicy, AuthRuntime};
use crate::context;
use crate::error::ApiError;

/// Second guard: evaluates the route's declared role/permission
/// requirements against the authenticated identity. Runs strictly after
/// [`super::auth_gate::auth_gate`].
pub async fn access_gate(request: Request, next: Next) -> Result<Response, ApiError> {
    let policy = request
        .extensions()
        .get::<AccessPolicy>()
        .cloned()
        .unwrap_or_default();

    authorize(auth::runtime(), &policy).await?;

    Ok(next.run(request).await)
}

/// Requirement evaluation, short-circuiting on the first success:
/// roles embedded in the token (no lookup), then the pluggable role
/// evaluator, then the pluggable permission evaluator.
pub async fn authorize(runtime: &AuthRuntime, policy: &AccessPolicy) -> Result<(), ApiError> {
    // No declared requirements: authentication alone is enough
    if policy.requires_only_authentication() {
        return Ok(());
    }

    let ctx = context::get()?;

    let Some(payload) = ctx.jwt_payload else {
        tracing::error!(
            "Seems like a developer mistake: the route skips authentication but declares \
             role or permission requirements. Check the route's AccessPolicy"
        );
        return Err(ApiError::internal_server_error(
            "Route access requirements are misconfigured",
        ));
    };

    let roles = policy.required_roles();

    if token_roles_match(&payload, roles, ctx.tenant_id.as_deref()) {
        return Ok(());
    }

    if let (Some(requirement), Some(evaluator)) = (&policy.roles, &runtime.role_evaluator) {
        if !requirement.values.is_empty()
            && evaluator
                .check_roles(requirement.mode, &payload, &requirement.values)
                .await?
        {
            return Ok(());
        }
    }

    if let (Some(requirement), Some(evaluator)) = (&policy.permissions, &runtime.permission_evaluator)
    {
        if !requirement.values.is_empty()
            && evaluator
                .check_permissions(requirement.mode, &payload, &requirement.values)
                .await?
        {
            return Ok(());
        }
    }

    Err(ApiError::forbidden("Insufficient permissions"))
}

/// Cheapest path: roles embedded directly in the token for the resolved
/// tenant, no external lookup. One matching role is enough here; stricter
/// modes are handled by the evaluators.
fn token_roles_match(
    payload: &AccessTokenPayload,
    acceptable_roles: &[String],
    tenant_id: Option<&str>,
) -> bool {
    if acceptable_roles.is_empty() {
        return false;
    }

    let Some(tenant_id) = tenant_id else {
        return false;
    };

    let Some(membership) = payload.membership(tenant_id) else {
        return false;
    };

    membership.roles.iter().any(|role| {
        role.role_type
            .as_ref()
            .is_some_and(|role_type| acceptable_roles.contains(role_type))
    })
}
