use axum::{http::HeaderMap, response::Json};
use serde_json::{json, Value};

use crate::auth::{self, AccessTokenPayload, RefreshTokenPayload};
use crate::context;
use crate::error::ApiError;
use crate::middleware::auth_gate::extract_bearer_token;

/// POST /auth/refresh - exchange a valid refresh token for a new pair.
///
/// The refresh token arrives as the bearer credential. The re-issued access
/// token carries identity only; tenant memberships and roles are
/// re-established at login, not silently carried across refreshes.
pub async fn refresh(headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let runtime = auth::runtime();

    let token = extract_bearer_token(&headers).ok_or_else(|| {
        tracing::info!("No refresh token found for the request, it will be rejected with 401");
        ApiError::unauthorized("Missing bearer token")
    })?;

    let refresh_payload = runtime.codec.verify_refresh_token(&token)?;

    let access_payload =
        AccessTokenPayload::new(refresh_payload.sub.clone(), refresh_payload.email.clone());
    let new_refresh = RefreshTokenPayload::new(refresh_payload.sub, refresh_payload.email);

    let pair = runtime.codec.sign_tokens(&access_payload, &new_refresh)?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "accessToken": pair.access_token,
            "refreshToken": pair.refresh_token,
        }
    })))
}

/// GET /api/whoami - echo the authenticated request context.
pub async fn whoami() -> Result<Json<Value>, ApiError> {
    let ctx = context::get()?;
    let email = ctx.jwt_payload.as_ref().map(|p| p.email.clone());

    Ok(Json(json!({
        "success": true,
        "data": {
            "requestId": ctx.request_id,
            "userId": ctx.user_id,
            "tenantId": ctx.tenant_id,
            "email": email,
        }
    })))
}
