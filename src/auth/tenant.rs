use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::auth::payload::AccessTokenPayload;
use crate::error::ApiError;

/// Derives the acting tenant for a request and verifies the caller actually
/// belongs to it. Strategy is fixed at startup by deployment configuration.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Resolve the tenant id for this request. `payload` is absent for
    /// unauthenticated (public-route) requests.
    async fn resolve_tenant_id(
        &self,
        headers: &HeaderMap,
        payload: Option<&AccessTokenPayload>,
    ) -> Result<Option<String>, ApiError>;

    /// Verify the authenticated caller belongs to `tenant_id`. Strategies
    /// may reject with an error instead of returning false.
    async fn verify_user_belongs_to_tenant(
        &self,
        tenant_id: &str,
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError>;
}

/// Reads the tenant id from a request header and checks it against the
/// token's membership list.
pub struct HeaderTenantResolver {
    header_name: String,
}

impl HeaderTenantResolver {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

#[async_trait]
impl TenantResolver for HeaderTenantResolver {
    async fn resolve_tenant_id(
        &self,
        headers: &HeaderMap,
        _payload: Option<&AccessTokenPayload>,
    ) -> Result<Option<String>, ApiError> {
        Ok(headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()))
    }

    async fn verify_user_belongs_to_tenant(
        &self,
        tenant_id: &str,
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError> {
        if payload.membership(tenant_id).is_some() {
            return Ok(true);
        }

        tracing::error!(
            tenant_id = %tenant_id,
            user_id = %payload.sub,
            "Cross tenant request detected, that is suspicious and worth investigating"
        );
        Err(ApiError::forbidden("Access to this tenant is denied"))
    }
}

/// Reads the tenant id from the verified token payload. Membership is
/// trivially true since the issuer already vouched for the value.
pub struct TokenTenantResolver;

#[async_trait]
impl TenantResolver for TokenTenantResolver {
    async fn resolve_tenant_id(
        &self,
        _headers: &HeaderMap,
        payload: Option<&AccessTokenPayload>,
    ) -> Result<Option<String>, ApiError> {
        // No payload means an unauthenticated caller, nothing to resolve
        let Some(payload) = payload else {
            return Ok(None);
        };

        match &payload.tenant_id {
            Some(tenant_id) => Ok(Some(tenant_id.clone())),
            None => {
                tracing::error!(
                    user_id = %payload.sub,
                    "Configured for token payload tenant resolution, but the token has no tenant id, most likely a misconfiguration"
                );
                Err(ApiError::internal_server_error(
                    "Tenant resolution is misconfigured",
                ))
            }
        }
    }

    async fn verify_user_belongs_to_tenant(
        &self,
        _tenant_id: &str,
        _payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::payload::{RoleAssignment, TenantMembership};

    fn payload_with_membership(tenant_id: &str) -> AccessTokenPayload {
        let mut payload = AccessTokenPayload::new("user-1", "user@example.com");
        payload.tenants = Some(vec![TenantMembership {
            tenant_id: tenant_id.to_string(),
            roles: vec![RoleAssignment::typed("role-1", "ADMIN")],
        }]);
        payload
    }

    #[tokio::test]
    async fn header_resolver_reads_configured_header() {
        let resolver = HeaderTenantResolver::new("x-tenant-id");
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", "tenant-9".parse().unwrap());

        let resolved = resolver.resolve_tenant_id(&headers, None).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("tenant-9"));

        let resolved = resolver
            .resolve_tenant_id(&HeaderMap::new(), None)
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn header_resolver_rejects_non_member() {
        let resolver = HeaderTenantResolver::new("x-tenant-id");
        let payload = payload_with_membership("tenant-1");

        assert!(resolver
            .verify_user_belongs_to_tenant("tenant-1", &payload)
            .await
            .unwrap());

        let err = resolver
            .verify_user_belongs_to_tenant("tenant-2", &payload)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn token_resolver_requires_tenant_in_payload() {
        let resolver = TokenTenantResolver;
        let mut payload = AccessTokenPayload::new("user-1", "user@example.com");

        // Authenticated payload without a tenant id is a deployment bug
        let err = resolver
            .resolve_tenant_id(&HeaderMap::new(), Some(&payload))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);

        payload.tenant_id = Some("tenant-5".to_string());
        let resolved = resolver
            .resolve_tenant_id(&HeaderMap::new(), Some(&payload))
            .await
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("tenant-5"));

        // Unauthenticated caller resolves to no tenant
        let resolved = resolver
            .resolve_tenant_id(&HeaderMap::new(), None)
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }
}
