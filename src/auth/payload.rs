use serde::{Deserialize, Serialize};

/// Access token payload. Wire format is camelCase to stay compatible with
/// tokens issued by the platform's other services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenPayload {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
    /// Set when the token is scoped to a single tenant; authoritative under
    /// token-payload tenant resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Memberships for multi-tenant users; consulted by header-based tenant
    /// resolution and the token-embedded role check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenants: Option<Vec<TenantMembership>>,
    /// Flat permission grants embedded at issuance time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl AccessTokenPayload {
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
            iat: 0,
            exp: 0,
            tenant_id: None,
            tenants: None,
            permissions: None,
        }
    }

    /// Membership entry for the given tenant, if any.
    pub fn membership(&self, tenant_id: &str) -> Option<&TenantMembership> {
        self.tenants
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|m| m.tenant_id == tenant_id)
    }
}

/// Refresh token payload - identity only, no tenant or role data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenPayload {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
}

impl RefreshTokenPayload {
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
            iat: 0,
            exp: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMembership {
    pub tenant_id: String,
    pub roles: Vec<RoleAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub role_id: String,
    /// Comparand for role-based checks; assignments without a type never match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
}

impl RoleAssignment {
    pub fn typed(role_id: impl Into<String>, role_type: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            role_type: Some(role_type.into()),
        }
    }
}
