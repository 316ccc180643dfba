use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::payload::AccessTokenPayload;
use crate::error::ApiError;

/// Whether one matching item is enough or every item must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckMode {
    Any,
    Each,
    /// A mode we don't know how to evaluate, tolerated during
    /// deserialization so it can be rejected with a clear 500 instead of a
    /// parse error at the edge.
    #[serde(other)]
    Unknown,
}

/// Pluggable permission check strategy.
#[async_trait]
pub trait PermissionEvaluator: Send + Sync {
    /// True when the identity holds every listed permission.
    async fn has_each(
        &self,
        permissions: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError>;

    /// True when the identity holds at least one listed permission.
    async fn has_any(
        &self,
        permissions: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError>;

    /// Mode dispatch. An empty requirement list is a caller bug: it logs at
    /// error level and evaluates to false, never vacuously true.
    async fn check_permissions(
        &self,
        mode: CheckMode,
        payload: &AccessTokenPayload,
        permissions: &[String],
    ) -> Result<bool, ApiError> {
        if permissions.is_empty() {
            tracing::error!(
                "Permission evaluation invoked with an empty requirement list, this is a caller bug"
            );
            return Ok(false);
        }

        match mode {
            CheckMode::Any => self.has_any(permissions, payload).await,
            CheckMode::Each => self.has_each(permissions, payload).await,
            CheckMode::Unknown => {
                tracing::error!(
                    "Unknown permission check mode. Seems like someone added a new mode but forgot to wire it"
                );
                Err(ApiError::internal_server_error(
                    "Unsupported permission check mode",
                ))
            }
        }
    }
}

/// Pluggable role check strategy.
#[async_trait]
pub trait RoleEvaluator: Send + Sync {
    async fn has_each(
        &self,
        roles: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError>;

    async fn has_any(
        &self,
        roles: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError>;

    /// Mode dispatch with the same empty-list and unknown-mode handling as
    /// permission checks.
    async fn check_roles(
        &self,
        mode: CheckMode,
        payload: &AccessTokenPayload,
        roles: &[String],
    ) -> Result<bool, ApiError> {
        if roles.is_empty() {
            tracing::error!(
                "Role evaluation invoked with an empty requirement list, this is a caller bug"
            );
            return Ok(false);
        }

        match mode {
            CheckMode::Any => self.has_any(roles, payload).await,
            CheckMode::Each => self.has_each(roles, payload).await,
            CheckMode::Unknown => {
                tracing::error!(
                    "Unknown role check mode. Seems like someone added a new mode but forgot to wire it"
                );
                Err(ApiError::internal_server_error(
                    "Unsupported role check mode",
                ))
            }
        }
    }
}

/// Permission evaluator over the flat permission list embedded in the token.
pub struct TokenPermissionEvaluator;

impl TokenPermissionEvaluator {
    fn granted(payload: &AccessTokenPayload) -> HashSet<&str> {
        if payload.permissions.is_none() {
            tracing::warn!(
                user_id = %payload.sub,
                "Token has no permissions claim, this may be a misconfiguration"
            );
        }
        payload
            .permissions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect()
    }
}

#[async_trait]
impl PermissionEvaluator for TokenPermissionEvaluator {
    async fn has_each(
        &self,
        permissions: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError> {
        let granted = Self::granted(payload);
        Ok(permissions.iter().all(|p| granted.contains(p.as_str())))
    }

    async fn has_any(
        &self,
        permissions: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError> {
        let granted = Self::granted(payload);
        Ok(permissions.iter().any(|p| granted.contains(p.as_str())))
    }
}

/// Role evaluator over the membership roles embedded in the token, scoped
/// to the tenant resolved for the current request.
pub struct TokenRoleEvaluator;

impl TokenRoleEvaluator {
    fn held_roles(payload: &AccessTokenPayload) -> Result<HashSet<String>, ApiError> {
        let tenant_id = crate::context::tenant_id()?;

        let Some(tenant_id) = tenant_id else {
            return Ok(HashSet::new());
        };

        Ok(payload
            .membership(&tenant_id)
            .map(|m| {
                m.roles
                    .iter()
                    .filter_map(|r| r.role_type.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl RoleEvaluator for TokenRoleEvaluator {
    async fn has_each(
        &self,
        roles: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError> {
        let held = Self::held_roles(payload)?;
        Ok(roles.iter().all(|r| held.contains(r)))
    }

    async fn has_any(
        &self,
        roles: &[String],
        payload: &AccessTokenPayload,
    ) -> Result<bool, ApiError> {
        let held = Self::held_roles(payload)?;
        Ok(roles.iter().any(|r| held.contains(r)))
    }
}
