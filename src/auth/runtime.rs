use std::sync::OnceLock;

use crate::auth::access::{
    PermissionEvaluator, RoleEvaluator, TokenPermissionEvaluator, TokenRoleEvaluator,
};
use crate::auth::tenant::{HeaderTenantResolver, TenantResolver, TokenTenantResolver};
use crate::auth::token::TokenCodec;
use crate::config::{self, TenantResolution};

/// Process-wide auth services, wired from configuration at startup.
/// Everything here is immutable after initialization and shared read-only
/// across all in-flight requests.
pub struct AuthRuntime {
    pub codec: TokenCodec,
    pub tenant_resolver: Box<dyn TenantResolver>,
    pub role_evaluator: Option<Box<dyn RoleEvaluator>>,
    pub permission_evaluator: Option<Box<dyn PermissionEvaluator>>,
}

impl AuthRuntime {
    pub fn from_config(config: &config::AppConfig) -> Self {
        let tenant_resolver: Box<dyn TenantResolver> = match config.auth.tenant_resolution {
            TenantResolution::Header => {
                Box::new(HeaderTenantResolver::new(config.auth.tenant_header_name.clone()))
            }
            TenantResolution::TokenPayload => Box::new(TokenTenantResolver),
        };

        Self {
            codec: TokenCodec::from_config(&config.auth),
            tenant_resolver,
            role_evaluator: Some(Box::new(TokenRoleEvaluator)),
            permission_evaluator: Some(Box::new(TokenPermissionEvaluator)),
        }
    }
}

static RUNTIME: OnceLock<AuthRuntime> = OnceLock::new();

/// The process-wide auth runtime, built from global config on first use.
pub fn runtime() -> &'static AuthRuntime {
    RUNTIME.get_or_init(|| AuthRuntime::from_config(config::config()))
}
