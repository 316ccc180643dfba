use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// How the acting tenant is derived for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantResolution {
    /// Tenant id comes from a request header and is checked against the
    /// token's membership list.
    Header,
    /// Tenant id comes from the verified token payload itself.
    TokenPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub access_token_expiration_secs: u64,
    pub refresh_token_secret: String,
    pub refresh_token_expiration_secs: u64,
    pub tenant_header_name: String,
    pub tenant_resolution: TenantResolution,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = v;
        }
        if let Ok(v) = env::var("AUTH_ACCESS_TOKEN_EXPIRATION_SECS") {
            self.auth.access_token_expiration_secs =
                v.parse().unwrap_or(self.auth.access_token_expiration_secs);
        }
        if let Ok(v) = env::var("AUTH_REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = v;
        }
        if let Ok(v) = env::var("AUTH_REFRESH_TOKEN_EXPIRATION_SECS") {
            self.auth.refresh_token_expiration_secs =
                v.parse().unwrap_or(self.auth.refresh_token_expiration_secs);
        }
        if let Ok(v) = env::var("AUTH_TENANT_HEADER_NAME") {
            self.auth.tenant_header_name = v.to_lowercase();
        }
        if let Ok(v) = env::var("AUTH_TENANT_RESOLUTION") {
            self.auth.tenant_resolution = match v.as_str() {
                "token" | "token_payload" => TenantResolution::TokenPayload,
                _ => TenantResolution::Header,
            };
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            auth: AuthConfig {
                access_token_secret: "dev-access-token-secret".to_string(),
                access_token_expiration_secs: 15 * 60, // 15 minutes
                refresh_token_secret: "dev-refresh-token-secret".to_string(),
                refresh_token_expiration_secs: 14 * 24 * 60 * 60, // 2 weeks
                tenant_header_name: "x-tenant-id".to_string(),
                tenant_resolution: TenantResolution::Header,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            auth: AuthConfig {
                // Must be provided via AUTH_*_SECRET env vars
                access_token_secret: String::new(),
                access_token_expiration_secs: 15 * 60,
                refresh_token_secret: String::new(),
                refresh_token_expiration_secs: 14 * 24 * 60 * 60,
                tenant_header_name: "x-tenant-id".to_string(),
                tenant_resolution: TenantResolution::Header,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            auth: AuthConfig {
                access_token_secret: String::new(),
                access_token_expiration_secs: 5 * 60, // 5 minutes
                refresh_token_secret: String::new(),
                refresh_token_expiration_secs: 7 * 24 * 60 * 60, // 1 week
                tenant_header_name: "x-tenant-id".to_string(),
                tenant_resolution: TenantResolution::Header,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
