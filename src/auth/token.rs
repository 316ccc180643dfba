use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::payload::{AccessTokenPayload, RefreshTokenPayload};
use crate::config::AuthConfig;
use crate::error::ApiError;

/// Issued tokens above this size risk breaking downstream HTTP
/// infrastructure (proxies, cookie limits), so we flag them loudly.
const TOKEN_SIZE_WARN_BYTES: usize = 7168;

/// Signs and verifies access/refresh tokens. The only component that
/// touches the signing secrets.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    access_expiration_secs: u64,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    refresh_expiration_secs: u64,
}

/// An access/refresh pair issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenCodec {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_expiration_secs: config.access_token_expiration_secs,
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_expiration_secs: config.refresh_token_expiration_secs,
        }
    }

    /// Sign an access token, stamping `iat` and `exp`.
    pub fn sign_access_token(&self, payload: &AccessTokenPayload) -> Result<String, ApiError> {
        let mut claims = payload.clone();
        let now = Utc::now().timestamp();
        claims.iat = now;
        claims.exp = now + self.access_expiration_secs as i64;

        let token = encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| sign_error("access", e))?;
        check_token_length(&token);
        Ok(token)
    }

    /// Sign a refresh token, stamping `iat` and `exp`.
    pub fn sign_refresh_token(&self, payload: &RefreshTokenPayload) -> Result<String, ApiError> {
        let mut claims = payload.clone();
        let now = Utc::now().timestamp();
        claims.iat = now;
        claims.exp = now + self.refresh_expiration_secs as i64;

        let token = encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| sign_error("refresh", e))?;
        check_token_length(&token);
        Ok(token)
    }

    /// Issue an access/refresh pair for the same identity.
    pub fn sign_tokens(
        &self,
        access_payload: &AccessTokenPayload,
        refresh_payload: &RefreshTokenPayload,
    ) -> Result<TokenPair, ApiError> {
        tracing::info!("Generating tokens for user: {}", access_payload.email);

        Ok(TokenPair {
            access_token: self.sign_access_token(access_payload)?,
            refresh_token: self.sign_refresh_token(refresh_payload)?,
        })
    }

    /// Verify an access token's signature and expiry.
    ///
    /// Any failure (bad signature, expired, malformed) surfaces as a plain
    /// 401 without the underlying cryptographic detail.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenPayload, ApiError> {
        decode::<AccessTokenPayload>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
    }

    /// Verify a refresh token's signature and expiry.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshTokenPayload, ApiError> {
        decode::<RefreshTokenPayload>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
    }
}

fn sign_error(kind: &str, err: jsonwebtoken::errors::Error) -> ApiError {
    tracing::error!("Failed to sign {} token: {}", kind, err);
    ApiError::internal_server_error("Token generation failed")
}

fn check_token_length(token: &str) {
    if token.len() > TOKEN_SIZE_WARN_BYTES {
        tracing::warn!(
            "Issued token is larger than 7KiB ({} bytes), oversized tokens may be rejected by proxies",
            token.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::payload::{RoleAssignment, TenantMembership};
    use crate::config::AppConfig;

    fn codec() -> TokenCodec {
        TokenCodec::from_config(&AppConfig::from_env().auth)
    }

    #[test]
    fn access_token_round_trip() {
        let codec = codec();
        let mut payload = AccessTokenPayload::new("user-1", "user@example.com");
        payload.tenants = Some(vec![TenantMembership {
            tenant_id: "tenant-1".to_string(),
            roles: vec![RoleAssignment::typed("role-1", "ADMIN")],
        }]);
        payload.permissions = Some(vec!["articles.read".to_string()]);

        let token = codec.sign_access_token(&payload).unwrap();
        let verified = codec.verify_access_token(&token).unwrap();

        assert_eq!(verified.sub, payload.sub);
        assert_eq!(verified.email, payload.email);
        assert_eq!(verified.tenants, payload.tenants);
        assert_eq!(verified.permissions, payload.permissions);
        assert!(verified.iat > 0);
        assert!(verified.exp > Utc::now().timestamp());
    }

    #[test]
    fn refresh_token_round_trip() {
        let codec = codec();
        let payload = RefreshTokenPayload::new("user-1", "user@example.com");

        let token = codec.sign_refresh_token(&payload).unwrap();
        let verified = codec.verify_refresh_token(&token).unwrap();

        assert_eq!(verified.sub, "user-1");
        assert!(verified.exp > verified.iat);
    }

    #[test]
    fn access_token_does_not_verify_as_refresh() {
        let codec = codec();
        let token = codec
            .sign_access_token(&AccessTokenPayload::new("user-1", "user@example.com"))
            .unwrap();

        // Different secret, so the signature must not check out
        assert!(codec.verify_refresh_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        let err = codec().verify_access_token("not.a.jwt").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let config = AppConfig::from_env().auth;
        let codec = TokenCodec::from_config(&config);

        // Hand-craft a token whose exp is past the default validation leeway
        let mut claims = AccessTokenPayload::new("user-1", "user@example.com");
        let now = Utc::now().timestamp();
        claims.iat = now - 600;
        claims.exp = now - 300;
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_token_secret.as_bytes()),
        )
        .unwrap();

        let err = codec.verify_access_token(&token).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }
}
