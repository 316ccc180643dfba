// HTTP API Error Types
use axum::{http::header::HeaderName, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Response header carrying the authoritative entity version on a 409,
/// so clients can re-fetch and retry with fresh data.
pub const CONTENT_VERSION_HEADER: &str = "x-content-version";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict - optimistic lock failures carry the persisted version
    Conflict {
        message: String,
        current_version: Option<i64>,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Conflict {
                message,
                current_version: Some(version),
            } => {
                json!({
                    "error": true,
                    "message": message,
                    "code": self.error_code(),
                    "current_version": version
                })
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn version_conflict(current_version: i64) -> Self {
        ApiError::Conflict {
            message: "Entity was modified concurrently, re-fetch and retry".to_string(),
            current_version: Some(current_version),
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::context::ContextError> for ApiError {
    fn from(err: crate::context::ContextError) -> Self {
        // Context access failures are always a wiring problem, not user input
        tracing::error!("Request context error: {}", err);
        ApiError::internal_server_error("Request context is not available")
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::ConfigMissing(_) => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            crate::database::manager::DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::database::record::RecordError> for ApiError {
    fn from(err: crate::database::record::RecordError) -> Self {
        match err {
            crate::database::record::RecordError::SystemColumnNotAllowed(column) => {
                ApiError::bad_request(format!("System column '{}' cannot be set via API", column))
            }
            crate::database::record::RecordError::NotAnObject => {
                ApiError::bad_request("Request body must be a JSON object")
            }
        }
    }
}

impl From<crate::database::repository::RepositoryError> for ApiError {
    fn from(err: crate::database::repository::RepositoryError) -> Self {
        use crate::database::repository::RepositoryError;
        match err {
            RepositoryError::MissingTenantContext => {
                tracing::error!("Tenant id missing from request context at the data-access boundary");
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            RepositoryError::VersionConflict { current_version } => {
                ApiError::version_conflict(current_version)
            }
            RepositoryError::NotFound => ApiError::not_found("Record not found"),
            RepositoryError::Record(e) => e.into(),
            RepositoryError::Context(e) => e.into(),
            RepositoryError::Query(msg) => {
                tracing::error!("Repository query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            RepositoryError::Sqlx(e) => {
                tracing::error!("SQLx error: {}", e);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json())).into_response();

        if let ApiError::Conflict {
            current_version: Some(version),
            ..
        } = &self
        {
            if let Ok(value) = version.to_string().parse() {
                response.headers_mut().insert(
                    HeaderName::from_static(CONTENT_VERSION_HEADER),
                    value,
                );
            }
        }

        response
    }
}
