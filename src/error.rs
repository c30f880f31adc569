// HTTP API Error Types
use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::oauth::OAuthError;
use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::services::map_store::MapError;
use crate::validation::FieldError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (identity provider issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            response["field_errors"] = json!(field_errors);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
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

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert domain errors to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::Unavailable(msg) => {
                tracing::warn!("Database unavailable: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Corrupt(flatten_err) => {
                tracing::error!("Stored account row is inconsistent: {}", flatten_err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Invalid database URL");
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(err.field.clone(), err.reason.clone());
        ApiError::validation_error(err.to_string(), Some(field_errors))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hashing(msg) | AuthError::Signing(msg) => {
                tracing::error!("Credential processing failed: {}", msg);
                ApiError::internal_server_error("Failed to process credentials")
            }
            other => {
                tracing::debug!("Authentication rejected: {}", other);
                ApiError::unauthorized(other.to_string())
            }
        }
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Disabled => ApiError::service_unavailable(err.to_string()),
            OAuthError::InvalidState => ApiError::bad_request(err.to_string()),
            other => {
                tracing::warn!("OAuth provider failure: {}", other);
                ApiError::bad_gateway(other.to_string())
            }
        }
    }
}

impl From<MapError> for ApiError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::UnsupportedExtension(_) | MapError::InvalidSchoolId(_) => ApiError::bad_request(err.to_string()),
            MapError::TooLarge { .. } => ApiError::payload_too_large(err.to_string()),
            MapError::NotFound(_) => ApiError::not_found(err.to_string()),
            MapError::Io(io_err) => {
                tracing::error!("Map storage error: {}", io_err);
                ApiError::internal_server_error("Failed to access map storage")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
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
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_failure_envelope() {
        let body = ApiError::not_found("Account missing").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "Account missing");
        assert!(body.get("field_errors").is_none());
    }

    #[test]
    fn field_errors_surface_the_offending_field() {
        let err = ApiError::from(FieldError::new("grade", "must be greater than 0"));
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["grade"], "must be greater than 0");
    }

    #[test]
    fn storage_errors_map_to_status_codes() {
        assert_eq!(ApiError::from(DatabaseError::NotFound("x".into())).status_code(), 404);
        assert_eq!(ApiError::from(DatabaseError::Conflict("dup".into())).status_code(), 409);
        assert_eq!(ApiError::from(DatabaseError::Unavailable("pool".into())).status_code(), 503);

        let internal = ApiError::from(DatabaseError::Sqlx(sqlx::Error::Protocol("secret detail".into())));
        assert_eq!(internal.status_code(), 500);
        assert!(!internal.message().contains("secret detail"));
    }

    #[test]
    fn auth_errors_are_unauthorized_except_internal_failures() {
        assert_eq!(ApiError::from(AuthError::Expired).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::InvalidCredentials).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::AlgorithmMismatch).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::Hashing("boom".into())).status_code(), 500);
    }

    #[test]
    fn oauth_and_map_errors() {
        assert_eq!(ApiError::from(OAuthError::Disabled).status_code(), 503);
        assert_eq!(ApiError::from(OAuthError::InvalidState).status_code(), 400);
        assert_eq!(ApiError::from(OAuthError::MissingEmail).status_code(), 502);
        assert_eq!(ApiError::from(MapError::UnsupportedExtension("gif".into())).status_code(), 400);
        assert_eq!(ApiError::from(MapError::TooLarge { limit: 10 }).status_code(), 413);
    }
}
