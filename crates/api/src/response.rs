//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Success response for interaction ingestion.
///
/// `received` counts persisted events; `filtered` counts admin/self-traffic
/// dropped as a soft success ("not tracked", never an error).
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub received: usize,
    pub filtered: usize,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl IngestResponse {
    pub fn success(received: usize, filtered: usize) -> Self {
        Self {
            success: true,
            received,
            filtered,
            timestamp: chrono::Utc::now().timestamp_millis(),
            tracked: None,
            errors: None,
        }
    }

    pub fn partial(received: usize, filtered: usize, errors: Vec<String>) -> Self {
        Self {
            errors: if errors.is_empty() { None } else { Some(errors) },
            ..Self::success(received, filtered)
        }
    }

    /// Single-event variant carrying the tracked flag.
    pub fn single(tracked: bool) -> Self {
        Self {
            tracked: Some(tracked),
            ..Self::success(usize::from(tracked), usize::from(!tracked))
        }
    }
}

/// Success response for session chunk uploads.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub success: bool,
    pub session_id: String,
    /// Chunks held for this session after the upload; 0 when not tracked.
    pub chunk_count: u64,
    pub tracked: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_healthy: bool,
    pub relay_connections: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with coded families.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "QUERY_404", msg)
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(msg, "RATE_001"),
            retry_after,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "STORE_001", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
            retry_after: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        // Add Retry-After header for rate limit responses
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<engine_core::Error> for ApiError {
    fn from(err: engine_core::Error) -> Self {
        match &err {
            engine_core::Error::Auth {
                code,
                message,
                http_status,
            } => {
                let status =
                    StatusCode::from_u16(*http_status).unwrap_or(StatusCode::UNAUTHORIZED);
                ApiError::with_code(status, *code, message)
            }
            engine_core::Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(*code, vec![message.clone()])
            }
            engine_core::Error::Store { code, message, .. } => {
                ApiError::with_code(StatusCode::INTERNAL_SERVER_ERROR, *code, message)
            }
            engine_core::Error::RateLimit {
                message,
                retry_after,
                ..
            } => ApiError::rate_limited(message, *retry_after),
            engine_core::Error::Query {
                code,
                message,
                http_status,
            } => {
                let status =
                    StatusCode::from_u16(*http_status).unwrap_or(StatusCode::GATEWAY_TIMEOUT);
                ApiError::with_code(status, *code, message)
            }
            engine_core::Error::Validation(msg) => ApiError::bad_request(msg),
            engine_core::Error::MissingField(field) => {
                ApiError::bad_request(format!("missing required field: {}", field))
            }
            engine_core::Error::InvalidPattern(pattern) => {
                ApiError::bad_request(format!("invalid url pattern: {}", pattern))
            }
            engine_core::Error::NotFound(msg) => ApiError::not_found(msg),
            _ => ApiError::internal(err.to_string()),
        }
    }
}
