//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use engine_core::{AuthErrorCode, Error};

use crate::response::ApiError;
use crate::state::{AdminIdentity, AppState};

/// Role gate for dashboard read endpoints.
///
/// Accepts `Authorization: Bearer <token>` or `X-Admin-Token`. Ingestion
/// endpoints never use this extractor; they stay open to visitor traffic.
#[derive(Debug, Clone)]
pub struct AdminGate {
    pub admin: AdminIdentity,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminGate {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        let header_token = parts.headers.get("X-Admin-Token").and_then(|h| h.to_str().ok());

        let token = bearer.or(header_token).map(str::trim).ok_or_else(|| {
            ApiError::from(Error::auth(
                AuthErrorCode::MissingToken,
                "Admin token is required",
            ))
        })?;

        let admin = state.role_client.verify_admin_token(token).await?;
        Ok(AdminGate { admin })
    }
}
