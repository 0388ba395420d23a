//! Bearer token authentication

use super::types::GatewayError;
use super::AppState;
use crate::exchange::Credentials;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Caller resolved from the `Authorization` header, with exchange keys
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub credentials: Credentials,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(GatewayError::MissingToken)?;

        let id = state
            .sessions
            .user_for_token(token)
            .await
            .map_err(GatewayError::Identity)?
            .ok_or(GatewayError::UnknownToken)?;

        let credentials = state
            .keys
            .user_api_keys(id)
            .await
            .map_err(GatewayError::Identity)?;

        Ok(Self { id, credentials })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
