//! Bearer JWT authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::core::config::AuthConfig;
use crate::core::shared::state::AppState;
use crate::meeting_requests::error::MeetingRequestsError;

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|auth| {
            if auth.len() > 7 && auth[..7].eq_ignore_ascii_case("bearer ") {
                Some(auth[7..].trim().to_string())
            } else {
                None
            }
        })
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Single-role tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    /// Acting identity written to audit rows: email when present.
    pub fn identity(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.subject)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        let mut roles = claims.roles;
        if let Some(role) = claims.role {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self {
            subject: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            name: claims.name,
            roles,
        }
    }
}

pub fn encode_token(config: &AuthConfig, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn decode_token(config: &AuthConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    if let Some(ref issuer) = config.issuer {
        validation.set_issuer(&[issuer]);
    }
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = MeetingRequestsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            MeetingRequestsError::Unauthorized("No authentication token".to_string())
        })?;

        let claims = decode_token(&state.auth, &token).map_err(|e| {
            debug!("Rejected bearer token: {e}");
            MeetingRequestsError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(claims.into())
    }
}
