//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `JwtVerifier` - HS256 token verification against the shared signing secret
//! - `auth_middleware` - Layer that validates Bearer tokens and injects the church into extensions
//! - `RequireChurch` - Extractor that requires an authenticated church
//!
//! # Architecture
//!
//! Tokens are minted by the platform's identity service; this service only
//! verifies them. The claims carry the tenant church id, which is all the
//! billing endpoints need.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedChurch into extensions
//!                                      ↓
//!                              Handler → RequireChurch extractor reads from extensions
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::foundation::ChurchId;

/// Tenant identity extracted from a verified token.
#[derive(Debug, Clone)]
pub struct AuthenticatedChurch {
    pub church_id: ChurchId,
}

/// Errors from token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
}

/// JWT claims expected on billing requests.
///
/// Wire keys are camelCase to match the identity service's token format.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject (user id). Not used by billing, but always present.
    sub: String,
    /// Tenant church the subject belongs to.
    #[serde(rename = "churchId")]
    church_id: Uuid,
    /// Expiry as unix seconds.
    exp: usize,
}

/// Verifies HS256 bearer tokens issued by the identity service.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and extract the church identity.
    ///
    /// # Errors
    ///
    /// - `TokenExpired` if the token's `exp` has passed
    /// - `InvalidToken` for any other verification failure
    pub fn verify(&self, token: &str) -> Result<AuthenticatedChurch, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        Ok(AuthenticatedChurch {
            church_id: ChurchId::from_uuid(data.claims.church_id),
        })
    }
}

/// Auth middleware state - wraps the token verifier.
pub type AuthState = Arc<JwtVerifier>;

/// Authentication middleware that validates Bearer tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Verifies the token with the `JwtVerifier`
/// 3. On success, injects `AuthenticatedChurch` into request extensions
/// 4. On missing token, continues without injecting (webhook routes carry
///    no token; they are verified by signature instead)
/// 5. On invalid token, returns 401 Unauthorized
///
/// # Token Extraction
///
/// Expects the token in the `Authorization` header with `Bearer` prefix:
/// ```text
/// Authorization: Bearer <token>
/// ```
pub async fn auth_middleware(
    State(verifier): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Bearer token from Authorization header
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) => match verifier.verify(token) {
            Ok(church) => {
                request.extensions_mut().insert(church);
                next.run(request).await
            }
            Err(e) => {
                let message = match &e {
                    AuthError::TokenExpired => "Token expired",
                    AuthError::InvalidToken => "Invalid token",
                };

                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({
                        "error": message,
                        "code": "AUTH_ERROR"
                    })),
                )
                    .into_response()
            }
        },
        None => {
            // No token provided - continue without auth
            // Handlers can use RequireChurch to enforce authentication
            next.run(request).await
        }
    }
}

/// Extractor that requires an authenticated church.
///
/// Use this extractor in handlers that act on behalf of a tenant.
/// If no church is in the request extensions (i.e., auth middleware didn't
/// successfully validate a token), returns 401 Unauthorized.
///
/// # Example
///
/// ```ignore
/// async fn my_handler(RequireChurch(church): RequireChurch) -> impl IntoResponse {
///     format!("church: {}", church.church_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireChurch(pub AuthenticatedChurch);

impl<S> axum::extract::FromRequestParts<S> for RequireChurch
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedChurch>()
                .cloned()
                .map(RequireChurch)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No valid authentication token was provided.
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": "UNAUTHENTICATED"
            })),
        )
            .into_response()
    }
}
