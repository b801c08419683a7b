// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::token::TokenError;
use crate::error::ErrorBody;
use crate::models::AuthProvider;

/// Authentication error type.
///
/// Every variant ends in a per-request error response; none is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token supplied for a protected route
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token failed the shape check or could not be decoded
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token is well-formed but not acceptable (issuer, type or subject)
    InvalidToken,
    /// Token subject does not name a known identity
    UserNotFound,
    /// Email/password pair did not match
    InvalidCredentials,
    /// Password login attempted on an identity owned by a third-party provider
    ProviderMismatch(AuthProvider),
    /// OAuth2 login failed; the message is safe to show to the user
    OAuth2Authentication(String),
    /// Collaborator failure; the detail is logged, never returned
    InternalError(String),
    /// Insufficient permissions
    InsufficientPermissions,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::ProviderMismatch(_) => "provider_mismatch",
            AuthError::OAuth2Authentication(_) => "oauth2_authentication_failed",
            AuthError::InternalError(_) => "internal_error",
            AuthError::InsufficientPermissions => "insufficient_permissions",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::ProviderMismatch(_)
            | AuthError::OAuth2Authentication(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Full authentication is required to access this resource"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidToken => write!(f, "Token is not valid for this server"),
            AuthError::UserNotFound => write!(f, "Token subject is not a registered user"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::ProviderMismatch(provider) => write!(
                f,
                "Looks like you're signed up with {provider}. Please use your {provider} account to login."
            ),
            AuthError::OAuth2Authentication(msg) => write!(f, "{msg}"),
            AuthError::InternalError(_) => write!(f, "Authentication service is temporarily unavailable"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::InvalidIssuer | TokenError::WrongType | TokenError::SubjectMismatch => {
                AuthError::InvalidToken
            }
            TokenError::Signing(msg) => AuthError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody::new(status, self.error_code(), self.to_string()));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["status"], 401);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["code"], "missing_auth_header");
        assert!(body["message"].is_string());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn insufficient_permissions_returns_403() {
        let response = AuthError::InsufficientPermissions.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let response = AuthError::InternalError("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!body.contains("disk on fire"));
    }

    #[test]
    fn provider_mismatch_names_the_provider() {
        let message = AuthError::ProviderMismatch(AuthProvider::Google).to_string();
        assert!(message.contains("GOOGLE"));
    }

    #[test]
    fn token_errors_map_to_categories() {
        assert_eq!(AuthError::from(TokenError::Expired), AuthError::TokenExpired);
        assert_eq!(AuthError::from(TokenError::Malformed), AuthError::MalformedToken);
        assert_eq!(
            AuthError::from(TokenError::SubjectMismatch),
            AuthError::InvalidToken
        );
    }
}
