// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware for Axum.
//!
//! Two layers run in front of every handler:
//!
//! 1. [`authenticate`] resolves the bearer token to an [`AuthenticatedUser`]
//!    and stores it in the request extensions. It never rejects: a failure
//!    is recorded as an [`AuthFailure`] extension and the request continues.
//! 2. [`authorize`] evaluates the [`AuthorizationPolicy`](super::AuthorizationPolicy)
//!    and turns a missing principal into 401 (using the recorded failure) or
//!    a missing authority into 403.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/projects", get(list_projects))
//!     .layer(from_fn_with_state(state.clone(), authorize))
//!     .layer(from_fn_with_state(state.clone(), authenticate));
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::policy::Decision;
use super::token::looks_like_jwt;
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Fallback header carrying a raw token.
pub const X_AUTH_TOKEN: &str = "x-auth-token";

/// Why the filter did not bind a principal.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub AuthError);

/// Extract the candidate token from the request headers.
///
/// `Authorization: Bearer <token>` is preferred; `X-Auth-Token` is used
/// when there is no usable bearer value. Returns `Ok(None)` when the
/// request carries no credentials at all.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let bearer = headers.get(AUTHORIZATION).map(|value| {
        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or(AuthError::InvalidAuthHeader)
    });

    if let Some(Ok(token)) = &bearer {
        return Ok(Some(token.clone()));
    }

    let fallback = headers
        .get(X_AUTH_TOKEN)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    match (fallback, bearer) {
        (Some(token), _) => Ok(Some(token)),
        (None, Some(Err(e))) => Err(e),
        (None, _) => Ok(None),
    }
}

/// Resolve a token to the principal it names.
fn resolve_principal(state: &AppState, token: &str) -> Result<AuthenticatedUser, AuthError> {
    if !looks_like_jwt(token) {
        return Err(AuthError::MalformedToken);
    }

    let subject = state.tokens.decode(token)?.sub;

    let identity = state
        .identities
        .find_identity_by_email(&subject)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    let claims = state.tokens.verify(token, &identity.email)?;
    Ok(AuthenticatedUser::new(identity, &claims))
}

/// Request authentication filter.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS || state.public_paths.is_public(request.uri().path()) {
        return next.run(request).await;
    }

    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return next.run(request).await;
    }

    let outcome = extract_token(request.headers()).and_then(|token| match token {
        Some(token) => resolve_principal(&state, &token).map(Some),
        None => Ok(None),
    });

    match outcome {
        Ok(Some(user)) => {
            tracing::debug!(identity_id = %user.identity.id, "Request authenticated");
            request.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(e) => {
            match &e {
                AuthError::InternalError(cause) => {
                    tracing::warn!(error = %cause, "Identity lookup failed during authentication")
                }
                other => tracing::debug!(
                    code = other.error_code(),
                    path = %request.uri().path(),
                    "Token rejected"
                ),
            }
            request.extensions_mut().insert(AuthFailure(e));
        }
    }

    next.run(request).await
}

/// Authorization layer enforcing the route policy.
pub async fn authorize(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let decision = state.policy.evaluate(
        request.method(),
        request.uri().path(),
        request.extensions().get::<AuthenticatedUser>(),
    );

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Unauthenticated => request
            .extensions()
            .get::<AuthFailure>()
            .map(|failure| failure.0.clone())
            .unwrap_or(AuthError::MissingAuthHeader)
            .into_response(),
        Decision::Forbidden => {
            tracing::debug!(path = %request.uri().path(), "Insufficient permissions");
            AuthError::InsufficientPermissions.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthProvider, Identity};
    use crate::storage::{IdentityStore, StorageError, StorageResult};
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use crate::auth::extractor::OptionalAuth;
    use crate::auth::TokenService;
    use crate::config::AuthSettings;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_is_preferred() {
        let map = headers(&[("authorization", "Bearer a.b.c"), ("x-auth-token", "x.y.z")]);
        assert_eq!(extract_token(&map).unwrap().as_deref(), Some("a.b.c"));
    }

    #[test]
    fn x_auth_token_is_a_fallback() {
        let map = headers(&[("x-auth-token", " x.y.z ")]);
        assert_eq!(extract_token(&map).unwrap().as_deref(), Some("x.y.z"));

        let map = headers(&[("authorization", "Basic Zm9vOmJhcg=="), ("x-auth-token", "x.y.z")]);
        assert_eq!(extract_token(&map).unwrap().as_deref(), Some("x.y.z"));
    }

    #[test]
    fn bad_authorization_header_is_reported() {
        for value in ["Bearer ", "Bearer    ", "Basic Zm9vOmJhcg==", "garbage"] {
            let map = headers(&[("authorization", value)]);
            assert_eq!(extract_token(&map), Err(AuthError::InvalidAuthHeader), "{value}");
        }
    }

    #[test]
    fn no_credentials_is_not_an_error() {
        assert_eq!(extract_token(&HeaderMap::new()), Ok(None));
    }

    async fn whoami(OptionalAuth(user): OptionalAuth) -> String {
        user.map(|u| u.identity.email).unwrap_or_default()
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/projects", get(whoami))
            .layer(from_fn_with_state(state.clone(), authorize))
            .layer(from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    async fn call(app: Router, header: Option<(&str, String)>, uri: &str) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    fn state_with_user() -> (AppState, String) {
        let state = AppState::default();
        let identity = state
            .identities
            .save_identity(Identity::local("alice@example.com", "hash".into(), "Alice"))
            .unwrap();
        let token = state.tokens.issue_token(&identity).unwrap();
        (state, token)
    }

    #[tokio::test]
    async fn valid_token_binds_principal() {
        let (state, token) = state_with_user();
        let (status, body) = call(
            app(state),
            Some(("authorization", format!("Bearer {token}"))),
            "/whoami",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice@example.com");
    }

    #[tokio::test]
    async fn x_auth_token_binds_principal() {
        let (state, token) = state_with_user();
        let (status, body) = call(app(state), Some(("x-auth-token", token)), "/whoami").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice@example.com");
    }

    #[tokio::test]
    async fn failures_surface_as_401_with_category() {
        let (state, _) = state_with_user();
        let alice = state
            .identities
            .find_identity_by_email("alice@example.com")
            .unwrap()
            .unwrap();
        let forged = TokenService::new(&AuthSettings::with_secret(
            "some-other-secret-that-is-long-enough",
        ))
        .issue_token(&alice)
        .unwrap();

        let cases = [
            (None, "missing_auth_header"),
            (Some("Bearer ".to_string()), "invalid_auth_header"),
            (Some("Bearer not-a-jwt".to_string()), "malformed_token"),
            (Some(format!("Bearer {forged}")), "invalid_signature"),
        ];

        for (header, code) in cases {
            let (status, body) = call(
                app(state.clone()),
                header.map(|h| ("authorization", h)),
                "/whoami",
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{code}");
            assert!(body.contains(code), "{code}: {body}");
        }
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_rejected() {
        let state = AppState::default();
        let ghost = Identity::local("ghost@example.com", "hash".into(), "Ghost");
        let token = state.tokens.issue_token(&ghost).unwrap();

        let (status, body) = call(
            app(state),
            Some(("authorization", format!("Bearer {token}"))),
            "/whoami",
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("user_not_found"));
    }

    #[tokio::test]
    async fn bad_token_on_public_route_is_ignored() {
        let (status, body) = call(
            app(AppState::default()),
            Some(("authorization", "Bearer garbage".to_string())),
            "/projects",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");
    }

    struct FailingStore;

    impl IdentityStore for FailingStore {
        fn find_identity_by_email(&self, _: &str) -> StorageResult<Option<Identity>> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
        fn find_identity_by_id(&self, _: &str) -> StorageResult<Option<Identity>> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
        fn find_identity_by_provider_id(
            &self,
            _: AuthProvider,
            _: &str,
        ) -> StorageResult<Option<Identity>> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
        fn save_identity(&self, _: Identity) -> StorageResult<Identity> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
        fn update_identity(
            &self,
            _: &str,
            _: &mut dyn FnMut(&mut Identity),
        ) -> StorageResult<Identity> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_is_an_internal_error() {
        let mut state = AppState::default();
        state.identities = Arc::new(FailingStore);
        let identity = Identity::local("alice@example.com", "hash".into(), "Alice");
        let token = state.tokens.issue_token(&identity).unwrap();

        let (status, body) = call(
            app(state),
            Some(("authorization", format!("Bearer {token}"))),
            "/whoami",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("internal_error"));
        assert!(!body.contains("disk on fire"));
    }
}
