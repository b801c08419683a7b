// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential endpoints: registration, login and the current principal.

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{Auth, AuthError, PrincipalResponse};
use crate::error::ApiError;
use crate::models::{AuthResponse, Identity, LoginRequest, RegisterRequest};
use crate::state::AppState;

/// Issue an access token for an identity and wrap it in the login response.
pub(crate) fn auth_response(state: &AppState, identity: &Identity) -> Result<AuthResponse, ApiError> {
    let access_token = state.tokens.issue_token(identity).map_err(AuthError::from)?;
    Ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: i64::try_from(state.tokens.default_ttl().as_secs()).unwrap_or(i64::MAX),
        user: identity.into(),
    })
}

/// Run password hashing off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "credential task failed");
        ApiError::internal("Authentication service is temporarily unavailable")
    })
}

/// Register a new account with email and password.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid email, password or name"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let credentials = state.credentials.clone();
    let identity = blocking(move || credentials.register(request)).await??;
    Ok((StatusCode::CREATED, Json(auth_response(&state, &identity)?)))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials or account registered with a provider"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = state.credentials.clone();
    let identity =
        blocking(move || credentials.authenticate(&request.email, &request.password)).await??;
    tracing::info!(identity_id = %identity.id, "Password login");
    Ok(Json(auth_response(&state, &identity)?))
}

/// Get the current authenticated principal.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current principal", body = PrincipalResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn me(Auth(user): Auth) -> Json<PrincipalResponse> {
    Json((&user).into())
}
