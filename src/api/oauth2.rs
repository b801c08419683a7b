// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 login endpoints.
//!
//! The callback never answers with an error body: the browser is always
//! sent back to the frontend, with `?token=` on success or `?error=` on
//! failure.

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderName,
    },
    response::Redirect,
};
use serde::Deserialize;
use url::Url;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::token::OAUTH2_STATE_TTL;
use crate::auth::{AuthError, OAuth2Provider};
use crate::error::ApiError;
use crate::state::AppState;

/// Cookie binding a login attempt to the browser that started it.
const STATE_COOKIE: &str = "oauth2_state_nonce";

type WithCookie = ([(HeaderName, String); 1], Redirect);

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Signed state issued by `/oauth2/authorize/{provider}`
    pub state: Option<String>,
    /// Set by the provider when the user denied consent
    pub error: Option<String>,
}

fn enabled_provider(state: &AppState, provider_id: &str) -> Result<OAuth2Provider, ApiError> {
    OAuth2Provider::from_registration_id(provider_id)
        .filter(|p| state.oauth2.settings().providers.contains_key(p))
        .ok_or_else(|| ApiError::not_found(format!("OAuth2 provider '{provider_id}' is not available")))
}

fn state_cookie(state: &AppState, value: &str, max_age: u64) -> String {
    let secure = if state.oauth2.settings().redirect_base_url.scheme() == "https" {
        "; Secure"
    } else {
        ""
    };
    format!("{STATE_COOKIE}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax{secure}")
}

/// Nonce from the login cookie, if the browser sent one.
fn cookie_nonce(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == STATE_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Frontend redirect carrying one query parameter.
fn frontend_redirect(target: &Url, key: &str, value: &str) -> Redirect {
    let mut url = target.clone();
    url.query_pairs_mut().append_pair(key, value);
    Redirect::to(url.as_str())
}

/// Start an OAuth2 login by redirecting to the provider.
#[utoipa::path(
    get,
    path = "/oauth2/authorize/{provider}",
    tag = "OAuth2",
    params(("provider" = String, Path, description = "google, github or facebook")),
    responses(
        (status = 303, description = "Redirect to the provider consent page; sets the login cookie"),
        (status = 404, description = "Provider not configured"),
    )
)]
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<WithCookie, ApiError> {
    let provider = enabled_provider(&state, &provider_id)?;
    let nonce = Uuid::new_v4().simple().to_string();
    let signed_state = state
        .tokens
        .issue_state(provider, &nonce)
        .map_err(AuthError::from)?;
    let url = state
        .oauth2
        .authorize_url(provider, &signed_state)
        .map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "Cannot build authorize URL");
            ApiError::internal("OAuth2 login is misconfigured")
        })?;
    let cookie = state_cookie(&state, &nonce, OAUTH2_STATE_TTL.as_secs());
    Ok(([(SET_COOKIE, cookie)], Redirect::to(url.as_str())))
}

/// Complete an OAuth2 login and hand the access token to the frontend.
#[utoipa::path(
    get,
    path = "/oauth2/callback/{provider}",
    tag = "OAuth2",
    params(
        ("provider" = String, Path, description = "google, github or facebook"),
        CallbackParams
    ),
    responses(
        (status = 303, description = "Redirect to the frontend with `token` or `error`"),
        (status = 404, description = "Provider not configured"),
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<WithCookie, ApiError> {
    let provider = enabled_provider(&state, &provider_id)?;
    let target = &state.oauth2.settings().success_redirect;
    let nonce = cookie_nonce(&headers);

    let redirect = match complete_login(&state, provider, params, nonce.as_deref()).await {
        Ok(token) => frontend_redirect(target, "token", &token),
        Err(e) => frontend_redirect(target, "error", &e.to_string()),
    };
    // The nonce is single-use
    Ok(([(SET_COOKIE, state_cookie(&state, "", 0))], redirect))
}

async fn complete_login(
    state: &AppState,
    provider: OAuth2Provider,
    params: CallbackParams,
    nonce: Option<&str>,
) -> Result<String, AuthError> {
    if let Some(error) = params.error {
        tracing::info!(provider = %provider, error = %error, "Provider denied OAuth2 login");
        return Err(AuthError::OAuth2Authentication(format!(
            "Login with {provider} was cancelled"
        )));
    }

    let valid_state = match (params.state.as_deref(), nonce) {
        (Some(signed), Some(nonce)) => state.tokens.verify_state(signed, provider, nonce),
        _ => false,
    };
    if !valid_state {
        tracing::warn!(provider = %provider, "OAuth2 callback with invalid state");
        return Err(AuthError::OAuth2Authentication(
            "Login session expired, please try again".to_string(),
        ));
    }

    let code = params.code.filter(|c| !c.is_empty()).ok_or_else(|| {
        AuthError::OAuth2Authentication("Authorization code missing".to_string())
    })?;

    let provider_failure = |e: crate::auth::oauth2_client::OAuth2ClientError| {
        tracing::warn!(provider = %provider, error = %e, "OAuth2 provider call failed");
        AuthError::OAuth2Authentication(format!("Could not complete login with {provider}"))
    };
    let access_token = state
        .oauth2
        .exchange_code(provider, &code)
        .await
        .map_err(provider_failure)?;
    let attributes = state
        .oauth2
        .fetch_attributes(provider, &access_token)
        .await
        .map_err(provider_failure)?;

    let principal = state
        .reconciler
        .authenticate_oauth2(provider.registration_id(), attributes)?;
    tracing::info!(identity_id = %principal.identity.id, provider = %provider, "OAuth2 login");

    Ok(state.tokens.issue_token(&principal.identity)?)
}
