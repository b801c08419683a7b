// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance and validation.
//!
//! Tokens are HS256 JWTs signed with the server secret. The service holds no
//! state beyond the secret, issuer and lifetime it was built with, so one
//! instance is shared read-only by every request.
//!
//! Validation fails closed: [`TokenService::validate`] and
//! [`TokenService::extract_claim`] turn every decode, signature or expiry
//! failure into `false`/`None`. Callers that need the failure category use
//! [`TokenService::verify`], which returns a [`TokenError`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::claims::{TokenClaims, ACCESS_TOKEN_TYPE, OAUTH2_STATE_TOKEN_TYPE, RESERVED_CLAIMS};
use super::oauth2::OAuth2Provider;
use crate::config::AuthSettings;
use crate::models::Identity;

/// Lifetime of OAuth2 `state` values.
pub const OAUTH2_STATE_TTL: Duration = Duration::from_secs(600);

/// Claim of a state token holding the browser-bound nonce.
const STATE_NONCE_CLAIM: &str = "nonce";

/// Upper bound on accepted token length.
pub const MAX_TOKEN_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token issuer is not accepted")]
    InvalidIssuer,

    #[error("token type is not accepted here")]
    WrongType,

    #[error("token subject does not match")]
    SubjectMismatch,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            _ => TokenError::Malformed,
        }
    }
}

/// Cheap structural check run before any cryptographic work.
///
/// Accepts exactly three non-empty base64url segments. This only filters
/// garbage early; it is not a security boundary.
pub fn looks_like_jwt(token: &str) -> bool {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return false;
    }

    let mut segments = 0;
    for segment in token.split('.') {
        segments += 1;
        if segment.is_empty()
            || !segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return false;
        }
    }
    segments == 3
}

/// Issues and validates signed tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    default_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: settings.issuer.clone(),
            default_ttl: settings.token_ttl,
        }
    }

    /// Configured access token lifetime.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue an access token for an identity with the configured lifetime.
    pub fn issue_token(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue(identity, Map::new(), self.default_ttl)
    }

    /// Issue an access token for an identity.
    ///
    /// Extra claims that collide with reserved claim names are dropped.
    pub fn issue(
        &self,
        identity: &Identity,
        extra_claims: Map<String, Value>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(identity, extra_claims, ttl, Utc::now())
    }

    /// Issue an access token as if the current time were `now`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        mut extra_claims: Map<String, Value>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        extra_claims.retain(|name, _| !RESERVED_CLAIMS.contains(&name.as_str()));

        let iat = now.timestamp();
        let claims = TokenClaims {
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            sub: identity.email.clone(),
            iat,
            exp: iat.saturating_add(ttl_secs(ttl)),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            roles: identity
                .role
                .authorities()
                .into_iter()
                .map(str::to_string)
                .collect(),
            user_id: Some(identity.id.clone()),
            extra: extra_claims,
        };

        self.sign(&claims)
    }

    /// Whether `token` is a valid access token for `expected_subject`.
    ///
    /// Never fails: every problem yields `false`.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        self.verify(token, expected_subject).is_ok()
    }

    /// Verify an access token against an expected subject.
    pub fn verify(&self, token: &str, expected_subject: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;
        if claims.sub != expected_subject {
            return Err(TokenError::SubjectMismatch);
        }
        Ok(claims)
    }

    /// Decode an access token, checking signature, issuer, expiry and type.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_typed(token, ACCESS_TOKEN_TYPE)
    }

    /// Read a claim from a valid access token.
    ///
    /// Returns `None` rather than an error on any parse or validation failure.
    pub fn extract_claim<T, F>(&self, token: &str, selector: F) -> Option<T>
    where
        F: FnOnce(&TokenClaims) -> T,
    {
        self.decode(token).ok().map(|claims| selector(&claims))
    }

    /// Issue a signed OAuth2 `state` value bound to a provider and to the
    /// browser holding `nonce`.
    pub fn issue_state(&self, provider: OAuth2Provider, nonce: &str) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let mut extra = Map::new();
        extra.insert(STATE_NONCE_CLAIM.to_string(), Value::String(nonce.to_string()));
        let claims = TokenClaims {
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            sub: provider.registration_id().to_string(),
            iat,
            exp: iat.saturating_add(ttl_secs(OAUTH2_STATE_TTL)),
            token_type: OAUTH2_STATE_TOKEN_TYPE.to_string(),
            roles: Vec::new(),
            user_id: None,
            extra,
        };
        self.sign(&claims)
    }

    /// Whether `state` was issued by this server for `provider` and the
    /// browser presenting `nonce`, and is unexpired.
    pub fn verify_state(&self, state: &str, provider: OAuth2Provider, nonce: &str) -> bool {
        self.decode_typed(state, OAUTH2_STATE_TOKEN_TYPE)
            .map(|claims| {
                claims.sub == provider.registration_id()
                    && !nonce.is_empty()
                    && claims.extra.get(STATE_NONCE_CLAIM).and_then(Value::as_str) == Some(nonce)
            })
            .unwrap_or(false)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode_typed(&self, token: &str, expected_type: &str) -> Result<TokenClaims, TokenError> {
        if !looks_like_jwt(token) {
            return Err(TokenError::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)?.claims;
        if claims.token_type != expected_type {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }
}

/// Lifetime in whole seconds, never less than one so that `exp > iat`.
fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2).max(1)
}
