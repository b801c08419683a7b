// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::roles::Role;
use crate::models::{Identity, UserResponse};

/// `type` claim of access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "ACCESS";

/// `type` claim of OAuth2 login `state` values.
pub const OAUTH2_STATE_TOKEN_TYPE: &str = "OAUTH2_STATE";

/// Claim names set by the token service; callers cannot override them.
pub const RESERVED_CLAIMS: &[&str] = &["jti", "iss", "sub", "iat", "exp", "type", "roles", "userId"];

/// Claims carried by tokens issued by this server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Unique token id
    pub jti: String,

    /// Issuer
    pub iss: String,

    /// Subject: the identity's email (or provider name for state tokens)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Token type (`ACCESS` or `OAUTH2_STATE`)
    #[serde(rename = "type")]
    pub token_type: String,

    /// Authorities derived from the identity's role
    #[serde(default)]
    pub roles: Vec<String>,

    /// Identity id
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Caller-supplied extra claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The principal bound to a request by the authentication filter.
///
/// Combines the stored identity with the authorities its role grants.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Identity loaded from the store for this request
    pub identity: Identity,

    /// Authorities granted by the identity's current role
    pub authorities: BTreeSet<String>,

    /// `jti` of the presented token
    pub token_id: String,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Bind an identity to the claims of a verified token.
    pub fn new(identity: Identity, claims: &TokenClaims) -> Self {
        let authorities = identity
            .role
            .authorities()
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            identity,
            authorities,
            token_id: claims.jti.clone(),
            expires_at: claims.exp,
        }
    }

    /// Check whether the principal holds an authority string.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.has_authority(required.authority())
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Response for GET /auth/me
#[derive(Debug, Serialize, ToSchema)]
pub struct PrincipalResponse {
    pub user: UserResponse,
    /// Authorities granted for this request
    pub authorities: Vec<String>,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl From<&AuthenticatedUser> for PrincipalResponse {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            user: UserResponse::from(&user.identity),
            authorities: user.authorities.iter().cloned().collect(),
            expires_at: user.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            jti: "tok_1".to_string(),
            iss: "portfolio-server".to_string(),
            sub: "alice@example.com".to_string(),
            iat: 1700000000,
            exp: 1700003600,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            roles: vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()],
            user_id: Some("user_123".to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn claims_serialize_with_wire_names() {
        let value = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(value["type"], "ACCESS");
        assert_eq!(value["userId"], "user_123");
        assert_eq!(value["roles"][0], "ROLE_ADMIN");
    }

    #[test]
    fn extra_claims_are_flattened() {
        let mut claims = sample_claims();
        claims
            .extra
            .insert("provider".to_string(), Value::String("GOOGLE".to_string()));
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["provider"], "GOOGLE");

        let back: TokenClaims = serde_json::from_value(value).unwrap();
        assert_eq!(back.extra.get("provider"), Some(&Value::String("GOOGLE".into())));
    }

    #[test]
    fn authenticated_user_takes_authorities_from_identity_role() {
        let mut identity = Identity::local("alice@example.com", "hash".into(), "Alice");
        identity.role = Role::Admin;

        let user = AuthenticatedUser::new(identity, &sample_claims());
        assert!(user.is_admin());
        assert!(user.has_role(Role::User));
        assert_eq!(user.token_id, "tok_1");
        assert_eq!(user.identity.email, "alice@example.com");
    }
}
