// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! JWT authentication, OAuth2 login and role-based authorization for the
//! portfolio API.
//!
//! ## Auth Flow
//!
//! 1. A client obtains a token from `POST /auth/login`, `POST /auth/register`
//!    or the OAuth2 callback
//! 2. The client sends `Authorization: Bearer <token>` (or `X-Auth-Token`)
//! 3. The server:
//!    - Verifies the HS256 signature, expiry, issuer and token type
//!    - Loads the identity named by `sub`
//!    - Binds an [`AuthenticatedUser`] with the role's authorities
//! 4. The [`AuthorizationPolicy`] decides whether the route may run
//!
//! ## Security
//!
//! - Tokens are signed with a server secret of at least 32 bytes
//! - No clock-skew leeway is applied to `exp`
//! - Passwords are stored as Argon2id hashes
//! - OAuth2 `state` values are short-lived signed tokens

pub mod claims;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod oauth2;
pub mod oauth2_client;
pub mod policy;
pub mod roles;
pub mod token;

pub use claims::{AuthenticatedUser, PrincipalResponse, TokenClaims};
pub use credentials::CredentialAuthenticator;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use oauth2::{OAuth2Provider, OAuth2Reconciler};
pub use oauth2_client::OAuth2Client;
pub use policy::{AuthorizationPolicy, PublicPaths};
pub use roles::Role;
pub use token::{TokenError, TokenService};
