// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email/password authentication for LOCAL identities.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::StatusCode;
use thiserror::Error;

use super::{AuthError, Role};
use crate::error::ApiError;
use crate::models::{normalize_email, AuthProvider, Identity, RegisterRequest};
use crate::storage::{IdentityStore, StorageError};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 254;

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

/// Verify a password against a stored PHC hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Minimal structural email check; the address is normalized first.
pub fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("name must not be blank")]
    MissingName,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::InvalidEmail(_)
            | RegistrationError::WeakPassword
            | RegistrationError::MissingName => ApiError::bad_request(e.to_string()),
            RegistrationError::EmailTaken => {
                ApiError::new(StatusCode::CONFLICT, "email_taken", e.to_string())
            }
            RegistrationError::Auth(auth) => auth.into(),
            RegistrationError::Storage(storage) => storage.into(),
        }
    }
}

/// Verifies email/password pairs against stored identities.
pub struct CredentialAuthenticator {
    store: Arc<dyn IdentityStore>,
    /// Verified against when the email is unknown so both paths cost one hash
    dummy_hash: String,
}

impl CredentialAuthenticator {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        let dummy_hash = hash_password("dummy-password-for-timing").unwrap_or_default();
        Self { store, dummy_hash }
    }

    /// Register a new LOCAL identity.
    pub fn register(&self, request: RegisterRequest) -> Result<Identity, RegistrationError> {
        let email = normalize_email(&request.email);
        if !is_plausible_email(&email) {
            return Err(RegistrationError::InvalidEmail(request.email));
        }
        let password_len = request.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(RegistrationError::WeakPassword);
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(RegistrationError::MissingName);
        }

        if self.store.find_identity_by_email(&email)?.is_some() {
            return Err(RegistrationError::EmailTaken);
        }

        let identity = Identity::local(&email, hash_password(&request.password)?, name);
        match self.store.save_identity(identity) {
            Ok(saved) => {
                tracing::info!(identity_id = %saved.id, "Registered local identity");
                Ok(saved)
            }
            Err(StorageError::AlreadyExists(_)) => Err(RegistrationError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Authenticate an email/password pair and record the login.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let found = self
            .store
            .find_identity_by_email(email)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let Some(identity) = found else {
            verify_password(password, &self.dummy_hash);
            return Err(AuthError::InvalidCredentials);
        };

        if identity.provider != AuthProvider::Local {
            return Err(AuthError::ProviderMismatch(identity.provider));
        }

        let matches = identity
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash));
        if !matches {
            tracing::debug!(identity_id = %identity.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.store
            .update_identity(&identity.id, &mut |identity: &mut Identity| identity.touch_login())
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    /// Create a LOCAL admin identity unless the email is already registered.
    pub fn seed_admin(&self, email: &str, password: &str) -> Result<Identity, RegistrationError> {
        if let Some(existing) = self.store.find_identity_by_email(email)? {
            return Ok(existing);
        }

        let mut identity = Identity::local(email, hash_password(password)?, "Administrator");
        identity.role = Role::Admin;
        identity.email_verified = true;
        Ok(self.store.save_identity(identity)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth2::OAuth2Provider;
    use crate::storage::InMemoryIdentityStore;

    fn authenticator() -> (CredentialAuthenticator, Arc<InMemoryIdentityStore>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        (CredentialAuthenticator::new(store.clone()), store)
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: "Alice".to_string(),
        }
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn register_then_login() {
        let (auth, store) = authenticator();
        let identity = auth
            .register(register_request("Alice@Example.com", "password123"))
            .unwrap();
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.provider, AuthProvider::Local);
        assert_eq!(store.len(), 1);

        let logged_in = auth.authenticate("alice@example.com", "password123").unwrap();
        assert_eq!(logged_in.id, identity.id);
        assert!(logged_in.last_login.is_some());
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let (auth, _) = authenticator();
        auth.register(register_request("alice@example.com", "password123"))
            .unwrap();

        assert_eq!(
            auth.authenticate("alice@example.com", "nope-nope").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            auth.authenticate("bob@example.com", "password123").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn password_login_on_federated_identity_names_provider() {
        let (auth, store) = authenticator();
        store
            .save_identity(Identity::federated(
                OAuth2Provider::Google,
                "g@example.com",
                "G",
                Some("g-1".into()),
                None,
            ))
            .unwrap();

        assert_eq!(
            auth.authenticate("g@example.com", "whatever1").unwrap_err(),
            AuthError::ProviderMismatch(AuthProvider::Google)
        );
    }

    #[test]
    fn registration_validates_input() {
        let (auth, _) = authenticator();
        assert!(matches!(
            auth.register(register_request("not-an-email", "password123")),
            Err(RegistrationError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register(register_request("a@example.com", "short")),
            Err(RegistrationError::WeakPassword)
        ));

        let mut blank_name = register_request("a@example.com", "password123");
        blank_name.name = "   ".into();
        assert!(matches!(
            auth.register(blank_name),
            Err(RegistrationError::MissingName)
        ));
    }

    #[test]
    fn duplicate_registration_is_a_conflict() {
        let (auth, _) = authenticator();
        auth.register(register_request("a@example.com", "password123"))
            .unwrap();
        let err = auth
            .register(register_request("A@EXAMPLE.COM", "password456"))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::EmailTaken));
        assert_eq!(ApiError::from(err).status, StatusCode::CONFLICT);
    }

    #[test]
    fn seed_admin_is_idempotent() {
        let (auth, store) = authenticator();
        let admin = auth.seed_admin("owner@example.com", "password123").unwrap();
        assert_eq!(admin.role, Role::Admin);

        let again = auth.seed_admin("owner@example.com", "other-password").unwrap();
        assert_eq!(again.id, admin.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn plausible_email_checks() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
    }
}
