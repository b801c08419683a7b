// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 user reconciliation.
//!
//! After a provider login, the user-info attribute bag is mapped onto a
//! local identity. The provider account (provider + external id) is the
//! primary key; the email is only consulted when that account is not yet
//! linked:
//! - a linked account is refreshed, following email changes at the provider
//! - an unknown email creates a federated identity
//! - a known email from the same provider without a linked account is linked
//! - a known email registered any other way, or already linked to a
//!   different account at the same provider, is rejected untouched

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;

use super::AuthError;
use crate::models::{normalize_email, AuthProvider, Identity};
use crate::storage::{IdentityStore, StorageError};

/// Third-party login providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OAuth2Provider {
    Google,
    Github,
    Facebook,
}

impl OAuth2Provider {
    pub const ALL: [OAuth2Provider; 3] = [
        OAuth2Provider::Google,
        OAuth2Provider::Github,
        OAuth2Provider::Facebook,
    ];

    /// Registration id used in routes and configuration.
    pub fn registration_id(&self) -> &'static str {
        match self {
            OAuth2Provider::Google => "google",
            OAuth2Provider::Github => "github",
            OAuth2Provider::Facebook => "facebook",
        }
    }

    /// Parse a registration id (case-insensitive).
    pub fn from_registration_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.registration_id().eq_ignore_ascii_case(id.trim()))
    }

    pub fn auth_provider(&self) -> AuthProvider {
        match self {
            OAuth2Provider::Google => AuthProvider::Google,
            OAuth2Provider::Github => AuthProvider::Github,
            OAuth2Provider::Facebook => AuthProvider::Facebook,
        }
    }

    /// Extract the normalized profile from this provider's attribute bag.
    pub fn profile(&self, attributes: &Map<String, Value>) -> ProviderProfile {
        match self {
            OAuth2Provider::Google => google_profile(attributes),
            OAuth2Provider::Github => github_profile(attributes),
            OAuth2Provider::Facebook => facebook_profile(attributes),
        }
    }
}

impl std::fmt::Display for OAuth2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.registration_id())
    }
}

/// Profile fields every provider adapter produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderProfile {
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

fn string_attr(attributes: &Map<String, Value>, key: &str) -> Option<String> {
    attributes
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn google_profile(attributes: &Map<String, Value>) -> ProviderProfile {
    ProviderProfile {
        external_id: string_attr(attributes, "sub"),
        name: string_attr(attributes, "name"),
        email: string_attr(attributes, "email"),
        avatar_url: string_attr(attributes, "picture"),
    }
}

fn github_profile(attributes: &Map<String, Value>) -> ProviderProfile {
    // GitHub ids are JSON numbers
    let external_id = match attributes.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    };
    ProviderProfile {
        external_id,
        name: string_attr(attributes, "name").or_else(|| string_attr(attributes, "login")),
        email: string_attr(attributes, "email"),
        avatar_url: string_attr(attributes, "avatar_url"),
    }
}

fn facebook_profile(attributes: &Map<String, Value>) -> ProviderProfile {
    let avatar_url = attributes
        .get("picture")
        .and_then(|p| p.pointer("/data/url"))
        .and_then(Value::as_str)
        .map(str::to_string);
    ProviderProfile {
        external_id: string_attr(attributes, "id"),
        name: string_attr(attributes, "name"),
        email: string_attr(attributes, "email"),
        avatar_url,
    }
}

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("Login with {0} is not supported")]
    UnsupportedProvider(String),

    #[error("Email not found from OAuth2 provider")]
    MissingEmail,

    #[error("Looks like you're signed up with {registered}. Please use your {registered} account to login.")]
    ProviderConflict {
        registered: AuthProvider,
        attempted: AuthProvider,
    },

    #[error("This email is already linked to a different {provider} account.")]
    AccountMismatch { provider: AuthProvider },

    #[error("identity store failure: {0}")]
    Store(#[from] StorageError),
}

impl OAuth2Error {
    /// Message safe to return to the user.
    pub fn user_message(&self) -> String {
        match self {
            OAuth2Error::Store(_) => "Authentication service is temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result of a successful OAuth2 login.
#[derive(Debug, Clone)]
pub struct OAuth2Principal {
    /// Created or refreshed identity
    pub identity: Identity,
    /// Attribute bag as received from the provider
    pub attributes: Map<String, Value>,
}

/// Maps provider profiles onto local identities.
pub struct OAuth2Reconciler {
    store: Arc<dyn IdentityStore>,
}

impl OAuth2Reconciler {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Create or refresh the identity for a provider login.
    pub fn reconcile(
        &self,
        provider_id: &str,
        attributes: Map<String, Value>,
    ) -> Result<OAuth2Principal, OAuth2Error> {
        let provider = OAuth2Provider::from_registration_id(provider_id)
            .ok_or_else(|| OAuth2Error::UnsupportedProvider(provider_id.to_string()))?;

        let profile = provider.profile(&attributes);
        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or(OAuth2Error::MissingEmail)?;

        let kind = provider.auth_provider();
        let linked = match profile.external_id.as_deref() {
            Some(external_id) => self.store.find_identity_by_provider_id(kind, external_id)?,
            None => None,
        };

        let identity = match linked {
            Some(existing) => {
                if existing.email != email {
                    if let Some(other) = self.store.find_identity_by_email(&email)? {
                        return Err(conflict_with(&other, kind));
                    }
                }
                self.refresh(&existing.id, &email, &profile)?
            }
            None => match self.store.find_identity_by_email(&email)? {
                Some(existing)
                    if existing.provider != kind
                        || (existing.provider_id.is_some()
                            && profile.external_id.is_some()
                            && existing.provider_id != profile.external_id) =>
                {
                    return Err(conflict_with(&existing, kind));
                }
                Some(existing) => self.refresh(&existing.id, &email, &profile)?,
                None => {
                    let name = profile.name.clone().unwrap_or_else(|| email.clone());
                    let created = self.store.save_identity(Identity::federated(
                        provider,
                        &email,
                        name,
                        profile.external_id,
                        profile.avatar_url,
                    ))?;
                    tracing::info!(
                        identity_id = %created.id,
                        provider = %provider,
                        "Created identity from OAuth2 login"
                    );
                    created
                }
            },
        };

        Ok(OAuth2Principal {
            identity,
            attributes,
        })
    }

    /// Apply a fresh provider profile to a stored identity.
    ///
    /// Runs as a field-level update so ratings written concurrently survive.
    fn refresh(
        &self,
        id: &str,
        email: &str,
        profile: &ProviderProfile,
    ) -> Result<Identity, OAuth2Error> {
        let now = Utc::now();
        let identity = self.store.update_identity(id, &mut |identity: &mut Identity| {
            identity.email = email.to_string();
            if let Some(name) = &profile.name {
                identity.name = name.clone();
            }
            if profile.avatar_url.is_some() {
                identity.avatar_url = profile.avatar_url.clone();
            }
            if identity.provider_id.is_none() {
                identity.provider_id = profile.external_id.clone();
            }
            identity.last_login = Some(now);
            identity.updated_at = now;
        })?;
        Ok(identity)
    }

    /// Reconcile and convert any failure into an authentication error.
    pub fn authenticate_oauth2(
        &self,
        provider_id: &str,
        attributes: Map<String, Value>,
    ) -> Result<OAuth2Principal, AuthError> {
        self.reconcile(provider_id, attributes).map_err(|e| {
            tracing::warn!(provider = %provider_id, error = %e, "OAuth2 login rejected");
            AuthError::OAuth2Authentication(e.user_message())
        })
    }
}

/// Error for a login that would take over `existing` from another account.
fn conflict_with(existing: &Identity, attempted: AuthProvider) -> OAuth2Error {
    if existing.provider == attempted {
        OAuth2Error::AccountMismatch {
            provider: attempted,
        }
    } else {
        OAuth2Error::ProviderConflict {
            registered: existing.provider,
            attempted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::InMemoryIdentityStore;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn reconciler() -> (OAuth2Reconciler, Arc<InMemoryIdentityStore>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        (OAuth2Reconciler::new(store.clone()), store)
    }

    #[test]
    fn first_login_creates_verified_user() {
        let (reconciler, store) = reconciler();
        let principal = reconciler
            .reconcile(
                "google",
                attrs(json!({
                    "sub": "g-123",
                    "name": "Grace",
                    "email": "Grace@Example.com",
                    "picture": "https://img/g.png"
                })),
            )
            .unwrap();

        let identity = principal.identity;
        assert_eq!(identity.email, "grace@example.com");
        assert_eq!(identity.provider, AuthProvider::Google);
        assert_eq!(identity.provider_id.as_deref(), Some("g-123"));
        assert_eq!(identity.role, Role::User);
        assert!(identity.email_verified);
        assert!(identity.password_hash.is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(principal.attributes["sub"], "g-123");
    }

    #[test]
    fn conflicting_provider_is_rejected_without_mutation() {
        let (reconciler, store) = reconciler();
        let local = store
            .save_identity(Identity::local("dev@example.com", "hash".into(), "Dev"))
            .unwrap();

        let err = reconciler
            .reconcile(
                "github",
                attrs(json!({"id": 7, "login": "octo", "email": "dev@example.com"})),
            )
            .unwrap_err();

        match &err {
            OAuth2Error::ProviderConflict {
                registered,
                attempted,
            } => {
                assert_eq!(*registered, AuthProvider::Local);
                assert_eq!(*attempted, AuthProvider::Github);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("signed up with LOCAL"));
        assert_eq!(store.find_identity_by_id(&local.id).unwrap(), Some(local));
    }

    #[test]
    fn same_provider_login_refreshes_profile_and_keeps_ratings() {
        let (reconciler, store) = reconciler();
        let mut existing = Identity::federated(
            OAuth2Provider::Github,
            "octo@example.com",
            "Old Name",
            Some("7".into()),
            None,
        );
        let rating = existing.rate("project-1", 5, None);
        let existing = store.save_identity(existing).unwrap();

        let principal = reconciler
            .reconcile(
                "github",
                attrs(json!({
                    "id": 7,
                    "name": "New Name",
                    "login": "octo",
                    "email": "octo@example.com",
                    "avatar_url": "https://avatars/7"
                })),
            )
            .unwrap();

        let updated = principal.identity;
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://avatars/7"));
        assert_eq!(updated.ratings, vec![rating]);
        assert!(updated.last_login >= existing.last_login);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_account_with_same_email_is_rejected() {
        let (reconciler, store) = reconciler();
        let first = reconciler
            .reconcile(
                "github",
                attrs(json!({"id": 7, "login": "a", "email": "x@example.com"})),
            )
            .unwrap()
            .identity;

        let err = reconciler
            .reconcile(
                "github",
                attrs(json!({"id": 8, "login": "b", "email": "x@example.com"})),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            OAuth2Error::AccountMismatch {
                provider: AuthProvider::Github
            }
        ));
        let stored = store.find_identity_by_id(&first.id).unwrap().unwrap();
        assert_eq!(stored.name, "a");
        assert_eq!(stored.provider_id.as_deref(), Some("7"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn email_change_at_provider_keeps_the_linked_identity() {
        let (reconciler, store) = reconciler();
        let mut before = reconciler
            .reconcile(
                "github",
                attrs(json!({"id": 7, "login": "octo", "email": "old@example.com"})),
            )
            .unwrap()
            .identity;
        let rating = before.rate("project-1", 4, None);
        store.save_identity(before.clone()).unwrap();

        let after = reconciler
            .reconcile(
                "github",
                attrs(json!({"id": 7, "login": "octo", "email": "New@Example.com"})),
            )
            .unwrap()
            .identity;

        assert_eq!(after.id, before.id);
        assert_eq!(after.email, "new@example.com");
        assert_eq!(after.ratings, vec![rating]);
        assert_eq!(store.len(), 1);
        assert!(store.find_identity_by_email("old@example.com").unwrap().is_none());
    }

    #[test]
    fn email_change_onto_another_identity_is_rejected() {
        let (reconciler, store) = reconciler();
        let local = store
            .save_identity(Identity::local("taken@example.com", "hash".into(), "Local"))
            .unwrap();
        let linked = reconciler
            .reconcile("google", attrs(json!({"sub": "g-1", "email": "g@example.com"})))
            .unwrap()
            .identity;

        let err = reconciler
            .reconcile("google", attrs(json!({"sub": "g-1", "email": "taken@example.com"})))
            .unwrap_err();

        assert!(matches!(
            err,
            OAuth2Error::ProviderConflict {
                registered: AuthProvider::Local,
                ..
            }
        ));
        assert_eq!(store.find_identity_by_id(&local.id).unwrap(), Some(local));
        assert_eq!(
            store.find_identity_by_id(&linked.id).unwrap().unwrap().email,
            "g@example.com"
        );
    }

    #[test]
    fn unlinked_identity_is_linked_on_first_provider_login() {
        let (reconciler, store) = reconciler();
        let existing = store
            .save_identity(Identity::federated(
                OAuth2Provider::Facebook,
                "fb@example.com",
                "FB",
                None,
                None,
            ))
            .unwrap();

        let identity = reconciler
            .reconcile("facebook", attrs(json!({"id": "10", "email": "fb@example.com"})))
            .unwrap()
            .identity;

        assert_eq!(identity.id, existing.id);
        assert_eq!(identity.provider_id.as_deref(), Some("10"));
        assert_eq!(
            store
                .find_identity_by_provider_id(AuthProvider::Facebook, "10")
                .unwrap()
                .map(|i| i.id),
            Some(existing.id)
        );
    }

    #[test]
    fn missing_email_fails() {
        let (reconciler, store) = reconciler();
        let err = reconciler
            .reconcile("google", attrs(json!({"sub": "1", "email": "  "})))
            .unwrap_err();
        assert!(matches!(err, OAuth2Error::MissingEmail));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_provider_fails() {
        let (reconciler, _) = reconciler();
        let err = reconciler
            .reconcile("myspace", attrs(json!({"email": "a@example.com"})))
            .unwrap_err();
        assert!(matches!(err, OAuth2Error::UnsupportedProvider(_)));
    }

    #[test]
    fn authenticate_oauth2_wraps_errors() {
        let (reconciler, _) = reconciler();
        let err = reconciler
            .authenticate_oauth2("google", attrs(json!({"sub": "1"})))
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::OAuth2Authentication("Email not found from OAuth2 provider".into())
        );
    }

    #[test]
    fn provider_adapters_extract_profiles() {
        let github = OAuth2Provider::Github.profile(&attrs(json!({
            "id": 583231,
            "login": "octocat",
            "email": "octo@github.com",
            "avatar_url": "https://a/1"
        })));
        assert_eq!(github.external_id.as_deref(), Some("583231"));
        assert_eq!(github.name.as_deref(), Some("octocat"));

        let facebook = OAuth2Provider::Facebook.profile(&attrs(json!({
            "id": "10",
            "name": "Mark",
            "email": "m@fb.com",
            "picture": {"data": {"url": "https://fb/p.jpg"}}
        })));
        assert_eq!(facebook.avatar_url.as_deref(), Some("https://fb/p.jpg"));
        assert_eq!(facebook.external_id.as_deref(), Some("10"));
    }

    #[test]
    fn registration_ids_round_trip() {
        for provider in OAuth2Provider::ALL {
            assert_eq!(
                OAuth2Provider::from_registration_id(provider.registration_id()),
                Some(provider)
            );
        }
        assert_eq!(
            OAuth2Provider::from_registration_id("GitHub"),
            Some(OAuth2Provider::Github)
        );
        assert_eq!(OAuth2Provider::from_registration_id("twitter"), None);
    }
}
