// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Persistent records and the request/response structures used by the
//! REST API. Request and response types derive `ToSchema` for the OpenAPI
//! document.
//!
//! ## Model Categories
//!
//! - **Identities**: local and federated accounts, with their owned ratings
//! - **Portfolio**: projects, photos and contact messages
//! - **Auth DTOs**: registration, login and token responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::oauth2::OAuth2Provider;
use crate::auth::Role;

/// Normalize an email address for storage and lookup.
///
/// Applies NFKC, trims surrounding whitespace and lowercases. Every entry
/// point (registration, login, OAuth2) goes through this so the uniqueness
/// key is stable.
pub fn normalize_email(email: &str) -> String {
    email.nfkc().collect::<String>().trim().to_lowercase()
}

// =============================================================================
// Identity Models
// =============================================================================

/// Where an identity authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthProvider {
    /// Email + password
    Local,
    Google,
    Github,
    Facebook,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthProvider::Local => write!(f, "LOCAL"),
            AuthProvider::Google => write!(f, "GOOGLE"),
            AuthProvider::Github => write!(f, "GITHUB"),
            AuthProvider::Facebook => write!(f, "FACEBOOK"),
        }
    }
}

/// A user's rating of a project.
///
/// Ratings are owned by the identity that gave them and are updated in
/// place; the id never changes once assigned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Rating {
    /// Unique rating identifier (UUID)
    pub id: String,
    /// Rated project
    pub project_id: String,
    /// Score from 1 to 5
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered account, local or federated.
///
/// This is the stored record. It carries the password hash and must never
/// be returned to clients directly; use [`UserResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    /// Normalized, globally unique email
    pub email: String,
    /// Argon2 PHC string, present iff `provider == Local`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub name: String,
    pub role: Role,
    pub provider: AuthProvider,
    /// Provider-assigned subject id (federated identities only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
}

impl Identity {
    /// Create a password-based identity.
    pub fn local(email: &str, password_hash: String, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            password_hash: Some(password_hash),
            name: name.into(),
            role: Role::default(),
            provider: AuthProvider::Local,
            provider_id: None,
            avatar_url: None,
            email_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
            ratings: Vec::new(),
        }
    }

    /// Create an identity on first login through a third-party provider.
    ///
    /// The provider has already verified the email, so `email_verified` is set.
    pub fn federated(
        provider: OAuth2Provider,
        email: &str,
        name: impl Into<String>,
        provider_id: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            password_hash: None,
            name: name.into(),
            role: Role::default(),
            provider: provider.auth_provider(),
            provider_id,
            avatar_url,
            email_verified: true,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
            ratings: Vec::new(),
        }
    }

    /// Record a successful login.
    pub fn touch_login(&mut self) {
        let now = Utc::now();
        self.last_login = Some(now);
        self.updated_at = now;
    }

    /// Rate a project, updating the existing rating for that project in place.
    pub fn rate(&mut self, project_id: &str, score: u8, comment: Option<String>) -> Rating {
        let now = Utc::now();
        self.updated_at = now;

        if let Some(rating) = self
            .ratings
            .iter_mut()
            .find(|rating| rating.project_id == project_id)
        {
            rating.score = score;
            rating.comment = comment;
            rating.updated_at = now;
            return rating.clone();
        }

        let rating = Rating {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            score,
            comment,
            created_at: now,
            updated_at: now,
        };
        self.ratings.push(rating.clone());
        rating
    }
}

/// Public view of an identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub provider: AuthProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for UserResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            role: identity.role,
            provider: identity.provider,
            avatar_url: identity.avatar_url.clone(),
            email_verified: identity.email_verified,
            last_login: identity.last_login,
            created_at: identity.created_at,
        }
    }
}

// =============================================================================
// Auth DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token issued after a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// =============================================================================
// Portfolio Models
// =============================================================================

/// A photo attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Photo {
    pub id: String,
    pub project_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// A portfolio project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateProjectRequest {
    /// Score from 1 to 5
    pub score: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddPhotoRequest {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// A message submitted through the public contact form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub read: bool,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateContactMessageRequest {
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        // Fullwidth characters fold under NFKC
        assert_eq!(normalize_email("ｂob@example.com"), "bob@example.com");
    }

    #[test]
    fn local_identity_carries_password_hash() {
        let identity = Identity::local("Alice@example.com", "$argon2id$hash".into(), "Alice");
        assert_eq!(identity.provider, AuthProvider::Local);
        assert_eq!(identity.email, "alice@example.com");
        assert!(identity.password_hash.is_some());
        assert_eq!(identity.role, Role::User);
        assert!(!identity.email_verified);
    }

    #[test]
    fn federated_identity_has_no_password_and_is_verified() {
        let identity = Identity::federated(
            OAuth2Provider::Github,
            "dev@example.com",
            "Dev",
            Some("42".into()),
            None,
        );
        assert_eq!(identity.provider, AuthProvider::Github);
        assert!(identity.password_hash.is_none());
        assert!(identity.email_verified);
        assert!(identity.last_login.is_some());
    }

    #[test]
    fn rating_twice_updates_in_place() {
        let mut identity = Identity::local("a@example.com", "hash".into(), "A");
        let first = identity.rate("project-1", 3, None);
        let second = identity.rate("project-1", 5, Some("great".into()));

        assert_eq!(first.id, second.id);
        assert_eq!(identity.ratings.len(), 1);
        assert_eq!(identity.ratings[0].score, 5);
        assert_eq!(identity.ratings[0].comment.as_deref(), Some("great"));
    }

    #[test]
    fn user_response_omits_password_hash() {
        let identity = Identity::local("a@example.com", "secret-hash".into(), "A");
        let json = serde_json::to_string(&UserResponse::from(&identity)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn provider_serializes_uppercase() {
        let json = serde_json::to_string(&AuthProvider::Github).unwrap();
        assert_eq!(json, r#""GITHUB""#);
        assert_eq!(AuthProvider::Facebook.to_string(), "FACEBOOK");
    }
}
