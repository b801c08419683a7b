// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route authorization rules.
//!
//! An [`AuthorizationPolicy`] is an ordered list of rules mapping an HTTP
//! method and a path pattern to a [`Requirement`]. Rules are checked top to
//! bottom and the first match decides; a request no rule matches requires
//! authentication.
//!
//! ## Path patterns
//!
//! | Segment   | Matches                                  |
//! |-----------|------------------------------------------|
//! | `literal` | exactly that segment                     |
//! | `*`       | any single segment                       |
//! | `{name}`  | any single segment                       |
//! | `**`      | zero or more remaining segments          |
//!
//! Trailing slashes are ignored on both patterns and paths.

use axum::http::Method;

use super::{AuthenticatedUser, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Rest,
}

/// A parsed route pattern such as `/projects/{id}/rating` or `/docs/**`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let mut segments = Vec::new();
        for part in pattern.split('/').filter(|s| !s.is_empty()) {
            let segment = match part {
                "**" => Segment::Rest,
                "*" => Segment::Single,
                p if p.starts_with('{') && p.ends_with('}') => Segment::Single,
                p => Segment::Literal(p.to_string()),
            };
            let is_rest = segment == Segment::Rest;
            segments.push(segment);
            // Anything after `**` can never be reached
            if is_rest {
                break;
            }
        }
        Self { segments }
    }

    /// Whether a request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Single => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => {
                    if parts.next() != Some(expected.as_str()) {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

/// What a request must present to reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// No principal needed
    Public,
    /// Any authenticated principal
    Authenticated,
    /// A principal holding the role's authority
    Role(Role),
}

/// Outcome of evaluating the policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No (valid) principal; answered with 401
    Unauthenticated,
    /// Principal lacks the required authority; answered with 403
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct AuthorizationRule {
    /// `None` matches every method
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl AuthorizationRule {
    pub fn new(method: Method, pattern: &str, requirement: Requirement) -> Self {
        Self {
            method: Some(method),
            pattern: PathPattern::new(pattern),
            requirement,
        }
    }

    /// Rule applying to every method.
    pub fn any(pattern: &str, requirement: Requirement) -> Self {
        Self {
            method: None,
            pattern: PathPattern::new(pattern),
            requirement,
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }
}

/// Ordered, first-match-wins rule table.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    rules: Vec<AuthorizationRule>,
}

impl AuthorizationPolicy {
    pub fn new(rules: Vec<AuthorizationRule>) -> Self {
        Self { rules }
    }

    /// Rules for the portfolio routes.
    pub fn portfolio_default() -> Self {
        use Requirement::*;

        Self::new(vec![
            AuthorizationRule::new(Method::OPTIONS, "/**", Public),
            AuthorizationRule::new(Method::GET, "/auth/me", Authenticated),
            AuthorizationRule::any("/auth/**", Public),
            AuthorizationRule::any("/oauth2/**", Public),
            AuthorizationRule::new(Method::GET, "/projects", Public),
            AuthorizationRule::new(Method::GET, "/projects/**", Public),
            AuthorizationRule::new(Method::POST, "/contact", Public),
            AuthorizationRule::any("/photos/**", Role(super::Role::Admin)),
            AuthorizationRule::new(Method::GET, "/contact/messages/**", Role(super::Role::Admin)),
            AuthorizationRule::new(Method::PATCH, "/contact/messages/**", Role(super::Role::Admin)),
            AuthorizationRule::new(Method::DELETE, "/contact/messages/**", Role(super::Role::Admin)),
            AuthorizationRule::new(Method::GET, "/health/**", Public),
            AuthorizationRule::new(Method::GET, "/docs/**", Public),
            AuthorizationRule::new(Method::GET, "/api-doc/**", Public),
            AuthorizationRule::new(Method::GET, "/static/**", Public),
        ])
    }

    /// Requirement of the first matching rule, or `Authenticated`.
    pub fn requirement_for(&self, method: &Method, path: &str) -> Requirement {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.requirement)
            .unwrap_or(Requirement::Authenticated)
    }

    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        principal: Option<&AuthenticatedUser>,
    ) -> Decision {
        match (self.requirement_for(method, path), principal) {
            (Requirement::Public, _) => Decision::Allow,
            (_, None) => Decision::Unauthenticated,
            (Requirement::Authenticated, Some(_)) => Decision::Allow,
            (Requirement::Role(role), Some(user)) if user.has_role(role) => Decision::Allow,
            (Requirement::Role(_), Some(_)) => Decision::Forbidden,
        }
    }
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::portfolio_default()
    }
}

/// Paths the authentication filter skips without looking at headers.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    patterns: Vec<PathPattern>,
}

impl PublicPaths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| PathPattern::new(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}
