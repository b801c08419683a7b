// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Portfolio owner: manages photos and reads contact messages
/// - `User` - Registered visitor: can rate projects and edit own profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Normal registered user (least privilege)
    #[default]
    User,
}

impl Role {
    /// Authority string checked by the authorization policy for this role.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::User => "ROLE_USER",
        }
    }

    /// Authorities granted to a holder of this role.
    ///
    /// Admins also hold the user authority.
    pub fn authorities(&self) -> BTreeSet<&'static str> {
        match self {
            Role::Admin => BTreeSet::from([Role::Admin.authority(), Role::User.authority()]),
            Role::User => BTreeSet::from([Role::User.authority()]),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorities_are_role_derived() {
        assert_eq!(
            Role::Admin.authorities().into_iter().collect::<Vec<_>>(),
            vec!["ROLE_ADMIN", "ROLE_USER"]
        );
        assert_eq!(
            Role::User.authorities().into_iter().collect::<Vec<_>>(),
            vec!["ROLE_USER"]
        );
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
