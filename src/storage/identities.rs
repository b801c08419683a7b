// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity store.
//!
//! The authentication core reaches identities only through [`IdentityStore`].
//! Two implementations exist: an in-memory map for development and tests,
//! and a file repository storing one JSON document per identity.
//!
//! Both enforce the identity uniqueness rules on save:
//! - email is unique across identities
//! - a (provider, provider id) pair names at most one identity

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::models::{normalize_email, AuthProvider, Identity};

use super::paths::is_safe_id;
use super::{FileStorage, StorageError, StorageResult};

/// Lookup and persistence of identities.
pub trait IdentityStore: Send + Sync {
    /// Find an identity by email (normalized before comparison).
    fn find_identity_by_email(&self, email: &str) -> StorageResult<Option<Identity>>;

    /// Find an identity by id.
    fn find_identity_by_id(&self, id: &str) -> StorageResult<Option<Identity>>;

    /// Find the identity linked to an account at a third-party provider.
    fn find_identity_by_provider_id(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StorageResult<Option<Identity>>;

    /// Insert or replace an identity by id, enforcing uniqueness.
    fn save_identity(&self, identity: Identity) -> StorageResult<Identity>;

    /// Modify the stored identity in place while holding the store's write lock.
    ///
    /// The closure sees the current record, so concurrent updates touching
    /// different fields (a login refresh and a new rating) both survive.
    /// Fails with `NotFound` when no identity has this id.
    fn update_identity(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut Identity),
    ) -> StorageResult<Identity>;
}

fn linked_to(identity: &Identity, provider: AuthProvider, provider_id: &str) -> bool {
    identity.provider == provider && identity.provider_id.as_deref() == Some(provider_id)
}

/// Run an update on a copy of `current`, keeping its id and normalizing the email.
fn apply_update(current: &Identity, update: &mut dyn FnMut(&mut Identity)) -> Identity {
    let mut updated = current.clone();
    update(&mut updated);
    updated.id = current.id.clone();
    updated.email = normalize_email(&updated.email);
    updated
}

/// Check a candidate against existing identities for uniqueness conflicts.
fn check_unique<'a>(
    candidate: &Identity,
    existing: impl IntoIterator<Item = &'a Identity>,
) -> StorageResult<()> {
    for other in existing {
        if other.id == candidate.id {
            continue;
        }
        if other.email == candidate.email {
            return Err(StorageError::AlreadyExists(format!(
                "Identity {}",
                candidate.email
            )));
        }
        if candidate.provider_id.is_some()
            && other.provider == candidate.provider
            && other.provider_id == candidate.provider_id
        {
            return Err(StorageError::AlreadyExists(format!(
                "{} account {}",
                candidate.provider,
                candidate.provider_id.as_deref().unwrap_or_default()
            )));
        }
    }
    Ok(())
}

// =============================================================================
// In-memory store
// =============================================================================

/// Identity store kept in process memory.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identities.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("identity store lock poisoned".to_string())
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_identity_by_email(&self, email: &str) -> StorageResult<Option<Identity>> {
        let email = normalize_email(email);
        let identities = self.identities.read().map_err(poisoned)?;
        Ok(identities.values().find(|i| i.email == email).cloned())
    }

    fn find_identity_by_id(&self, id: &str) -> StorageResult<Option<Identity>> {
        let identities = self.identities.read().map_err(poisoned)?;
        Ok(identities.get(id).cloned())
    }

    fn find_identity_by_provider_id(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StorageResult<Option<Identity>> {
        let identities = self.identities.read().map_err(poisoned)?;
        Ok(identities
            .values()
            .find(|i| linked_to(i, provider, provider_id))
            .cloned())
    }

    fn save_identity(&self, mut identity: Identity) -> StorageResult<Identity> {
        identity.email = normalize_email(&identity.email);
        let mut identities = self.identities.write().map_err(poisoned)?;
        check_unique(&identity, identities.values())?;
        identities.insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }

    fn update_identity(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut Identity),
    ) -> StorageResult<Identity> {
        let mut identities = self.identities.write().map_err(poisoned)?;
        let current = identities
            .get(id)
            .ok_or_else(|| StorageError::NotFound(format!("Identity {id}")))?;
        let updated = apply_update(current, update);
        check_unique(&updated, identities.values())?;
        identities.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }
}

// =============================================================================
// File repository
// =============================================================================

/// Identity repository over file storage.
///
/// Lookups by email scan the identities directory.
pub struct FileIdentityStore {
    storage: FileStorage,
    /// Serializes the uniqueness check with the write that follows it
    write_lock: Mutex<()>,
}

impl FileIdentityStore {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// List all identities.
    pub fn list_all(&self) -> StorageResult<Vec<Identity>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().identities_dir(), "json")?;

        let mut identities = Vec::with_capacity(ids.len());
        for id in ids {
            match self.storage.read_json(self.storage.paths().identity(&id)) {
                Ok(identity) => identities.push(identity),
                Err(e) => tracing::warn!(identity_id = %id, error = %e, "Skipping unreadable identity"),
            }
        }
        Ok(identities)
    }
}

impl IdentityStore for FileIdentityStore {
    fn find_identity_by_email(&self, email: &str) -> StorageResult<Option<Identity>> {
        let email = normalize_email(email);
        Ok(self.list_all()?.into_iter().find(|i| i.email == email))
    }

    fn find_identity_by_id(&self, id: &str) -> StorageResult<Option<Identity>> {
        if !is_safe_id(id) {
            return Ok(None);
        }
        match self.storage.read_json(self.storage.paths().identity(id)) {
            Ok(identity) => Ok(Some(identity)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_identity_by_provider_id(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StorageResult<Option<Identity>> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|i| linked_to(i, provider, provider_id)))
    }

    fn save_identity(&self, mut identity: Identity) -> StorageResult<Identity> {
        if !is_safe_id(&identity.id) {
            return Err(StorageError::Unavailable(format!(
                "identity id '{}' is not storable",
                identity.id
            )));
        }
        identity.email = normalize_email(&identity.email);

        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let existing = self.list_all()?;
        check_unique(&identity, existing.iter())?;

        self.storage
            .write_json(self.storage.paths().identity(&identity.id), &identity)?;
        Ok(identity)
    }

    fn update_identity(
        &self,
        id: &str,
        update: &mut dyn FnMut(&mut Identity),
    ) -> StorageResult<Identity> {
        let not_found = || StorageError::NotFound(format!("Identity {id}"));
        if !is_safe_id(id) {
            return Err(not_found());
        }

        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let current: Identity = match self.storage.read_json(self.storage.paths().identity(id)) {
            Ok(identity) => identity,
            Err(StorageError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e),
        };
        let updated = apply_update(&current, update);
        let existing = self.list_all()?;
        check_unique(&updated, existing.iter())?;

        self.storage
            .write_json(self.storage.paths().identity(id), &updated)?;
        Ok(updated)
    }
}
