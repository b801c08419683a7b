// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::oauth2_client::OAuth2ClientError;
use crate::auth::{
    AuthorizationPolicy, CredentialAuthenticator, OAuth2Client, OAuth2Reconciler, PublicPaths,
    TokenService,
};
use crate::config::{AuthSettings, OAuth2Settings};
use crate::storage::{FileStorage, IdentityStore, StorageResult};
use crate::store::ContentStore;

#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<dyn IdentityStore>,
    pub tokens: Arc<TokenService>,
    pub credentials: Arc<CredentialAuthenticator>,
    pub reconciler: Arc<OAuth2Reconciler>,
    pub oauth2: Arc<OAuth2Client>,
    pub policy: Arc<AuthorizationPolicy>,
    pub public_paths: Arc<PublicPaths>,
    pub content: Arc<RwLock<ContentStore>>,
    /// Backing storage when `DATA_DIR` is set (used by health checks)
    pub storage: Option<FileStorage>,
}

impl AppState {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        auth: &AuthSettings,
        oauth2: OAuth2Settings,
    ) -> Result<Self, OAuth2ClientError> {
        Ok(Self {
            tokens: Arc::new(TokenService::new(auth)),
            credentials: Arc::new(CredentialAuthenticator::new(identities.clone())),
            reconciler: Arc::new(OAuth2Reconciler::new(identities.clone())),
            oauth2: Arc::new(OAuth2Client::new(oauth2)?),
            policy: Arc::new(AuthorizationPolicy::portfolio_default()),
            public_paths: Arc::new(PublicPaths::new(&auth.public_paths)),
            content: Arc::new(RwLock::new(ContentStore::new())),
            storage: None,
            identities,
        })
    }

    /// Attach the file storage backing the identity store and load the
    /// persisted portfolio content from it.
    pub fn with_storage(mut self, storage: FileStorage) -> StorageResult<Self> {
        self.content = Arc::new(RwLock::new(ContentStore::open(storage.clone())?));
        self.storage = Some(storage);
        Ok(self)
    }
}

#[cfg(test)]
impl Default for AppState {
    fn default() -> Self {
        use crate::storage::InMemoryIdentityStore;

        Self::new(
            Arc::new(InMemoryIdentityStore::new()),
            &AuthSettings::with_secret("test-secret-that-is-at-least-32-bytes-long"),
            OAuth2Settings::default(),
        )
        .expect("test state")
    }
}
