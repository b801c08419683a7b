// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for identities and portfolio content. With `DATA_DIR` set,
//! both are stored as JSON files; otherwise they are kept in memory.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   identities/
//!     {identity_id}.json   # Identity record incl. password hash and ratings
//!   content.json           # Projects, photos and contact messages
//! ```

pub mod file_store;
pub mod identities;
pub mod paths;

pub use file_store::{FileStorage, StorageError, StorageResult};
pub use identities::{FileIdentityStore, IdentityStore, InMemoryIdentityStore};
pub use paths::StoragePaths;
