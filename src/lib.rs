// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portfolio Server - personal portfolio backend
//!
//! Serves portfolio projects, photos, ratings and a contact inbox behind
//! JWT authentication with optional Google, GitHub and Facebook login.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Tokens, credentials, OAuth2 reconciliation and route policy
//! - `config` - Environment configuration
//! - `storage` - Identity persistence (in-memory or JSON files)
//! - `store` - In-memory portfolio content

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
