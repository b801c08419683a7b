// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile endpoints.

use axum::{extract::State, Json};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Identity, UpdateProfileRequest, UserResponse};
use crate::state::AppState;

/// Update the current user's display name and avatar.
#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Blank name"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn update_me(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let name = match request.name {
        Some(name) if name.trim().is_empty() => {
            return Err(ApiError::bad_request("name must not be blank"));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };
    let avatar_url = request.avatar_url.map(|url| url.trim().to_string());

    let saved = state
        .identities
        .update_identity(&user.identity.id, &mut |identity: &mut Identity| {
            if let Some(name) = &name {
                identity.name = name.clone();
            }
            if let Some(avatar_url) = &avatar_url {
                identity.avatar_url = (!avatar_url.is_empty()).then(|| avatar_url.clone());
            }
            identity.updated_at = chrono::Utc::now();
        })?;
    Ok(Json((&saved).into()))
}
