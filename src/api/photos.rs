// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Project photo management (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminOnly;
use crate::error::ApiError;
use crate::models::{AddPhotoRequest, Photo};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/photos/{project_id}",
    tag = "Photos",
    security(("bearer" = [])),
    params(("project_id" = String, Path, description = "Project to attach the photo to")),
    request_body = AddPhotoRequest,
    responses(
        (status = 201, description = "Photo attached", body = Photo),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn add_photo(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<AddPhotoRequest>,
) -> Result<(StatusCode, Json<Photo>), ApiError> {
    let mut store = state.content.write().await;
    let photo = store.add_photo(&project_id, request)?;
    Ok((StatusCode::CREATED, Json(photo)))
}

#[utoipa::path(
    delete,
    path = "/photos/{photo_id}",
    tag = "Photos",
    security(("bearer" = [])),
    params(("photo_id" = String, Path, description = "Photo identifier")),
    responses(
        (status = 204, description = "Photo removed"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn delete_photo(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.content.write().await;
    store.delete_photo(&photo_id)?;
    Ok(StatusCode::NO_CONTENT)
}
