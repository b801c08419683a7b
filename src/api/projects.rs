// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{CreateProjectRequest, Identity, Project, RateProjectRequest, Rating};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    responses(
        (status = 200, description = "All projects, newest first", body = [Project])
    )
)]
pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<Project>> {
    let store = state.content.read().await;
    Json(store.list_projects())
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = String, Path, description = "Project identifier")),
    responses(
        (status = 200, description = "Project detail", body = Project),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let store = state.content.read().await;
    store.project(&project_id).map(Json)
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    security(("bearer" = [])),
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Blank title"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    )
)]
pub async fn create_project(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let mut store = state.content.write().await;
    let project = store.create_project(request)?;
    tracing::info!(project_id = %project.id, identity_id = %user.identity.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// Rate a project; rating it again updates the same rating.
#[utoipa::path(
    put,
    path = "/projects/{project_id}/rating",
    tag = "Projects",
    security(("bearer" = [])),
    params(("project_id" = String, Path, description = "Project identifier")),
    request_body = RateProjectRequest,
    responses(
        (status = 200, description = "Rating stored", body = Rating),
        (status = 400, description = "Score outside 1..=5"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn rate_project(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<RateProjectRequest>,
) -> Result<Json<Rating>, ApiError> {
    if !(1..=5).contains(&request.score) {
        return Err(ApiError::bad_request("score must be between 1 and 5"));
    }
    state.content.read().await.project(&project_id)?;

    let mut rating = None;
    state
        .identities
        .update_identity(&user.identity.id, &mut |identity: &mut Identity| {
            rating = Some(identity.rate(&project_id, request.score, request.comment.clone()));
        })?;
    rating
        .map(Json)
        .ok_or_else(|| ApiError::internal("Rating was not stored"))
}
