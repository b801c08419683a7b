// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contact form: public submission, admin inbox.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminOnly;
use crate::error::ApiError;
use crate::models::{ContactMessage, ContactRequest, UpdateContactMessageRequest};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/contact",
    tag = "Contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message received", body = ContactMessage),
        (status = 400, description = "Missing or oversized field"),
        (status = 503, description = "Inbox is full")
    )
)]
pub async fn submit_message(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactMessage>), ApiError> {
    let mut store = state.content.write().await;
    let message = store.submit_message(request)?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/contact/messages",
    tag = "Contact",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Messages, newest first", body = [ContactMessage]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_messages(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Json<Vec<ContactMessage>> {
    let store = state.content.read().await;
    Json(store.list_messages())
}

#[utoipa::path(
    patch,
    path = "/contact/messages/{message_id}",
    tag = "Contact",
    security(("bearer" = [])),
    params(("message_id" = String, Path, description = "Message identifier")),
    request_body = UpdateContactMessageRequest,
    responses(
        (status = 200, description = "Message updated", body = ContactMessage),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn update_message(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(request): Json<UpdateContactMessageRequest>,
) -> Result<Json<ContactMessage>, ApiError> {
    let mut store = state.content.write().await;
    store.mark_message(&message_id, request.read).map(Json)
}

#[utoipa::path(
    delete,
    path = "/contact/messages/{message_id}",
    tag = "Contact",
    security(("bearer" = [])),
    params(("message_id" = String, Path, description = "Message identifier")),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn delete_message(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.content.write().await;
    store.delete_message(&message_id)?;
    Ok(StatusCode::NO_CONTENT)
}
