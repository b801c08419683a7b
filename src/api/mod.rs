// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        middleware::{authenticate, authorize},
        PrincipalResponse, Role,
    },
    error::ErrorBody,
    models::{
        AddPhotoRequest, AuthProvider, AuthResponse, ContactMessage, ContactRequest, CreateProjectRequest,
        LoginRequest, Photo, Project, RateProjectRequest, Rating, RegisterRequest,
        UpdateContactMessageRequest, UpdateProfileRequest, UserResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod contact;
pub mod health;
pub mod oauth2;
pub mod photos;
pub mod projects;
pub mod users;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/users/me", patch(users::update_me))
        .route("/oauth2/authorize/{provider}", get(oauth2::authorize))
        .route("/oauth2/callback/{provider}", get(oauth2::callback))
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}/rating", put(projects::rate_project))
        // POST takes a project id, DELETE a photo id
        .route(
            "/photos/{id}",
            post(photos::add_photo).delete(photos::delete_photo),
        )
        .route("/contact", post(contact::submit_message))
        .route("/contact/messages", get(contact::list_messages))
        .route(
            "/contact/messages/{id}",
            patch(contact::update_message).delete(contact::delete_message),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state.clone());

    // Layers run bottom-up: CORS, tracing, authenticate, authorize, handler
    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(state.clone(), authorize))
        .layer(from_fn_with_state(state, authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::me,
        users::update_me,
        oauth2::authorize,
        oauth2::callback,
        projects::list_projects,
        projects::get_project,
        projects::create_project,
        projects::rate_project,
        photos::add_photo,
        photos::delete_photo,
        contact::submit_message,
        contact::list_messages,
        contact::update_message,
        contact::delete_message,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            UpdateProfileRequest,
            PrincipalResponse,
            Role,
            AuthProvider,
            Project,
            Photo,
            Rating,
            CreateProjectRequest,
            RateProjectRequest,
            AddPhotoRequest,
            ContactMessage,
            ContactRequest,
            UpdateContactMessageRequest,
            ErrorBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and current principal"),
        (name = "OAuth2", description = "Third-party login"),
        (name = "Users", description = "User profile"),
        (name = "Projects", description = "Portfolio projects and ratings"),
        (name = "Photos", description = "Project photos"),
        (name = "Contact", description = "Contact form and inbox"),
        (name = "Health", description = "Health probes")
    )
)]
struct ApiDoc;
