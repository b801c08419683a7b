// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store for portfolio content: projects, their photos and contact-form
//! messages.
//!
//! Content is held in memory. With file storage attached, every change is
//! written to `$DATA_DIR/content.json` before it becomes visible, and the
//! snapshot is loaded back on startup.

use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    AddPhotoRequest, ContactMessage, ContactRequest, CreateProjectRequest, Photo, Project,
};
use crate::storage::{FileStorage, StorageError, StorageResult};

/// Contact form field limits, in characters.
pub const MAX_CONTACT_NAME: usize = 100;
pub const MAX_CONTACT_EMAIL: usize = 254;
pub const MAX_CONTACT_SUBJECT: usize = 200;
pub const MAX_CONTACT_MESSAGE: usize = 5_000;

/// Messages kept in the inbox before new submissions are refused.
pub const MAX_INBOX_MESSAGES: usize = 1_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    projects: HashMap<String, Project>,
    #[serde(default)]
    messages: HashMap<String, ContactMessage>,
}

#[derive(Default)]
pub struct ContentStore {
    content: Content,
    storage: Option<FileStorage>,
}

fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::bad_request(format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

fn bounded(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        Err(ApiError::bad_request(format!(
            "{field} must be at most {max} characters"
        )))
    } else {
        Ok(())
    }
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the content snapshot from file storage, or start empty.
    pub fn open(storage: FileStorage) -> StorageResult<Self> {
        let content = match storage.read_json(storage.paths().content()) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => Content::default(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            content,
            storage: Some(storage),
        })
    }

    /// Apply a change, persisting the result before it replaces the current content.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Content) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let Some(storage) = &self.storage else {
            return change(&mut self.content);
        };

        let mut next = self.content.clone();
        let result = change(&mut next)?;
        storage.write_json(storage.paths().content(), &next)?;
        self.content = next;
        Ok(result)
    }

    /// Projects, newest first.
    pub fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self.content.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        projects
    }

    pub fn project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.content
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    pub fn create_project(&mut self, request: CreateProjectRequest) -> Result<Project, ApiError> {
        required("title", &request.title)?;

        let id = Uuid::new_v4().to_string();
        let project = Project {
            id: id.clone(),
            title: request.title.trim().to_string(),
            description: request.description,
            technologies: request.technologies,
            repository_url: request.repository_url,
            live_url: request.live_url,
            photos: Vec::new(),
            created_at: Utc::now(),
        };
        self.commit(|content| {
            content.projects.insert(id, project.clone());
            Ok(project)
        })
    }

    pub fn add_photo(&mut self, project_id: &str, request: AddPhotoRequest) -> Result<Photo, ApiError> {
        required("url", &request.url)?;

        self.commit(|content| {
            let Some(project) = content.projects.get_mut(project_id) else {
                return Err(ApiError::not_found("Project not found"));
            };

            let photo = Photo {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                url: request.url,
                caption: request.caption,
                uploaded_at: Utc::now(),
            };
            project.photos.push(photo.clone());
            Ok(photo)
        })
    }

    pub fn delete_photo(&mut self, photo_id: &str) -> Result<(), ApiError> {
        self.commit(|content| {
            for project in content.projects.values_mut() {
                if let Some(index) = project.photos.iter().position(|p| p.id == photo_id) {
                    project.photos.remove(index);
                    return Ok(());
                }
            }
            Err(ApiError::not_found("Photo not found"))
        })
    }

    pub fn submit_message(&mut self, request: ContactRequest) -> Result<ContactMessage, ApiError> {
        required("name", &request.name)?;
        required("email", &request.email)?;
        required("message", &request.message)?;
        bounded("name", &request.name, MAX_CONTACT_NAME)?;
        bounded("email", &request.email, MAX_CONTACT_EMAIL)?;
        bounded("subject", &request.subject, MAX_CONTACT_SUBJECT)?;
        bounded("message", &request.message, MAX_CONTACT_MESSAGE)?;

        if self.content.messages.len() >= MAX_INBOX_MESSAGES {
            tracing::warn!(limit = MAX_INBOX_MESSAGES, "Contact inbox is full");
            return Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "inbox_full",
                "The inbox is full, please try again later",
            ));
        }

        let id = Uuid::new_v4().to_string();
        let message = ContactMessage {
            id: id.clone(),
            name: request.name,
            email: request.email,
            subject: request.subject,
            message: request.message,
            read: false,
            received_at: Utc::now(),
        };
        self.commit(|content| {
            content.messages.insert(id, message.clone());
            Ok(message)
        })
    }

    /// Contact messages, newest first.
    pub fn list_messages(&self) -> Vec<ContactMessage> {
        let mut messages: Vec<ContactMessage> = self.content.messages.values().cloned().collect();
        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at).then(a.id.cmp(&b.id)));
        messages
    }

    pub fn mark_message(&mut self, message_id: &str, read: bool) -> Result<ContactMessage, ApiError> {
        self.commit(|content| {
            let Some(message) = content.messages.get_mut(message_id) else {
                return Err(ApiError::not_found("Message not found"));
            };
            message.read = read;
            Ok(message.clone())
        })
    }

    pub fn delete_message(&mut self, message_id: &str) -> Result<(), ApiError> {
        self.commit(|content| {
            if content.messages.remove(message_id).is_some() {
                Ok(())
            } else {
                Err(ApiError::not_found("Message not found"))
            }
        })
    }
}
