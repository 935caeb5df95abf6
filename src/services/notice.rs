//! Notice service
//!
//! Administrative notices shown to students. Editing a notice re-stamps it,
//! so an edited notice moves to the top of the list.

use crate::db::repositories::NoticeRepository;
use crate::models::Notice;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Error types for notice service operations
#[derive(Debug, thiserror::Error)]
pub enum NoticeServiceError {
    #[error("Notice not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NoticeService {
    repo: Arc<dyn NoticeRepository>,
}

impl NoticeService {
    pub fn new(repo: Arc<dyn NoticeRepository>) -> Self {
        Self { repo }
    }

    /// Publish a notice signed by `author`
    pub async fn create(&self, author: &str, text: &str, now: DateTime<Utc>) -> Result<Notice, NoticeServiceError> {
        let author = author.trim();
        if author.is_empty() {
            return Err(NoticeServiceError::ValidationError("Author cannot be empty".to_string()));
        }
        let text = validate_text(text)?;

        let notice = self
            .repo
            .create(author, text, now)
            .await
            .context("Failed to create notice")?;
        tracing::info!("Notice {} published by {}", notice.id, notice.author);
        Ok(notice)
    }

    /// Replace the text of a notice and re-stamp it with `now`
    pub async fn update(&self, id: i64, text: &str, now: DateTime<Utc>) -> Result<Notice, NoticeServiceError> {
        let text = validate_text(text)?;
        self.repo
            .update(id, text, now)
            .await
            .context("Failed to update notice")?
            .ok_or(NoticeServiceError::NotFound(id))
    }

    pub async fn get(&self, id: i64) -> Result<Notice, NoticeServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get notice")?
            .ok_or(NoticeServiceError::NotFound(id))
    }

    /// All notices, newest first
    pub async fn list(&self) -> Result<Vec<Notice>, NoticeServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list notices")
            .map_err(Into::into)
    }

    pub async fn delete(&self, id: i64) -> Result<(), NoticeServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete notice")? {
            return Err(NoticeServiceError::NotFound(id));
        }
        tracing::info!("Notice {} deleted", id);
        Ok(())
    }
}

fn validate_text(text: &str) -> Result<&str, NoticeServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(NoticeServiceError::ValidationError("Notice text cannot be empty".to_string()));
    }
    Ok(text)
}
