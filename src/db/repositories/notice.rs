//! Notice repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::Notice;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait NoticeRepository: Send + Sync {
    async fn create(&self, author: &str, text: &str, now: DateTime<Utc>) -> Result<Notice>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Notice>>;

    /// Replace the text and move the notice to `now`
    async fn update(&self, id: i64, text: &str, now: DateTime<Utc>) -> Result<Option<Notice>>;

    /// All notices, newest first
    async fn list(&self) -> Result<Vec<Notice>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxNoticeRepository {
    pool: DynDatabasePool,
}

impl SqlxNoticeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NoticeRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str = "SELECT id, author, text, created_at FROM notices";

#[async_trait]
impl NoticeRepository for SqlxNoticeRepository {
    async fn create(&self, author: &str, text: &str, now: DateTime<Utc>) -> Result<Notice> {
        let sql = "INSERT INTO notices (author, text, created_at) VALUES (?, ?, ?)";
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(author)
                .bind(text)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create notice")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(author)
                .bind(text)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create notice")?
                .last_insert_id() as i64,
        };

        Ok(Notice {
            id,
            author: author.to_string(),
            text: text.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Notice>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get notice by ID")?;
                Ok(row.as_ref().map(row_to_notice_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get notice by ID")?;
                Ok(row.as_ref().map(row_to_notice_mysql))
            }
        }
    }

    async fn update(&self, id: i64, text: &str, now: DateTime<Utc>) -> Result<Option<Notice>> {
        let sql = "UPDATE notices SET text = ?, created_at = ? WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(now)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update notice")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(now)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update notice")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<Notice>> {
        let sql = format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list notices")?;
                Ok(rows.iter().map(row_to_notice_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list notices")?;
                Ok(rows.iter().map(row_to_notice_mysql).collect())
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM notices WHERE id = ?";
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete notice")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete notice")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_notice_sqlite(row: &sqlx::sqlite::SqliteRow) -> Notice {
    Notice {
        id: row.get("id"),
        author: row.get("author"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

fn row_to_notice_mysql(row: &sqlx::mysql::MySqlRow) -> Notice {
    Notice {
        id: row.get("id"),
        author: row.get("author"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}
