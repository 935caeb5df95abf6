//! Training session repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::{NewSessionInput, Session, SessionStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, input: &NewSessionInput) -> Result<Session>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>>;

    /// Activated sessions of a certification still open for subscription on
    /// `today`, ordered by start time then id
    async fn find_available(&self, certification_id: i64, today: NaiveDate) -> Result<Vec<Session>>;

    async fn update_status(&self, id: i64, status: SessionStatus) -> Result<bool>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, certification_id, starts_at, rounds, subscribe_expire_date, status, created_at FROM sessions";

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, input: &NewSessionInput) -> Result<Session> {
        let sql = r#"
            INSERT INTO sessions (certification_id, starts_at, rounds, subscribe_expire_date, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(input.certification_id)
                .bind(input.starts_at)
                .bind(input.rounds)
                .bind(input.subscribe_expire_date)
                .bind(input.status.to_string())
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create session")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(input.certification_id)
                .bind(input.starts_at)
                .bind(input.rounds)
                .bind(input.subscribe_expire_date)
                .bind(input.status.to_string())
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create session")?
                .last_insert_id() as i64,
        };

        Ok(Session {
            id,
            certification_id: input.certification_id,
            starts_at: input.starts_at,
            rounds: input.rounds,
            subscribe_expire_date: input.subscribe_expire_date,
            status: input.status,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get session by ID")?;
                row.as_ref().map(row_to_session_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get session by ID")?;
                row.as_ref().map(row_to_session_mysql).transpose()
            }
        }
    }

    async fn find_available(&self, certification_id: i64, today: NaiveDate) -> Result<Vec<Session>> {
        let sql = format!(
            "{} WHERE certification_id = ? AND status = ? AND subscribe_expire_date >= ? ORDER BY starts_at, id",
            SELECT_COLUMNS
        );
        let activated = SessionStatus::Activated.to_string();
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(certification_id)
                    .bind(&activated)
                    .bind(today)
                    .fetch_all(pool)
                    .await
                    .context("Failed to find available sessions")?;
                rows.iter().map(row_to_session_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(certification_id)
                    .bind(&activated)
                    .bind(today)
                    .fetch_all(pool)
                    .await
                    .context("Failed to find available sessions")?;
                rows.iter().map(row_to_session_mysql).collect()
            }
        }
    }

    async fn update_status(&self, id: i64, status: SessionStatus) -> Result<bool> {
        let sql = "UPDATE sessions SET status = ? WHERE id = ?";
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(status.to_string())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update session status")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(status.to_string())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update session status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let status: String = row.get("status");
    Ok(Session {
        id: row.get("id"),
        certification_id: row.get("certification_id"),
        starts_at: row.get("starts_at"),
        rounds: row.get("rounds"),
        subscribe_expire_date: row.get("subscribe_expire_date"),
        status: status.parse()?,
        created_at: row.get("created_at"),
    })
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    let status: String = row.get("status");
    Ok(Session {
        id: row.get("id"),
        certification_id: row.get("certification_id"),
        starts_at: row.get("starts_at"),
        rounds: row.get("rounds"),
        subscribe_expire_date: row.get("subscribe_expire_date"),
        status: status.parse()?,
        created_at: row.get("created_at"),
    })
}
