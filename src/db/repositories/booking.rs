//! Booking repository
//!
//! The `(session_id, turn)` unique index is the single source of truth for
//! slot ownership: `insert_if_absent` reports a lost race as `Ok(None)`
//! instead of an error.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Booking;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking unless its `(session, turn)` slot is already taken
    async fn insert_if_absent(&self, booking: &Booking) -> Result<Option<Booking>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Booking>>;

    /// Turns of `session_id` already booked with `skill_card_id`, ascending
    async fn booked_turns(&self, session_id: i64, skill_card_id: i64) -> Result<Vec<i32>>;

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<Booking>>;
}

pub struct SqlxBookingRepository {
    pool: DynDatabasePool,
}

impl SqlxBookingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookingRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, student_id, skill_card_id, skill_card_module_id, session_id, turn, created_at FROM bookings";

fn is_slot_conflict(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl BookingRepository for SqlxBookingRepository {
    async fn insert_if_absent(&self, booking: &Booking) -> Result<Option<Booking>> {
        let sql = r#"
            INSERT INTO bookings (student_id, skill_card_id, skill_card_module_id, session_id, turn, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();
        let inserted = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(booking.student_id)
                .bind(booking.skill_card_id)
                .bind(booking.skill_card_module_id)
                .bind(booking.session_id)
                .bind(booking.turn)
                .bind(now)
                .execute(pool)
                .await
                .map(|r| r.last_insert_rowid()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(booking.student_id)
                .bind(booking.skill_card_id)
                .bind(booking.skill_card_module_id)
                .bind(booking.session_id)
                .bind(booking.turn)
                .bind(now)
                .execute(pool)
                .await
                .map(|r| r.last_insert_id() as i64),
        };

        match inserted {
            Ok(id) => Ok(Some(Booking {
                id,
                created_at: now,
                ..booking.clone()
            })),
            Err(ref e) if is_slot_conflict(e) => {
                tracing::debug!(
                    "Slot already taken: session {} turn {}",
                    booking.session_id,
                    booking.turn
                );
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to create booking")),
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get booking by ID")?;
                Ok(row.as_ref().map(row_to_booking_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get booking by ID")?;
                Ok(row.as_ref().map(row_to_booking_mysql))
            }
        }
    }

    async fn booked_turns(&self, session_id: i64, skill_card_id: i64) -> Result<Vec<i32>> {
        let sql = "SELECT turn FROM bookings WHERE session_id = ? AND skill_card_id = ? ORDER BY turn";
        let turns = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query_scalar(sql)
                .bind(session_id)
                .bind(skill_card_id)
                .fetch_all(pool)
                .await
                .context("Failed to list booked turns")?,
            Backend::Mysql(pool) => sqlx::query_scalar(sql)
                .bind(session_id)
                .bind(skill_card_id)
                .fetch_all(pool)
                .await
                .context("Failed to list booked turns")?,
        };
        Ok(turns)
    }

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<Booking>> {
        let sql = format!("{} WHERE student_id = ? ORDER BY session_id, turn", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(student_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list bookings by student")?;
                Ok(rows.iter().map(row_to_booking_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(student_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list bookings by student")?;
                Ok(rows.iter().map(row_to_booking_mysql).collect())
            }
        }
    }
}

fn row_to_booking_sqlite(row: &sqlx::sqlite::SqliteRow) -> Booking {
    Booking {
        id: row.get("id"),
        student_id: row.get("student_id"),
        skill_card_id: row.get("skill_card_id"),
        skill_card_module_id: row.get("skill_card_module_id"),
        session_id: row.get("session_id"),
        turn: row.get("turn"),
        created_at: row.get("created_at"),
    }
}

fn row_to_booking_mysql(row: &sqlx::mysql::MySqlRow) -> Booking {
    Booking {
        id: row.get("id"),
        student_id: row.get("student_id"),
        skill_card_id: row.get("skill_card_id"),
        skill_card_module_id: row.get("skill_card_module_id"),
        session_id: row.get("session_id"),
        turn: row.get("turn"),
        created_at: row.get("created_at"),
    }
}
