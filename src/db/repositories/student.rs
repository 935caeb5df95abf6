//! Student repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::Student;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, student: &Student) -> Result<Student>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Student>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>>;

    /// All students ordered by last name, first name
    async fn list(&self) -> Result<Vec<Student>>;
}

pub struct SqlxStudentRepository {
    pool: DynDatabasePool,
}

impl SqlxStudentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StudentRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_STUDENT: &str =
    "INSERT INTO students (first_name, last_name, email, birth_date, created_at) VALUES (?, ?, ?, ?, ?)";
const SELECT_COLUMNS: &str = "SELECT id, first_name, last_name, email, birth_date, created_at FROM students";

#[async_trait]
impl StudentRepository for SqlxStudentRepository {
    async fn create(&self, student: &Student) -> Result<Student> {
        let now = Utc::now();
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => create_sqlite(pool, student, now).await?,
            Backend::Mysql(pool) => create_mysql(pool, student, now).await?,
        };
        Ok(Student {
            id,
            created_at: now,
            ..student.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Student>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get student by ID")?;
                Ok(row.as_ref().map(row_to_student_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get student by ID")?;
                Ok(row.as_ref().map(row_to_student_mysql))
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>> {
        let sql = format!("{} WHERE email = ?", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get student by email")?;
                Ok(row.as_ref().map(row_to_student_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get student by email")?;
                Ok(row.as_ref().map(row_to_student_mysql))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Student>> {
        let sql = format!("{} ORDER BY last_name, first_name, id", SELECT_COLUMNS);
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list students")?;
                Ok(rows.iter().map(row_to_student_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list students")?;
                Ok(rows.iter().map(row_to_student_mysql).collect())
            }
        }
    }
}

async fn create_sqlite(pool: &SqlitePool, student: &Student, now: chrono::DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(INSERT_STUDENT)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.email)
        .bind(student.birth_date)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create student")?;
    Ok(result.last_insert_rowid())
}

async fn create_mysql(pool: &MySqlPool, student: &Student, now: chrono::DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(INSERT_STUDENT)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.email)
        .bind(student.birth_date)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create student")?;
    Ok(result.last_insert_id() as i64)
}

fn row_to_student_sqlite(row: &sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        birth_date: row.get("birth_date"),
        created_at: row.get("created_at"),
    }
}

fn row_to_student_mysql(row: &sqlx::mysql::MySqlRow) -> Student {
    Student {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        birth_date: row.get("birth_date"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::NaiveDate;

    async fn setup() -> Arc<dyn StudentRepository> {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxStudentRepository::boxed(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_student() {
        let repo = setup().await;
        let mut student = Student::new("Ada".to_string(), "Lovelace".to_string(), "ada@example.com".to_string());
        student.birth_date = NaiveDate::from_ymd_opt(1990, 12, 10);

        let created = repo.create(&student).await.unwrap();
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("student");
        assert_eq!(by_id.email, "ada@example.com");
        assert_eq!(by_id.birth_date, student.birth_date);

        let by_email = repo.get_by_email("ada@example.com").await.unwrap().expect("student");
        assert_eq!(by_email.id, created.id);
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup().await;
        let student = Student::new("A".to_string(), "B".to_string(), "dup@example.com".to_string());
        repo.create(&student).await.unwrap();
        assert!(repo.create(&student).await.is_err());
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let repo = setup().await;
        for (first, last) in [("Zoe", "Bianchi"), ("Anna", "Rossi"), ("Luca", "Bianchi")] {
            let email = format!("{}@example.com", first.to_lowercase());
            repo.create(&Student::new(first.to_string(), last.to_string(), email)).await.unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().iter().map(|s| s.full_name()).collect();
        assert_eq!(names, vec!["Luca Bianchi", "Zoe Bianchi", "Anna Rossi"]);
    }
}
