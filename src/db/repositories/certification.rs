//! Certification repository
//!
//! Catalog storage: certifications, exam modules and the syllabus linking them.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Certification, CertificationDuration, CertificationModule, Module};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CertificationRepository: Send + Sync {
    /// Insert a certification (without modules)
    async fn create(&self, certification: &Certification) -> Result<Certification>;

    /// Get a certification with its full syllabus
    async fn get_by_id(&self, id: i64) -> Result<Option<Certification>>;

    /// Link (or unlink) the certification used when renewing `id`
    async fn set_update_certification(&self, id: i64, update_id: Option<i64>) -> Result<()>;

    /// Insert an exam module
    async fn create_module(&self, name: &str) -> Result<Module>;

    /// Add a module to a certification's syllabus
    async fn add_module(
        &self,
        certification_id: i64,
        module_id: i64,
        mandatory: bool,
    ) -> Result<CertificationModule>;

    /// Mandatory modules of a certification, in syllabus order
    async fn find_mandatory_modules(&self, certification_id: i64) -> Result<Vec<CertificationModule>>;
}

pub struct SqlxCertificationRepository {
    pool: DynDatabasePool,
}

impl SqlxCertificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CertificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CertificationRepository for SqlxCertificationRepository {
    async fn create(&self, certification: &Certification) -> Result<Certification> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_sqlite(pool, certification).await,
            Backend::Mysql(pool) => create_mysql(pool, certification).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Certification>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => get_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_by_id_mysql(pool, id).await,
        }
    }

    async fn set_update_certification(&self, id: i64, update_id: Option<i64>) -> Result<()> {
        let sql = "UPDATE certifications SET update_certification_id = ? WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(update_id)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to set update certification")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(update_id)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to set update certification")?;
            }
        }
        Ok(())
    }

    async fn create_module(&self, name: &str) -> Result<Module> {
        let sql = "INSERT INTO modules (name) VALUES (?)";
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(name)
                .execute(pool)
                .await
                .context("Failed to create module")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(name)
                .execute(pool)
                .await
                .context("Failed to create module")?
                .last_insert_id() as i64,
        };
        Ok(Module {
            id,
            name: name.to_string(),
        })
    }

    async fn add_module(
        &self,
        certification_id: i64,
        module_id: i64,
        mandatory: bool,
    ) -> Result<CertificationModule> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => add_module_sqlite(pool, certification_id, module_id, mandatory).await,
            Backend::Mysql(pool) => add_module_mysql(pool, certification_id, module_id, mandatory).await,
        }
    }

    async fn find_mandatory_modules(&self, certification_id: i64) -> Result<Vec<CertificationModule>> {
        let modules = match self.pool.backend()? {
            Backend::Sqlite(pool) => list_modules_sqlite(pool, certification_id).await?,
            Backend::Mysql(pool) => list_modules_mysql(pool, certification_id).await?,
        };
        Ok(modules.into_iter().filter(|m| m.mandatory).collect())
    }
}

const SELECT_CERTIFICATION: &str =
    "SELECT id, name, duration, update_certification_id, created_at FROM certifications WHERE id = ?";

const SELECT_SYLLABUS: &str = r#"
    SELECT cm.id, cm.certification_id, cm.mandatory, m.id AS module_id, m.name AS module_name
    FROM certification_modules cm
    JOIN modules m ON m.id = cm.module_id
    WHERE cm.certification_id = ?
    ORDER BY cm.id
"#;

const SELECT_SYLLABUS_ENTRY: &str = r#"
    SELECT cm.id, cm.certification_id, cm.mandatory, m.id AS module_id, m.name AS module_name
    FROM certification_modules cm
    JOIN modules m ON m.id = cm.module_id
    WHERE cm.id = ?
"#;

fn parse_duration(raw: Option<String>) -> Result<Option<CertificationDuration>> {
    raw.filter(|d| !d.trim().is_empty())
        .map(|d| d.parse::<CertificationDuration>())
        .transpose()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, certification: &Certification) -> Result<Certification> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO certifications (name, duration, update_certification_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&certification.name)
    .bind(certification.duration.map(|d| d.to_string()))
    .bind(certification.update_certification_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create certification")?;

    Ok(Certification {
        id: result.last_insert_rowid(),
        modules: Vec::new(),
        created_at: now,
        ..certification.clone()
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Certification>> {
    let row = sqlx::query(SELECT_CERTIFICATION)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get certification")?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Certification {
        id: row.get("id"),
        name: row.get("name"),
        duration: parse_duration(row.get("duration"))?,
        update_certification_id: row.get("update_certification_id"),
        modules: list_modules_sqlite(pool, id).await?,
        created_at: row.get("created_at"),
    }))
}

async fn add_module_sqlite(
    pool: &SqlitePool,
    certification_id: i64,
    module_id: i64,
    mandatory: bool,
) -> Result<CertificationModule> {
    let result = sqlx::query(
        "INSERT INTO certification_modules (certification_id, module_id, mandatory) VALUES (?, ?, ?)",
    )
    .bind(certification_id)
    .bind(module_id)
    .bind(mandatory)
    .execute(pool)
    .await
    .context("Failed to add module to certification")?;

    let row = sqlx::query(SELECT_SYLLABUS_ENTRY)
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await
        .context("Failed to reload certification module")?;
    Ok(row_to_certification_module_sqlite(&row))
}

async fn list_modules_sqlite(pool: &SqlitePool, certification_id: i64) -> Result<Vec<CertificationModule>> {
    let rows = sqlx::query(SELECT_SYLLABUS)
        .bind(certification_id)
        .fetch_all(pool)
        .await
        .context("Failed to list certification modules")?;
    Ok(rows.iter().map(row_to_certification_module_sqlite).collect())
}

fn row_to_certification_module_sqlite(row: &sqlx::sqlite::SqliteRow) -> CertificationModule {
    CertificationModule {
        id: row.get("id"),
        certification_id: row.get("certification_id"),
        module: Module {
            id: row.get("module_id"),
            name: row.get("module_name"),
        },
        mandatory: row.get("mandatory"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, certification: &Certification) -> Result<Certification> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO certifications (name, duration, update_certification_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&certification.name)
    .bind(certification.duration.map(|d| d.to_string()))
    .bind(certification.update_certification_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create certification")?;

    Ok(Certification {
        id: result.last_insert_id() as i64,
        modules: Vec::new(),
        created_at: now,
        ..certification.clone()
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Certification>> {
    let row = sqlx::query(SELECT_CERTIFICATION)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get certification")?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Certification {
        id: row.get("id"),
        name: row.get("name"),
        duration: parse_duration(row.get("duration"))?,
        update_certification_id: row.get("update_certification_id"),
        modules: list_modules_mysql(pool, id).await?,
        created_at: row.get("created_at"),
    }))
}

async fn add_module_mysql(
    pool: &MySqlPool,
    certification_id: i64,
    module_id: i64,
    mandatory: bool,
) -> Result<CertificationModule> {
    let result = sqlx::query(
        "INSERT INTO certification_modules (certification_id, module_id, mandatory) VALUES (?, ?, ?)",
    )
    .bind(certification_id)
    .bind(module_id)
    .bind(mandatory)
    .execute(pool)
    .await
    .context("Failed to add module to certification")?;

    let row = sqlx::query(SELECT_SYLLABUS_ENTRY)
        .bind(result.last_insert_id() as i64)
        .fetch_one(pool)
        .await
        .context("Failed to reload certification module")?;
    Ok(row_to_certification_module_mysql(&row))
}

async fn list_modules_mysql(pool: &MySqlPool, certification_id: i64) -> Result<Vec<CertificationModule>> {
    let rows = sqlx::query(SELECT_SYLLABUS)
        .bind(certification_id)
        .fetch_all(pool)
        .await
        .context("Failed to list certification modules")?;
    Ok(rows.iter().map(row_to_certification_module_mysql).collect())
}

fn row_to_certification_module_mysql(row: &sqlx::mysql::MySqlRow) -> CertificationModule {
    CertificationModule {
        id: row.get("id"),
        certification_id: row.get("certification_id"),
        module: Module {
            id: row.get("module_id"),
            name: row.get("module_name"),
        },
        mandatory: row.get("mandatory"),
    }
}
