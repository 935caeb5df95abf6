//! Skill card repository
//!
//! A card and its module entries are written together in one transaction.
//! Existing module entries are never rewritten by `create`/`update`: only
//! entries without an id are inserted, so `is_passed` survives renewals.
//! Pass/fail results go through `set_module_passed`.
//!
//! `update` is a compare-and-set on the card status: it only applies while
//! the stored status is still the one the caller read.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CertificationModule, Module, SkillCard, SkillCardModule, SkillCardStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait SkillCardRepository: Send + Sync {
    /// Insert a card together with its modules
    async fn create(&self, card: &SkillCard) -> Result<SkillCard>;

    /// Get a card with its modules (attachment order)
    async fn get_by_id(&self, id: i64) -> Result<Option<SkillCard>>;

    /// Cards owned by a student, by id
    async fn list_by_student(&self, student_id: i64) -> Result<Vec<SkillCard>>;

    /// Persist card fields and insert newly attached modules, provided the
    /// stored status is still `from`. Returns `None` (nothing written) otherwise.
    async fn update(&self, card: &SkillCard, from: SkillCardStatus) -> Result<Option<SkillCard>>;

    /// Record an exam result. Returns false if the entry does not belong to the card.
    async fn set_module_passed(&self, card_id: i64, skill_card_module_id: i64, passed: bool) -> Result<bool>;

    /// Ids of non-expired cards whose expiry date is before `today`
    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<i64>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxSkillCardRepository {
    pool: DynDatabasePool,
}

impl SqlxSkillCardRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SkillCardRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SkillCardRepository for SqlxSkillCardRepository {
    async fn create(&self, card: &SkillCard) -> Result<SkillCard> {
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => create_sqlite(pool, card).await?,
            Backend::Mysql(pool) => create_mysql(pool, card).await?,
        };
        self.get_by_id(id)
            .await?
            .with_context(|| format!("Skill card {} vanished after insert", id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SkillCard>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => get_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_by_id_mysql(pool, id).await,
        }
    }

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<SkillCard>> {
        let sql = "SELECT id FROM skill_cards WHERE student_id = ? ORDER BY id";
        let ids: Vec<i64> = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query_scalar(sql)
                .bind(student_id)
                .fetch_all(pool)
                .await
                .context("Failed to list skill cards by student")?,
            Backend::Mysql(pool) => sqlx::query_scalar(sql)
                .bind(student_id)
                .fetch_all(pool)
                .await
                .context("Failed to list skill cards by student")?,
        };

        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(card) = self.get_by_id(id).await? {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    async fn update(&self, card: &SkillCard, from: SkillCardStatus) -> Result<Option<SkillCard>> {
        let applied = match self.pool.backend()? {
            Backend::Sqlite(pool) => update_sqlite(pool, card, from).await?,
            Backend::Mysql(pool) => update_mysql(pool, card, from).await?,
        };
        if !applied {
            tracing::debug!("Skill card {} is no longer {}, update skipped", card.id, from);
            return Ok(None);
        }
        self.get_by_id(card.id)
            .await?
            .with_context(|| format!("Skill card {} vanished after update", card.id))
            .map(Some)
    }

    async fn set_module_passed(&self, card_id: i64, skill_card_module_id: i64, passed: bool) -> Result<bool> {
        let sql = "UPDATE skill_card_modules SET is_passed = ? WHERE id = ? AND skill_card_id = ?";
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(passed)
                .bind(skill_card_module_id)
                .bind(card_id)
                .execute(pool)
                .await
                .context("Failed to record module result")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(passed)
                .bind(skill_card_module_id)
                .bind(card_id)
                .execute(pool)
                .await
                .context("Failed to record module result")?
                .rows_affected(),
        };
        // MySQL reports 0 affected rows when the value is unchanged
        if affected > 0 {
            return Ok(true);
        }
        let exists_sql = "SELECT COUNT(*) FROM skill_card_modules WHERE id = ? AND skill_card_id = ?";
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query_scalar(exists_sql)
                .bind(skill_card_module_id)
                .bind(card_id)
                .fetch_one(pool)
                .await?,
            Backend::Mysql(pool) => sqlx::query_scalar(exists_sql)
                .bind(skill_card_module_id)
                .bind(card_id)
                .fetch_one(pool)
                .await?,
        };
        Ok(count > 0)
    }

    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<i64>> {
        let sql = r#"
            SELECT id FROM skill_cards
            WHERE status <> ? AND expires_at IS NOT NULL AND expires_at < ?
            ORDER BY id
        "#;
        let expired = SkillCardStatus::Expired.to_string();
        let ids = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query_scalar(sql)
                .bind(&expired)
                .bind(today)
                .fetch_all(pool)
                .await
                .context("Failed to list overdue skill cards")?,
            Backend::Mysql(pool) => sqlx::query_scalar(sql)
                .bind(&expired)
                .bind(today)
                .fetch_all(pool)
                .await
                .context("Failed to list overdue skill cards")?,
        };
        Ok(ids)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM skill_cards WHERE id = ?";
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete skill card")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete skill card")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const INSERT_CARD: &str = r#"
    INSERT INTO skill_cards (number, student_id, certification_id, credits, expires_at, status, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_CARD: &str = r#"
    UPDATE skill_cards
    SET certification_id = ?, credits = ?, expires_at = ?, status = ?, updated_at = ?
    WHERE id = ? AND status = ?
"#;

const INSERT_MODULE: &str =
    "INSERT INTO skill_card_modules (skill_card_id, certification_module_id, module_id, is_passed) VALUES (?, ?, ?, ?)";

const SELECT_CARD: &str = r#"
    SELECT id, number, student_id, certification_id, credits, expires_at, status, created_at, updated_at
    FROM skill_cards WHERE id = ?
"#;

const SELECT_CARD_MODULES: &str = r#"
    SELECT scm.id, scm.skill_card_id, scm.is_passed,
           cm.id AS certification_module_id, cm.certification_id, cm.mandatory,
           m.id AS module_id, m.name AS module_name
    FROM skill_card_modules scm
    JOIN certification_modules cm ON cm.id = scm.certification_module_id
    JOIN modules m ON m.id = scm.module_id
    WHERE scm.skill_card_id = ?
    ORDER BY scm.id
"#;

fn new_modules(card: &SkillCard) -> impl Iterator<Item = &SkillCardModule> {
    card.modules.iter().filter(|m| !m.is_persisted())
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, card: &SkillCard) -> Result<i64> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let card_id = sqlx::query(INSERT_CARD)
        .bind(&card.number)
        .bind(card.student_id)
        .bind(card.certification_id)
        .bind(card.credits)
        .bind(card.expires_at)
        .bind(card.status.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create skill card")?
        .last_insert_rowid();

    for module in new_modules(card) {
        sqlx::query(INSERT_MODULE)
            .bind(card_id)
            .bind(module.module.id)
            .bind(module.module_id())
            .bind(module.is_passed)
            .execute(&mut *tx)
            .await
            .context("Failed to attach module to skill card")?;
    }

    tx.commit().await.context("Failed to commit skill card")?;
    Ok(card_id)
}

async fn update_sqlite(pool: &SqlitePool, card: &SkillCard, from: SkillCardStatus) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let affected = sqlx::query(UPDATE_CARD)
        .bind(card.certification_id)
        .bind(card.credits)
        .bind(card.expires_at)
        .bind(card.status.to_string())
        .bind(Utc::now())
        .bind(card.id)
        .bind(from.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update skill card")?
        .rows_affected();
    if affected == 0 {
        tx.rollback().await.context("Failed to roll back skill card update")?;
        return Ok(false);
    }

    for module in new_modules(card) {
        sqlx::query(INSERT_MODULE)
            .bind(card.id)
            .bind(module.module.id)
            .bind(module.module_id())
            .bind(module.is_passed)
            .execute(&mut *tx)
            .await
            .context("Failed to attach module to skill card")?;
    }

    tx.commit().await.context("Failed to commit skill card")?;
    Ok(true)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<SkillCard>> {
    let row = sqlx::query(SELECT_CARD)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get skill card by ID")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let module_rows = sqlx::query(SELECT_CARD_MODULES)
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to load skill card modules")?;

    let status: String = row.get("status");
    Ok(Some(SkillCard {
        id: row.get("id"),
        number: row.get("number"),
        student_id: row.get("student_id"),
        certification_id: row.get("certification_id"),
        credits: row.get("credits"),
        expires_at: row.get("expires_at"),
        status: status.parse()?,
        modules: module_rows.iter().map(row_to_module_sqlite).collect(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

fn row_to_module_sqlite(row: &sqlx::sqlite::SqliteRow) -> SkillCardModule {
    SkillCardModule {
        id: row.get("id"),
        skill_card_id: row.get("skill_card_id"),
        module: CertificationModule {
            id: row.get("certification_module_id"),
            certification_id: row.get("certification_id"),
            module: Module {
                id: row.get("module_id"),
                name: row.get("module_name"),
            },
            mandatory: row.get("mandatory"),
        },
        is_passed: row.get("is_passed"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, card: &SkillCard) -> Result<i64> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let card_id = sqlx::query(INSERT_CARD)
        .bind(&card.number)
        .bind(card.student_id)
        .bind(card.certification_id)
        .bind(card.credits)
        .bind(card.expires_at)
        .bind(card.status.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create skill card")?
        .last_insert_id() as i64;

    for module in new_modules(card) {
        sqlx::query(INSERT_MODULE)
            .bind(card_id)
            .bind(module.module.id)
            .bind(module.module_id())
            .bind(module.is_passed)
            .execute(&mut *tx)
            .await
            .context("Failed to attach module to skill card")?;
    }

    tx.commit().await.context("Failed to commit skill card")?;
    Ok(card_id)
}

async fn update_mysql(pool: &MySqlPool, card: &SkillCard, from: SkillCardStatus) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let affected = sqlx::query(UPDATE_CARD)
        .bind(card.certification_id)
        .bind(card.credits)
        .bind(card.expires_at)
        .bind(card.status.to_string())
        .bind(Utc::now())
        .bind(card.id)
        .bind(from.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update skill card")?
        .rows_affected();
    // MySQL reports 0 affected rows for a matched row whose values are unchanged
    if affected == 0 {
        let matched: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skill_cards WHERE id = ? AND status = ?")
            .bind(card.id)
            .bind(from.to_string())
            .fetch_one(&mut *tx)
            .await
            .context("Failed to check skill card status")?;
        if matched == 0 {
            tx.rollback().await.context("Failed to roll back skill card update")?;
            return Ok(false);
        }
    }

    for module in new_modules(card) {
        sqlx::query(INSERT_MODULE)
            .bind(card.id)
            .bind(module.module.id)
            .bind(module.module_id())
            .bind(module.is_passed)
            .execute(&mut *tx)
            .await
            .context("Failed to attach module to skill card")?;
    }

    tx.commit().await.context("Failed to commit skill card")?;
    Ok(true)
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<SkillCard>> {
    let row = sqlx::query(SELECT_CARD)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get skill card by ID")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let module_rows = sqlx::query(SELECT_CARD_MODULES)
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to load skill card modules")?;

    let status: String = row.get("status");
    Ok(Some(SkillCard {
        id: row.get("id"),
        number: row.get("number"),
        student_id: row.get("student_id"),
        certification_id: row.get("certification_id"),
        credits: row.get("credits"),
        expires_at: row.get("expires_at"),
        status: status.parse()?,
        modules: module_rows.iter().map(row_to_module_mysql).collect(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

fn row_to_module_mysql(row: &sqlx::mysql::MySqlRow) -> SkillCardModule {
    SkillCardModule {
        id: row.get("id"),
        skill_card_id: row.get("skill_card_id"),
        module: CertificationModule {
            id: row.get("certification_module_id"),
            certification_id: row.get("certification_id"),
            module: Module {
                id: row.get("module_id"),
                name: row.get("module_name"),
            },
            mandatory: row.get("mandatory"),
        },
        is_passed: row.get("is_passed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        BookingRepository, CertificationRepository, SessionRepository, SqlxBookingRepository,
        SqlxCertificationRepository, SqlxSessionRepository, SqlxStudentRepository, StudentRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Booking, Certification, NewSessionInput, SessionStatus, Student};

    struct Fixture {
        pool: DynDatabasePool,
        cards: Arc<dyn SkillCardRepository>,
        student_id: i64,
        syllabus: Vec<CertificationModule>,
    }

    async fn count(pool: &DynDatabasePool, sql: &str, id: i64) -> i64 {
        let pool = pool.as_sqlite().expect("sqlite test pool");
        sqlx::query_scalar(sql).bind(id).fetch_one(pool).await.unwrap()
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let students = SqlxStudentRepository::boxed(pool.clone());
        let student = students
            .create(&Student::new("Mario".to_string(), "Rossi".to_string(), "mario@example.com".to_string()))
            .await
            .unwrap();

        let catalog = SqlxCertificationRepository::boxed(pool.clone());
        let cert = catalog.create(&Certification::new("ECDL".to_string(), None)).await.unwrap();
        let mut syllabus = Vec::new();
        for name in ["Essentials", "Online", "Word"] {
            let module = catalog.create_module(name).await.unwrap();
            syllabus.push(catalog.add_module(cert.id, module.id, true).await.unwrap());
        }

        Fixture {
            cards: SqlxSkillCardRepository::boxed(pool.clone()),
            pool,
            student_id: student.id,
            syllabus,
        }
    }

    fn draft(fixture: &Fixture, modules: &[CertificationModule]) -> SkillCard {
        let now = Utc::now();
        SkillCard {
            id: 0,
            number: "SC-100".to_string(),
            student_id: fixture.student_id,
            certification_id: fixture.syllabus[0].certification_id,
            credits: 5,
            expires_at: NaiveDate::from_ymd_opt(2027, 3, 31),
            status: SkillCardStatus::Activated,
            modules: modules.iter().cloned().map(SkillCardModule::attach).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_persists_card_and_modules() {
        let f = setup().await;
        let card = f.cards.create(&draft(&f, &f.syllabus[..2])).await.unwrap();

        assert!(card.id > 0);
        assert_eq!(card.credits, 5);
        assert_eq!(card.expires_at, NaiveDate::from_ymd_opt(2027, 3, 31));
        assert_eq!(card.modules.len(), 2);
        assert!(card.modules.iter().all(|m| m.is_persisted() && !m.is_passed));
        assert_eq!(card.modules[0].module.module.name, "Essentials");
    }

    #[tokio::test]
    async fn test_update_inserts_only_new_modules() {
        let f = setup().await;
        let card = f.cards.create(&draft(&f, &f.syllabus[..1])).await.unwrap();
        assert!(f.cards.set_module_passed(card.id, card.modules[0].id, true).await.unwrap());

        // A stale in-memory copy still says "not passed"; update must not overwrite it.
        let mut stale = card.clone();
        stale.status = SkillCardStatus::Updating;
        stale.modules.push(SkillCardModule::attach(f.syllabus[2].clone()));
        let updated = f.cards.update(&stale, SkillCardStatus::Activated).await.unwrap().expect("status matched");

        assert_eq!(updated.status, SkillCardStatus::Updating);
        assert_eq!(updated.modules.len(), 2);
        assert!(updated.modules[0].is_passed);
        assert!(!updated.modules[1].is_passed);
        assert_eq!(updated.modules[1].module.module.name, "Word");
    }

    #[tokio::test]
    async fn test_set_module_passed_checks_ownership() {
        let f = setup().await;
        let card = f.cards.create(&draft(&f, &f.syllabus[..1])).await.unwrap();
        let entry = card.modules[0].id;

        assert!(f.cards.set_module_passed(card.id, entry, true).await.unwrap());
        assert!(f.cards.set_module_passed(card.id, entry, true).await.unwrap());
        assert!(!f.cards.set_module_passed(card.id + 1, entry, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_overdue() {
        let f = setup().await;
        let overdue = f.cards.create(&draft(&f, &[])).await.unwrap();

        let mut open_ended = draft(&f, &[]);
        open_ended.number = "SC-101".to_string();
        open_ended.expires_at = None;
        f.cards.create(&open_ended).await.unwrap();

        let mut already_expired = draft(&f, &[]);
        already_expired.number = "SC-102".to_string();
        already_expired.status = SkillCardStatus::Expired;
        f.cards.create(&already_expired).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2027, 4, 1).unwrap();
        assert_eq!(f.cards.list_overdue(today).await.unwrap(), vec![overdue.id]);

        let expiry_day = NaiveDate::from_ymd_opt(2027, 3, 31).unwrap();
        assert!(f.cards.list_overdue(expiry_day).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_student_and_delete() {
        let f = setup().await;
        let first = f.cards.create(&draft(&f, &f.syllabus[..1])).await.unwrap();
        let mut second = draft(&f, &[]);
        second.number = "SC-200".to_string();
        let second = f.cards.create(&second).await.unwrap();

        let ids: Vec<i64> = f.cards.list_by_student(f.student_id).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(f.cards.list_by_student(f.student_id + 1).await.unwrap().is_empty());

        assert!(f.cards.delete(first.id).await.unwrap());
        assert!(!f.cards.delete(first.id).await.unwrap());
        assert!(f.cards.get_by_id(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_with_stale_status_writes_nothing() {
        let f = setup().await;
        let card = f.cards.create(&draft(&f, &f.syllabus[..1])).await.unwrap();

        let mut expired = card.clone();
        expired.status = SkillCardStatus::Expired;
        f.cards.update(&expired, SkillCardStatus::Activated).await.unwrap().expect("status matched");

        // A second writer that also read ACTIVATED loses, modules included.
        let mut renewing = card.clone();
        renewing.status = SkillCardStatus::Updating;
        renewing.modules.push(SkillCardModule::attach(f.syllabus[1].clone()));
        assert!(f.cards.update(&renewing, SkillCardStatus::Activated).await.unwrap().is_none());

        let stored = f.cards.get_by_id(card.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SkillCardStatus::Expired);
        assert_eq!(stored.modules.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_modules_and_bookings() {
        let f = setup().await;
        let card = f.cards.create(&draft(&f, &f.syllabus[..2])).await.unwrap();

        let session = SqlxSessionRepository::boxed(f.pool.clone())
            .create(&NewSessionInput {
                certification_id: card.certification_id,
                starts_at: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap().and_hms_opt(9, 0, 0).unwrap(),
                rounds: 2,
                subscribe_expire_date: NaiveDate::from_ymd_opt(2026, 10, 30).unwrap(),
                status: SessionStatus::Activated,
            })
            .await
            .unwrap();
        SqlxBookingRepository::boxed(f.pool.clone())
            .insert_if_absent(&Booking {
                id: 0,
                student_id: f.student_id,
                skill_card_id: card.id,
                skill_card_module_id: card.modules[0].id,
                session_id: session.id,
                turn: 1,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
            .expect("slot should be free");

        let modules_sql = "SELECT COUNT(*) FROM skill_card_modules WHERE skill_card_id = ?";
        let bookings_sql = "SELECT COUNT(*) FROM bookings WHERE skill_card_id = ?";
        assert_eq!(count(&f.pool, modules_sql, card.id).await, 2);
        assert_eq!(count(&f.pool, bookings_sql, card.id).await, 1);

        assert!(f.cards.delete(card.id).await.unwrap());
        assert_eq!(count(&f.pool, modules_sql, card.id).await, 0);
        assert_eq!(count(&f.pool, bookings_sql, card.id).await, 0);
    }

    #[tokio::test]
    async fn test_syllabus_entry_on_a_card_cannot_be_removed() {
        let f = setup().await;
        let card = f.cards.create(&draft(&f, &f.syllabus[..1])).await.unwrap();
        assert!(f.cards.set_module_passed(card.id, card.modules[0].id, true).await.unwrap());

        let pool = f.pool.as_sqlite().expect("sqlite test pool");
        let removed = sqlx::query("DELETE FROM certification_modules WHERE id = ?")
            .bind(f.syllabus[0].id)
            .execute(pool)
            .await;
        assert!(removed.is_err());

        let stored = f.cards.get_by_id(card.id).await.unwrap().unwrap();
        assert_eq!(stored.modules.len(), 1);
        assert!(stored.modules[0].is_passed);

        // Entries nobody holds can still go.
        sqlx::query("DELETE FROM certification_modules WHERE id = ?")
            .bind(f.syllabus[2].id)
            .execute(pool)
            .await
            .unwrap();
    }
}
