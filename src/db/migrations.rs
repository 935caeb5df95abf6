//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! backend, and tracked in a `_migrations` ledger table so each runs once.
//!
//! ```ignore
//! use skillbook::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (unique, ascending)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_students",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                birth_date DATE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_students_email ON students(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS students (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                birth_date DATE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_students_email ON students(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_certifications",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS certifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(150) NOT NULL UNIQUE,
                duration VARCHAR(32),
                update_certification_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (update_certification_id) REFERENCES certifications(id) ON DELETE SET NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS certifications (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(150) NOT NULL UNIQUE,
                duration VARCHAR(32),
                update_certification_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (update_certification_id) REFERENCES certifications(id) ON DELETE SET NULL
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_modules",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(150) NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS certification_modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                certification_id INTEGER NOT NULL,
                module_id INTEGER NOT NULL,
                mandatory BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (certification_id) REFERENCES certifications(id) ON DELETE CASCADE,
                FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE,
                UNIQUE (certification_id, module_id)
            );
            CREATE INDEX IF NOT EXISTS idx_certification_modules_cert ON certification_modules(certification_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS modules (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(150) NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS certification_modules (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                certification_id BIGINT NOT NULL,
                module_id BIGINT NOT NULL,
                mandatory BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (certification_id) REFERENCES certifications(id) ON DELETE CASCADE,
                FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE,
                UNIQUE KEY uq_certification_module (certification_id, module_id)
            );
            CREATE INDEX idx_certification_modules_cert ON certification_modules(certification_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_skill_cards",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS skill_cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number VARCHAR(64) NOT NULL UNIQUE,
                student_id INTEGER NOT NULL,
                certification_id INTEGER NOT NULL,
                credits INTEGER NOT NULL DEFAULT 0,
                expires_at DATE,
                status VARCHAR(20) NOT NULL DEFAULT 'activated',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE,
                FOREIGN KEY (certification_id) REFERENCES certifications(id)
            );
            CREATE INDEX IF NOT EXISTS idx_skill_cards_student ON skill_cards(student_id);
            CREATE INDEX IF NOT EXISTS idx_skill_cards_expiry ON skill_cards(status, expires_at);
            CREATE TABLE IF NOT EXISTS skill_card_modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                skill_card_id INTEGER NOT NULL,
                certification_module_id INTEGER NOT NULL,
                module_id INTEGER NOT NULL,
                is_passed BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (skill_card_id) REFERENCES skill_cards(id) ON DELETE CASCADE,
                FOREIGN KEY (certification_module_id) REFERENCES certification_modules(id) ON DELETE RESTRICT,
                FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE RESTRICT,
                UNIQUE (skill_card_id, module_id)
            );
            CREATE INDEX IF NOT EXISTS idx_skill_card_modules_card ON skill_card_modules(skill_card_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS skill_cards (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                number VARCHAR(64) NOT NULL UNIQUE,
                student_id BIGINT NOT NULL,
                certification_id BIGINT NOT NULL,
                credits INT NOT NULL DEFAULT 0,
                expires_at DATE,
                status VARCHAR(20) NOT NULL DEFAULT 'activated',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE,
                FOREIGN KEY (certification_id) REFERENCES certifications(id)
            );
            CREATE INDEX idx_skill_cards_student ON skill_cards(student_id);
            CREATE INDEX idx_skill_cards_expiry ON skill_cards(status, expires_at);
            CREATE TABLE IF NOT EXISTS skill_card_modules (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                skill_card_id BIGINT NOT NULL,
                certification_module_id BIGINT NOT NULL,
                module_id BIGINT NOT NULL,
                is_passed BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (skill_card_id) REFERENCES skill_cards(id) ON DELETE CASCADE,
                FOREIGN KEY (certification_module_id) REFERENCES certification_modules(id) ON DELETE RESTRICT,
                FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE RESTRICT,
                UNIQUE KEY uq_skill_card_module (skill_card_id, module_id)
            );
            CREATE INDEX idx_skill_card_modules_card ON skill_card_modules(skill_card_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                certification_id INTEGER NOT NULL,
                starts_at DATETIME NOT NULL,
                rounds INTEGER NOT NULL DEFAULT 0 CHECK (rounds >= 0),
                subscribe_expire_date DATE NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'activated',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (certification_id) REFERENCES certifications(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_availability ON sessions(certification_id, status, subscribe_expire_date);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                certification_id BIGINT NOT NULL,
                starts_at DATETIME NOT NULL,
                rounds INT NOT NULL DEFAULT 0,
                subscribe_expire_date DATE NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'activated',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (certification_id) REFERENCES certifications(id) ON DELETE CASCADE,
                CHECK (rounds >= 0)
            );
            CREATE INDEX idx_sessions_availability ON sessions(certification_id, status, subscribe_expire_date);
        "#,
    },
    Migration {
        version: 6,
        name: "create_bookings",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                skill_card_id INTEGER NOT NULL,
                skill_card_module_id INTEGER NOT NULL,
                session_id INTEGER NOT NULL,
                turn INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE,
                FOREIGN KEY (skill_card_id) REFERENCES skill_cards(id) ON DELETE CASCADE,
                FOREIGN KEY (skill_card_module_id) REFERENCES skill_card_modules(id) ON DELETE CASCADE,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
                UNIQUE (session_id, turn)
            );
            CREATE INDEX IF NOT EXISTS idx_bookings_session_card ON bookings(session_id, skill_card_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_student ON bookings(student_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                student_id BIGINT NOT NULL,
                skill_card_id BIGINT NOT NULL,
                skill_card_module_id BIGINT NOT NULL,
                session_id BIGINT NOT NULL,
                turn INT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE,
                FOREIGN KEY (skill_card_id) REFERENCES skill_cards(id) ON DELETE CASCADE,
                FOREIGN KEY (skill_card_module_id) REFERENCES skill_card_modules(id) ON DELETE CASCADE,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
                UNIQUE KEY uq_booking_slot (session_id, turn)
            );
            CREATE INDEX idx_bookings_session_card ON bookings(session_id, skill_card_id);
            CREATE INDEX idx_bookings_student ON bookings(student_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_notices",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS notices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author VARCHAR(150) NOT NULL,
                text TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_notices_created_at ON notices(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS notices (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                author VARCHAR(150) NOT NULL,
                text TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_notices_created_at ON notices(created_at);
        "#,
    },
];

/// Run all pending migrations, returning how many were applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied_versions.contains(&i64::from(migration.version)) {
            continue;
        }
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.backend()? {
        Backend::Sqlite(pool) => get_applied_migrations_sqlite(pool).await,
        Backend::Mysql(pool) => get_applied_migrations_mysql(pool).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: i64::from(row.get::<i32, _>("version")),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.backend()? {
        Backend::Sqlite(pool) => apply_migration_sqlite(pool, migration).await,
        Backend::Mysql(pool) => apply_migration_mysql(pool, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split a migration body into trimmed statements, dropping comment-only chunks.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(applied.len() == MIGRATIONS.len())
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert!(!is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");

        assert!(is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[test]
    fn test_migration_versions_are_ascending() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[tokio::test]
    async fn test_booking_slot_is_unique() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        for sql in [
            "INSERT INTO students (first_name, last_name, email) VALUES ('Ada', 'Lovelace', 'ada@example.com')",
            "INSERT INTO certifications (name) VALUES ('Base')",
            "INSERT INTO modules (name) VALUES ('Word processing')",
            "INSERT INTO certification_modules (certification_id, module_id, mandatory) VALUES (1, 1, 1)",
            "INSERT INTO skill_cards (number, student_id, certification_id) VALUES ('SC-1', 1, 1)",
            "INSERT INTO skill_card_modules (skill_card_id, certification_module_id, module_id) VALUES (1, 1, 1)",
            "INSERT INTO sessions (certification_id, starts_at, rounds, subscribe_expire_date) VALUES (1, '2026-11-02 09:00:00', 3, '2026-10-30')",
            "INSERT INTO bookings (student_id, skill_card_id, skill_card_module_id, session_id, turn) VALUES (1, 1, 1, 1, 2)",
        ] {
            sqlx::query(sql).execute(sqlite).await.expect(sql);
        }

        let duplicate = sqlx::query(
            "INSERT INTO bookings (student_id, skill_card_id, skill_card_module_id, session_id, turn) VALUES (1, 1, 1, 1, 2)",
        )
        .execute(sqlite)
        .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_deleting_skill_card_cascades_to_modules() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        for sql in [
            "INSERT INTO students (first_name, last_name, email) VALUES ('Ada', 'Lovelace', 'ada@example.com')",
            "INSERT INTO certifications (name) VALUES ('Base')",
            "INSERT INTO modules (name) VALUES ('Spreadsheets')",
            "INSERT INTO certification_modules (certification_id, module_id, mandatory) VALUES (1, 1, 1)",
            "INSERT INTO skill_cards (number, student_id, certification_id) VALUES ('SC-1', 1, 1)",
            "INSERT INTO skill_card_modules (skill_card_id, certification_module_id, module_id) VALUES (1, 1, 1)",
            "DELETE FROM skill_cards WHERE id = 1",
        ] {
            sqlx::query(sql).execute(sqlite).await.expect(sql);
        }

        let row = sqlx::query("SELECT COUNT(*) as count FROM skill_card_modules")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("count"), 0);
    }

    #[test]
    fn test_split_sql_statements() {
        let statements = split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);

        let with_comments = "-- leading comment\n;CREATE TABLE c (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(with_comments), vec!["CREATE TABLE c (id INT)"]);
    }
}
