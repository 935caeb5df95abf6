//! Shared fixtures for service tests

use crate::db::repositories::{
    BookingRepository, CertificationRepository, SessionRepository, SkillCardRepository, SqlxBookingRepository,
    SqlxCertificationRepository, SqlxSessionRepository, SqlxSkillCardRepository, SqlxStudentRepository,
    StudentRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{
    Certification, CertificationDuration, Module, NewSessionInput, Session, SessionStatus, Student,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

pub struct Fixture {
    pub pool: DynDatabasePool,
    pub certifications: Arc<dyn CertificationRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub cards: Arc<dyn SkillCardRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Fixture {
    pub async fn new() -> Self {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: DynDatabasePool) -> Self {
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        Self {
            certifications: SqlxCertificationRepository::boxed(pool.clone()),
            students: SqlxStudentRepository::boxed(pool.clone()),
            cards: SqlxSkillCardRepository::boxed(pool.clone()),
            sessions: SqlxSessionRepository::boxed(pool.clone()),
            bookings: SqlxBookingRepository::boxed(pool.clone()),
            pool,
        }
    }

    pub async fn student(&self, email: &str) -> Student {
        self.students
            .create(&Student::new("Test".to_string(), "Student".to_string(), email.to_string()))
            .await
            .expect("Failed to create student")
    }

    pub async fn module(&self, name: &str) -> Module {
        self.certifications.create_module(name).await.expect("Failed to create module")
    }

    /// Create a certification with `(module, mandatory)` syllabus entries, reloaded
    pub async fn certification(
        &self,
        name: &str,
        duration: Option<CertificationDuration>,
        syllabus: &[(&Module, bool)],
    ) -> Certification {
        let cert = self
            .certifications
            .create(&Certification::new(name.to_string(), duration))
            .await
            .expect("Failed to create certification");
        for (module, mandatory) in syllabus {
            self.certifications
                .add_module(cert.id, module.id, *mandatory)
                .await
                .expect("Failed to add module");
        }
        self.certifications.get_by_id(cert.id).await.unwrap().expect("certification")
    }

    pub async fn link_update(&self, base: &Certification, update: &Certification) {
        self.certifications
            .set_update_certification(base.id, Some(update.id))
            .await
            .expect("Failed to link update certification");
    }

    pub async fn session(
        &self,
        certification_id: i64,
        starts_at: NaiveDateTime,
        rounds: i32,
        subscribe_expire_date: NaiveDate,
    ) -> Session {
        self.sessions
            .create(&NewSessionInput {
                certification_id,
                starts_at,
                rounds,
                subscribe_expire_date,
                status: SessionStatus::Activated,
            })
            .await
            .expect("Failed to create session")
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn datetime(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(hour, 0, 0).expect("valid time")
}
