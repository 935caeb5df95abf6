//! Session availability
//!
//! Which training sessions a skill card can subscribe to today.

use crate::db::repositories::SessionRepository;
use crate::models::{Session, SkillCard};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct AvailabilityService {
    sessions: Arc<dyn SessionRepository>,
}

impl AvailabilityService {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// Activated sessions of the card's current certification whose
    /// subscription window is still open on `today`, earliest first.
    ///
    /// An empty list is a normal answer, not an error.
    pub async fn find_available_sessions(&self, card: &SkillCard, today: NaiveDate) -> Result<Vec<Session>> {
        let sessions = self
            .sessions
            .find_available(card.certification_id, today)
            .await
            .with_context(|| format!("Failed to resolve sessions for skill card {}", card.id))?;
        tracing::debug!(
            "{} sessions available for skill card {} on {}",
            sessions.len(),
            card.id,
            today
        );
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifecycleConfig;
    use crate::models::{CertificationDuration, NewSkillCardInput, SessionStatus};
    use crate::services::test_support::{date, datetime, Fixture};
    use crate::services::{CatalogService, SkillCardService};

    #[tokio::test]
    async fn test_resolver_follows_current_certification() {
        let f = Fixture::new().await;
        let lifecycle = SkillCardService::new(
            f.cards.clone(),
            Arc::new(CatalogService::new(f.certifications.clone())),
            &LifecycleConfig::default(),
        );
        let availability = AvailabilityService::new(f.sessions.clone());

        let student = f.student("a@example.com").await;
        let m = f.module("Essentials").await;
        let base = f.certification("Base", Some(CertificationDuration::years(1)), &[(&m, true)]).await;
        let update = f.certification("Update", Some(CertificationDuration::years(1)), &[(&m, true)]).await;
        f.link_update(&base, &update).await;

        let today = date(2026, 10, 19);
        let open = date(2026, 10, 31);
        let base_late = f.session(base.id, datetime(2026, 11, 10, 9), 2, open).await;
        let base_early = f.session(base.id, datetime(2026, 11, 3, 9), 2, open).await;
        // Subscription window closed yesterday
        f.session(base.id, datetime(2026, 10, 25, 9), 2, date(2026, 10, 18)).await;
        let closed = f.session(base.id, datetime(2026, 11, 4, 9), 2, open).await;
        f.sessions.update_status(closed.id, SessionStatus::Closed).await.unwrap();
        let update_session = f.session(update.id, datetime(2026, 11, 5, 9), 2, open).await;

        let card = lifecycle
            .activate(
                NewSkillCardInput {
                    number: "SC-1".to_string(),
                    student_id: student.id,
                    certification_id: base.id,
                    credits: 0,
                    expires_at: None,
                },
                today,
            )
            .await
            .unwrap();

        let ids: Vec<i64> = availability
            .find_available_sessions(&card, today)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![base_early.id, base_late.id]);

        let renewed = lifecycle.renovate(card.id).await.unwrap();
        let ids: Vec<i64> = availability
            .find_available_sessions(&renewed, today)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![update_session.id]);
    }

    #[tokio::test]
    async fn test_no_sessions_is_empty() {
        let f = Fixture::new().await;
        let availability = AvailabilityService::new(f.sessions.clone());
        let student = f.student("a@example.com").await;
        let m = f.module("Essentials").await;
        let cert = f.certification("Cert", None, &[(&m, true)]).await;
        let lifecycle = SkillCardService::new(
            f.cards.clone(),
            Arc::new(CatalogService::new(f.certifications.clone())),
            &LifecycleConfig::default(),
        );
        let card = lifecycle
            .activate(
                NewSkillCardInput {
                    number: "SC-1".to_string(),
                    student_id: student.id,
                    certification_id: cert.id,
                    credits: 0,
                    expires_at: None,
                },
                date(2026, 10, 19),
            )
            .await
            .unwrap();

        assert!(availability.find_available_sessions(&card, date(2026, 10, 19)).await.unwrap().is_empty());
    }
}
