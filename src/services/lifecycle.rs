//! Skill card lifecycle service
//!
//! Activation, renewal and expiry of skill cards:
//!
//! ```text
//! activate ──► ACTIVATED ──renovate──► UPDATING
//!                  ▲                      │
//!                  └──────renovate────────┘
//! ACTIVATED / UPDATING ──expire──► EXPIRED (terminal)
//! ```
//!
//! Module entries are only ever added by the lifecycle; `is_passed` changes
//! only through `record_module_result`. Every transition is written only if
//! the card still has the status it was read with, so of two concurrent
//! transitions from the same status exactly one applies.

use crate::config::LifecycleConfig;
use crate::db::repositories::SkillCardRepository;
use crate::models::{
    Certification, CertificationDuration, CertificationModule, NewSkillCardInput, SkillCard, SkillCardModule,
    SkillCardStatus,
};
use crate::services::CatalogService;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Error types for lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Certification unusable for a new card
    #[error("Invalid certification: {0}")]
    InvalidCertification(String),

    /// The card's certification declares no update certification
    #[error("No renewal available for skill card {0}")]
    NoRenewalAvailable(i64),

    /// Transition not allowed from the card's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Expiry of a newly activated card.
///
/// Certifications without a duration never expire, so the card gets no
/// expiry regardless of `explicit`. Otherwise an explicit date wins over
/// `today + duration`.
pub fn initial_expiry(
    duration: Option<CertificationDuration>,
    explicit: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let duration = duration?;
    explicit.or_else(|| duration.add_to(today))
}

/// Expiry after switching to a certification valid for `duration`.
///
/// The validity is extended from the previous expiry, never from today.
pub fn renewed_expiry(current: Option<NaiveDate>, duration: Option<CertificationDuration>) -> Option<NaiveDate> {
    match (current, duration) {
        (Some(expiry), Some(duration)) => duration.add_to(expiry).or(current),
        _ => current,
    }
}

/// Attach `modules` not already on the card (by module identity).
///
/// Returns how many entries were added.
pub fn attach_mandatory_modules(card: &mut SkillCard, modules: &[CertificationModule]) -> usize {
    let mut added = 0;
    for module in modules {
        if card.has_module(module.module_id()) {
            continue;
        }
        card.modules.push(SkillCardModule::attach(module.clone()));
        added += 1;
    }
    added
}

pub struct SkillCardService {
    cards: Arc<dyn SkillCardRepository>,
    catalog: Arc<CatalogService>,
    strict_activation: bool,
}

impl SkillCardService {
    pub fn new(cards: Arc<dyn SkillCardRepository>, catalog: Arc<CatalogService>, config: &LifecycleConfig) -> Self {
        Self {
            cards,
            catalog,
            strict_activation: config.strict_activation,
        }
    }

    pub async fn get(&self, card_id: i64) -> Result<Option<SkillCard>, LifecycleError> {
        Ok(self.cards.get_by_id(card_id).await?)
    }

    /// Activate a new skill card.
    ///
    /// # Errors
    /// - `InvalidCertification` if the certification does not exist, or (in
    ///   strict mode) has neither mandatory modules nor an expiry
    pub async fn activate(&self, input: NewSkillCardInput, today: NaiveDate) -> Result<SkillCard, LifecycleError> {
        let certification = self
            .catalog
            .get(input.certification_id)
            .await?
            .ok_or_else(|| {
                LifecycleError::InvalidCertification(format!("certification {} does not exist", input.certification_id))
            })?;
        let mandatory = self.catalog.mandatory_modules(&certification).await?;

        if mandatory.is_empty() && !certification.has_expiry() {
            if self.strict_activation {
                return Err(LifecycleError::InvalidCertification(format!(
                    "certification '{}' has no mandatory modules and no expiry",
                    certification.name
                )));
            }
            tracing::warn!(
                "Activating skill card {} on certification '{}' with no mandatory modules and no expiry",
                input.number,
                certification.name
            );
        }

        if input.expires_at.is_some() && !certification.has_expiry() {
            tracing::warn!(
                "Ignoring expiry for skill card {}: certification '{}' does not expire",
                input.number,
                certification.name
            );
        }

        let now = Utc::now();
        let mut card = SkillCard {
            id: 0,
            number: input.number,
            student_id: input.student_id,
            certification_id: certification.id,
            credits: input.credits,
            expires_at: initial_expiry(certification.duration, input.expires_at, today),
            status: SkillCardStatus::Activated,
            modules: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        attach_mandatory_modules(&mut card, &mandatory);

        let card = self.cards.create(&card).await?;
        tracing::info!(
            "Activated skill card {} ({}) with {} modules",
            card.number,
            card.id,
            card.modules.len()
        );
        Ok(card)
    }

    /// Advance the renewal cycle of a card.
    ///
    /// ACTIVATED switches to the update certification and becomes UPDATING;
    /// UPDATING goes back to ACTIVATED. Only starting a renewal needs an
    /// update certification: an UPDATING card already holds it.
    ///
    /// # Errors
    /// - `NotFound` if the card does not exist
    /// - `NoRenewalAvailable` if the current certification has no update
    /// - `InvalidState` if the card is expired or changed status meanwhile
    pub async fn renovate(&self, card_id: i64) -> Result<SkillCard, LifecycleError> {
        let mut card = self.load(card_id).await?;
        let from = card.status;

        match from {
            SkillCardStatus::Activated => {
                let current = self.certification_of(&card).await?;
                let update = self
                    .catalog
                    .update_certification(&current)
                    .await?
                    .ok_or(LifecycleError::NoRenewalAvailable(card_id))?;
                let mandatory = self.catalog.mandatory_modules(&update).await?;

                card.certification_id = update.id;
                let added = attach_mandatory_modules(&mut card, &mandatory);
                card.expires_at = renewed_expiry(card.expires_at, update.duration);
                card.status = SkillCardStatus::Updating;
                tracing::debug!(
                    "Skill card {} switching to certification '{}' ({} new modules)",
                    card.id,
                    update.name,
                    added
                );
            }
            SkillCardStatus::Updating => {
                card.status = SkillCardStatus::Activated;
            }
            SkillCardStatus::Expired => {
                return Err(LifecycleError::InvalidState(format!(
                    "skill card {} is expired and cannot be renewed",
                    card_id
                )));
            }
        }

        let card = self
            .cards
            .update(&card, from)
            .await?
            .ok_or_else(|| changed_meanwhile(card_id, from))?;
        tracing::info!(
            "Skill card {} renovated: {} -> {} (certification {})",
            card.id,
            from,
            card.status,
            card.certification_id
        );
        Ok(card)
    }

    /// Move a card to EXPIRED
    pub async fn expire(&self, card_id: i64) -> Result<SkillCard, LifecycleError> {
        let mut card = self.load(card_id).await?;
        let from = card.status;
        if from == SkillCardStatus::Expired {
            return Err(LifecycleError::InvalidState(format!(
                "skill card {} is already expired",
                card_id
            )));
        }
        card.status = SkillCardStatus::Expired;
        let card = self
            .cards
            .update(&card, from)
            .await?
            .ok_or_else(|| changed_meanwhile(card_id, from))?;
        tracing::info!("Skill card {} expired", card.id);
        Ok(card)
    }

    /// Expire every non-expired card whose expiry date is before `today`.
    ///
    /// Returns the ids of the cards that were expired.
    pub async fn expire_overdue(&self, today: NaiveDate) -> Result<Vec<i64>, LifecycleError> {
        let mut expired = Vec::new();
        for card_id in self.cards.list_overdue(today).await? {
            let Some(mut card) = self.cards.get_by_id(card_id).await? else {
                continue;
            };
            let from = card.status;
            if from == SkillCardStatus::Expired || !card.is_overdue(today) {
                continue;
            }
            card.status = SkillCardStatus::Expired;
            if self.cards.update(&card, from).await?.is_none() {
                tracing::debug!("Skill card {} changed while expiring, skipped", card_id);
                continue;
            }
            expired.push(card_id);
        }
        if !expired.is_empty() {
            tracing::info!("Expired {} overdue skill cards", expired.len());
        }
        Ok(expired)
    }

    /// Whether `renovate` can be offered for the card
    pub async fn renewal_available(&self, card: &SkillCard) -> Result<bool, LifecycleError> {
        let certification = self.certification_of(card).await?;
        Ok(certification.is_renewable())
    }

    /// Record an exam result for the card's entry of `module_id`
    pub async fn record_module_result(
        &self,
        card_id: i64,
        module_id: i64,
        passed: bool,
    ) -> Result<SkillCard, LifecycleError> {
        let card = self.load(card_id).await?;
        let entry = card
            .modules
            .iter()
            .find(|m| m.module_id() == module_id)
            .ok_or_else(|| {
                LifecycleError::NotFound(format!("module {} is not attached to skill card {}", module_id, card_id))
            })?;

        self.cards.set_module_passed(card.id, entry.id, passed).await?;
        tracing::info!(
            "Skill card {} module {} marked {}",
            card_id,
            module_id,
            if passed { "passed" } else { "not passed" }
        );
        self.load(card_id).await
    }

    async fn load(&self, card_id: i64) -> Result<SkillCard, LifecycleError> {
        self.cards
            .get_by_id(card_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("skill card {}", card_id)))
    }

    async fn certification_of(&self, card: &SkillCard) -> Result<Certification, LifecycleError> {
        self.catalog
            .get(card.certification_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("certification {}", card.certification_id)))
    }
}

fn changed_meanwhile(card_id: i64, from: SkillCardStatus) -> LifecycleError {
    LifecycleError::InvalidState(format!("skill card {} is no longer {}", card_id, from))
}
