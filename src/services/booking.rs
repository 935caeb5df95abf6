//! Booking service
//!
//! Validates a booking request step by step and persists it:
//! 1. the skill card belongs to the student
//! 2. the card is eligible and the module is one it still has to pass
//! 3. the session is available to the card today
//! 4. the turn is free
//! 5. the slot is claimed atomically
//!
//! Every id in a request comes from the client; nothing is trusted until it
//! has been matched against fresh database state.

use crate::db::repositories::{BookingRepository, SessionRepository, SkillCardRepository};
use crate::models::{Booking, BookingRequest, BookingSelection, ChoiceSet, SkillCard};
use crate::services::{AvailabilityService, TurnAllocator};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Error types for booking operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// The skill card belongs to another student
    #[error("Skill card {0} does not belong to the student")]
    Ownership(i64),

    /// The skill card is expired or has no module left to pass
    #[error("Skill card {0} cannot be booked")]
    NotEligible(i64),

    /// The module is not an unpassed module of the skill card
    #[error("Module {0} cannot be booked with this skill card")]
    InvalidModule(i64),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Unknown skill card: {0}")]
    UnknownSkillCard(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct BookingService {
    cards: Arc<dyn SkillCardRepository>,
    bookings: Arc<dyn BookingRepository>,
    availability: AvailabilityService,
    allocator: TurnAllocator,
}

impl BookingService {
    pub fn new(
        cards: Arc<dyn SkillCardRepository>,
        sessions: Arc<dyn SessionRepository>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self {
            cards,
            availability: AvailabilityService::new(sessions),
            allocator: TurnAllocator::new(bookings.clone()),
            bookings,
        }
    }

    /// Validate and persist a booking.
    ///
    /// Nothing is written unless every check passes. A concurrent booking
    /// of the same `(session, turn)` surfaces as `SlotUnavailable`.
    pub async fn book(&self, request: &BookingRequest, today: NaiveDate) -> Result<Booking, BookingError> {
        match self.try_book(request, today).await {
            Ok(booking) => {
                tracing::info!(
                    "Student {} booked session {} turn {} (skill card {})",
                    booking.student_id,
                    booking.session_id,
                    booking.turn,
                    booking.skill_card_id
                );
                Ok(booking)
            }
            Err(e @ BookingError::InternalError(_)) => Err(e),
            Err(e) => {
                tracing::warn!(
                    "Booking rejected for student {} (skill card {}): {}",
                    request.student_id,
                    request.skill_card_id,
                    e
                );
                Err(e)
            }
        }
    }

    async fn try_book(&self, request: &BookingRequest, today: NaiveDate) -> Result<Booking, BookingError> {
        let card = self
            .cards
            .get_by_id(request.skill_card_id)
            .await
            .context("Failed to load skill card")?
            .ok_or(BookingError::UnknownSkillCard(request.skill_card_id))?;
        if !card.belongs_to(request.student_id) {
            return Err(BookingError::Ownership(card.id));
        }

        if !card.is_booking_eligible() {
            return Err(BookingError::NotEligible(card.id));
        }
        let module = card
            .modules_not_passed()
            .into_iter()
            .find(|m| m.id == request.skill_card_module_id)
            .ok_or(BookingError::InvalidModule(request.skill_card_module_id))?;

        let session_id = request
            .session_id
            .ok_or_else(|| BookingError::InvalidSession("no session selected".to_string()))?;
        let sessions = self.availability.find_available_sessions(&card, today).await?;
        let session = sessions
            .iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| BookingError::InvalidSession(format!("session {} is not available", session_id)))?;

        let turn = request
            .turn
            .ok_or_else(|| BookingError::SlotUnavailable("no turn selected".to_string()))?;
        let free = self.allocator.compute_free_turns(Some(session), Some(&card)).await?;
        if !free.iter().any(|slot| slot.turn == turn) {
            return Err(BookingError::SlotUnavailable(format!(
                "turn {} of session {} is not free",
                turn, session.id
            )));
        }

        let booking = Booking {
            id: 0,
            student_id: request.student_id,
            skill_card_id: card.id,
            skill_card_module_id: module.id,
            session_id: session.id,
            turn,
            created_at: Utc::now(),
        };
        self.bookings
            .insert_if_absent(&booking)
            .await?
            .ok_or_else(|| {
                BookingError::SlotUnavailable(format!("turn {} of session {} was just taken", turn, session.id))
            })
    }

    /// Recompute the booking form's dependent choices from its current selection.
    ///
    /// A selection that is not valid (foreign or ineligible card, unavailable
    /// session) leaves the dependent fields empty.
    pub async fn derive_dependent_choices(
        &self,
        selection: &BookingSelection,
        today: NaiveDate,
    ) -> Result<ChoiceSet, BookingError> {
        let skill_cards: Vec<SkillCard> = self
            .cards
            .list_by_student(selection.student_id)
            .await
            .context("Failed to list skill cards")?
            .into_iter()
            .filter(SkillCard::is_booking_eligible)
            .collect();

        let mut choices = ChoiceSet::default();
        let card = selection
            .skill_card_id
            .and_then(|id| skill_cards.iter().find(|c| c.id == id));

        if let Some(card) = card {
            choices.modules = card.modules_not_passed().into_iter().cloned().collect();
            choices.sessions = self.availability.find_available_sessions(card, today).await?;

            let session = selection
                .session_id
                .and_then(|id| choices.sessions.iter().find(|s| s.id == id));
            choices.turns = self.allocator.compute_free_turns(session, Some(card)).await?;
        }

        choices.skill_cards = skill_cards;
        Ok(choices)
    }

    pub async fn list_by_student(&self, student_id: i64) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.list_by_student(student_id).await?)
    }
}
