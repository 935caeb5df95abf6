//! Turn allocation
//!
//! A session with `rounds = n` offers turns `0..=n`, turn `t` starting
//! `t` hours after the session. Booked turns are read fresh on every call.

use crate::db::repositories::BookingRepository;
use crate::models::{Session, SkillCard, TurnSlot};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Free turns of `session` given the turns already booked, ascending.
pub fn free_turns(session: &Session, booked: &[i32]) -> Vec<TurnSlot> {
    let booked: BTreeSet<i32> = booked.iter().copied().collect();
    session
        .turns()
        .filter(|turn| !booked.contains(turn))
        .map(|turn| TurnSlot {
            label: session.turn_start(turn).format("%H:%M").to_string(),
            turn,
        })
        .collect()
}

pub struct TurnAllocator {
    bookings: Arc<dyn BookingRepository>,
}

impl TurnAllocator {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Free turns of `session` for `card`.
    ///
    /// Returns an empty list when either side is missing.
    pub async fn compute_free_turns(
        &self,
        session: Option<&Session>,
        card: Option<&SkillCard>,
    ) -> Result<Vec<TurnSlot>> {
        let (Some(session), Some(card)) = (session, card) else {
            return Ok(Vec::new());
        };

        let booked = self
            .bookings
            .booked_turns(session.id, card.id)
            .await
            .context("Failed to load booked turns")?;
        let free = free_turns(session, &booked);
        tracing::debug!(
            "Session {}: {} of {} turns free for skill card {}",
            session.id,
            free.len(),
            session.rounds + 1,
            card.id
        );
        Ok(free)
    }
}
