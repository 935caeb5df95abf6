//! Booking model
//!
//! This module provides:
//! - `Booking`, one student's reservation of a session turn
//! - `BookingRequest`, the raw ids submitted by the booking form
//! - `BookingSelection` / `ChoiceSet`, the cascading choices the form offers
//! - `TurnSlot`, a free turn with its human-readable start label

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Session, SkillCard, SkillCardModule};

/// Booking entity. At most one booking exists per `(session_id, turn)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub student_id: i64,
    pub skill_card_id: i64,
    /// The skill card module being attempted
    pub skill_card_module_id: i64,
    pub session_id: i64,
    pub turn: i32,
    pub created_at: DateTime<Utc>,
}

/// Booking form submission. Every id comes from the client and is validated.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub student_id: i64,
    pub skill_card_id: i64,
    pub skill_card_module_id: i64,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub turn: Option<i32>,
}

/// Current state of the booking form, used to derive the dependent choices
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingSelection {
    pub student_id: i64,
    #[serde(default)]
    pub skill_card_id: Option<i64>,
    #[serde(default)]
    pub session_id: Option<i64>,
}

/// Free turn of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSlot {
    /// Start time formatted as `HH:MM`
    pub label: String,
    pub turn: i32,
}

/// Choices offered by each field of the booking form.
///
/// skill card → (modules, sessions) → turns: a field is empty until the
/// field it depends on has a valid selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChoiceSet {
    pub skill_cards: Vec<SkillCard>,
    pub modules: Vec<SkillCardModule>,
    pub sessions: Vec<Session>,
    pub turns: Vec<TurnSlot>,
}
