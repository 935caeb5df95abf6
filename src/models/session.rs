//! Training session model
//!
//! A session trains or examines one certification. It starts at `starts_at`
//! and offers `rounds + 1` hourly turns (turn `t` starts `t` hours later).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Activated,
    Suspended,
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => write!(f, "activated"),
            Self::Suspended => write!(f, "suspended"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activated" => Ok(Self::Activated),
            "suspended" => Ok(Self::Suspended),
            "closed" => Ok(Self::Closed),
            _ => Err(anyhow::anyhow!("Invalid session status: {}", s)),
        }
    }
}

/// Training session entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub certification_id: i64,
    /// Start of turn 0, in the training centre's local time
    pub starts_at: NaiveDateTime,
    /// Additional hourly turns after the first; valid turns are `0..=rounds`
    pub rounds: i32,
    /// Last day students may subscribe
    pub subscribe_expire_date: NaiveDate,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Every turn index of the session, ascending
    pub fn turns(&self) -> impl Iterator<Item = i32> {
        0..=self.rounds
    }

    /// Start time of `turn`
    pub fn turn_start(&self, turn: i32) -> NaiveDateTime {
        self.starts_at + Duration::hours(i64::from(turn))
    }
}

/// Input for scheduling a session
#[derive(Debug, Clone, Deserialize)]
pub struct NewSessionInput {
    pub certification_id: i64,
    pub starts_at: NaiveDateTime,
    #[serde(default)]
    pub rounds: i32,
    pub subscribe_expire_date: NaiveDate,
    #[serde(default)]
    pub status: SessionStatus,
}
