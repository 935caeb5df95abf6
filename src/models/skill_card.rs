//! Skill card model
//!
//! A skill card is a student's portfolio for a certification track: the
//! current certification, an optional expiry date, a lifecycle status and the
//! exam modules the student has to pass.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CertificationModule;

/// Skill card lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SkillCardStatus {
    #[default]
    Activated,
    /// Renewal started; waiting for the new certification's modules
    Updating,
    Expired,
}

impl fmt::Display for SkillCardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => write!(f, "activated"),
            Self::Updating => write!(f, "updating"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for SkillCardStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activated" => Ok(Self::Activated),
            "updating" => Ok(Self::Updating),
            "expired" => Ok(Self::Expired),
            _ => Err(anyhow::anyhow!("Invalid skill card status: {}", s)),
        }
    }
}

/// Exam module attached to a skill card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCardModule {
    pub id: i64,
    pub skill_card_id: i64,
    pub module: CertificationModule,
    pub is_passed: bool,
}

impl SkillCardModule {
    /// A fresh, not yet passed entry for `module`. The id is assigned on insert.
    pub fn attach(module: CertificationModule) -> Self {
        Self {
            id: 0,
            skill_card_id: 0,
            module,
            is_passed: false,
        }
    }

    pub fn module_id(&self) -> i64 {
        self.module.module_id()
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}

/// Skill card entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCard {
    pub id: i64,
    pub number: String,
    pub student_id: i64,
    /// Current certification; replaced by the update certification on renewal
    pub certification_id: i64,
    pub credits: i32,
    pub expires_at: Option<NaiveDate>,
    pub status: SkillCardStatus,
    /// Attached modules, oldest first
    pub modules: Vec<SkillCardModule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SkillCard {
    pub fn belongs_to(&self, student_id: i64) -> bool {
        self.student_id == student_id
    }

    pub fn has_module(&self, module_id: i64) -> bool {
        self.modules.iter().any(|m| m.module_id() == module_id)
    }

    /// Modules still to pass, in attachment order
    pub fn modules_not_passed(&self) -> Vec<&SkillCardModule> {
        self.modules.iter().filter(|m| !m.is_passed).collect()
    }

    /// A card can be booked while it is not expired and has modules left to pass
    pub fn is_booking_eligible(&self) -> bool {
        self.status != SkillCardStatus::Expired && self.modules.iter().any(|m| !m.is_passed)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < today)
    }
}

/// Input for activating a new skill card
#[derive(Debug, Clone, Deserialize)]
pub struct NewSkillCardInput {
    pub number: String,
    pub student_id: i64,
    pub certification_id: i64,
    #[serde(default)]
    pub credits: i32,
    /// Explicit expiry; computed from the certification when absent
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
}
