//! Certification catalog models
//!
//! This module provides:
//! - `Certification` with its validity period and optional renewal target
//! - `CertificationDuration`, an ISO-8601 style period (`P1Y6M`, `P90D`)
//! - `Module` and `CertificationModule`, the exam components of a certification

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exam module shared between certifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub name: String,
}

/// A module as it appears in a certification's syllabus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationModule {
    pub id: i64,
    pub certification_id: i64,
    pub module: Module,
    /// Mandatory modules are attached to every skill card activated under
    /// the certification
    pub mandatory: bool,
}

impl CertificationModule {
    /// Identity of the underlying exam module
    pub fn module_id(&self) -> i64 {
        self.module.id
    }
}

/// Certification entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// Validity period; `None` means the certification never expires
    pub duration: Option<CertificationDuration>,
    /// Certification a skill card switches to when renewed
    pub update_certification_id: Option<i64>,
    /// Syllabus, mandatory and optional modules
    #[serde(default)]
    pub modules: Vec<CertificationModule>,
    pub created_at: DateTime<Utc>,
}

impl Certification {
    pub fn new(name: String, duration: Option<CertificationDuration>) -> Self {
        Self {
            id: 0,
            name,
            duration,
            update_certification_id: None,
            modules: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_expiry(&self) -> bool {
        self.duration.is_some()
    }

    pub fn is_renewable(&self) -> bool {
        self.update_certification_id.is_some()
    }

    pub fn mandatory_modules(&self) -> impl Iterator<Item = &CertificationModule> {
        self.modules.iter().filter(|m| m.mandatory)
    }
}

/// Calendar period a certification stays valid for.
///
/// Months are added with end-of-month clamping (Jan 31 + 1 month = Feb 28/29),
/// then days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CertificationDuration {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl CertificationDuration {
    pub fn new(years: u32, months: u32, days: u32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }

    pub fn years(years: u32) -> Self {
        Self::new(years, 0, 0)
    }

    pub fn months(months: u32) -> Self {
        Self::new(0, months, 0)
    }

    pub fn days(days: u32) -> Self {
        Self::new(0, 0, days)
    }

    /// Add the period to a date; `None` if the result leaves chrono's range.
    pub fn add_to(&self, date: NaiveDate) -> Option<NaiveDate> {
        let months = self.years.checked_mul(12)?.checked_add(self.months)?;
        date.checked_add_months(Months::new(months))?
            .checked_add_days(Days::new(u64::from(self.days)))
    }
}

impl fmt::Display for CertificationDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P")?;
        if self.years == 0 && self.months == 0 && self.days == 0 {
            return write!(f, "0D");
        }
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        Ok(())
    }
}

impl FromStr for CertificationDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix('P')
            .ok_or_else(|| anyhow::anyhow!("Invalid duration (missing 'P'): {}", s))?;
        if body.is_empty() {
            anyhow::bail!("Invalid duration (no components): {}", s);
        }

        let mut duration = Self::default();
        let mut digits = String::new();
        let mut last_rank = 0;
        for c in body.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let rank = match c {
                'Y' => 1,
                'M' => 2,
                'D' => 3,
                _ => anyhow::bail!("Invalid duration designator '{}' in {}", c, s),
            };
            if digits.is_empty() || rank <= last_rank {
                anyhow::bail!("Invalid duration: {}", s);
            }
            let value: u32 = digits
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid duration value in {}", s))?;
            match rank {
                1 => duration.years = value,
                2 => duration.months = value,
                _ => duration.days = value,
            }
            digits.clear();
            last_rank = rank;
        }
        if !digits.is_empty() {
            anyhow::bail!("Invalid duration (trailing number): {}", s);
        }

        Ok(duration)
    }
}

impl Serialize for CertificationDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CertificationDuration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
