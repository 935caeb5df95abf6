//! Administrative notice model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notice shown to students on their dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: i64,
    /// Display name of the administrator who wrote or last edited the notice
    pub author: String,
    pub text: String,
    /// Re-stamped on every edit
    pub created_at: DateTime<Utc>,
}
