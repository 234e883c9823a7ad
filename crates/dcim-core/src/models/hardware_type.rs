//! Hardware type domain model (catalog level 1, e.g. "Switch", "Server").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareType {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHardwareType {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateHardwareType {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HardwareTypeFilter {
    pub search: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
}

/// Type list row with its usage count, aggregated through the
/// intermediate hardware models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareTypeSummary {
    #[serde(flatten)]
    pub hardware_type: HardwareType,
    pub hardware_count: u64,
}
