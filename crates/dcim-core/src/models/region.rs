//! Region domain model — the root of the containment hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geographic region (e.g. `APAC`). Region names are unique globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegion {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRegion {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// List filters. `search` matches name/description case-insensitively;
/// `name` is an exact match.
#[derive(Debug, Clone, Default)]
pub struct RegionFilter {
    pub search: Option<String>,
    pub name: Option<String>,
}

/// Region list row annotated with its immediate-child count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSummary {
    #[serde(flatten)]
    pub region: Region,
    pub zone_count: u64,
}
