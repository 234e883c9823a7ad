//! Rack domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::region::Region;
use crate::models::room::Room;
use crate::models::site::Site;
use crate::models::zone::Zone;

/// Default rack height in rack units.
pub const DEFAULT_RACK_UNITS: u32 = 42;

/// A rack inside a room. `unit` is the declared capacity in rack units
/// and bounds the valid `u_position` range of mounted hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rack {
    pub id: Uuid,
    pub room_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRack {
    pub room_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Defaults to [`DEFAULT_RACK_UNITS`] when absent.
    pub unit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRack {
    pub room_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct RackFilter {
    pub search: Option<String>,
    pub name: Option<String>,
    pub room_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackSummary {
    #[serde(flatten)]
    pub rack: Rack,
    pub hardware_count: u64,
}

/// A rack with its full ancestor chain, for standalone display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackDetail {
    pub rack: Rack,
    pub room: Room,
    pub site: Site,
    pub zone: Zone,
    pub region: Region,
}
