//! Hardware info domain model (catalog level 2, a manufacturer model).
//!
//! `height` is the authoritative U-height of every physical item of this
//! model; hardware rows store no height of their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default model height in rack units.
pub const DEFAULT_MODEL_HEIGHT: u32 = 1;

/// A catalog model, e.g. (Cisco, 2960). The (manufacturer, model) pair
/// is unique globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub id: Uuid,
    pub hardware_type_id: Uuid,
    pub manufacturer: String,
    pub model: String,
    /// Height in rack units.
    pub height: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHardwareInfo {
    pub hardware_type_id: Uuid,
    pub manufacturer: String,
    pub model: String,
    /// Defaults to [`DEFAULT_MODEL_HEIGHT`] when absent.
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateHardwareInfo {
    pub hardware_type_id: Option<Uuid>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct HardwareInfoFilter {
    pub search: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub hardware_type_id: Option<Uuid>,
}

/// Model list row with the number of physical items referencing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfoSummary {
    #[serde(flatten)]
    pub info: HardwareInfo,
    pub hardware_count: u64,
}
