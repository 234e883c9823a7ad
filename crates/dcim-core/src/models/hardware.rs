//! Hardware domain model — a physical item mounted in a rack.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::hardware_info::HardwareInfo;
use crate::models::hardware_type::HardwareType;
use crate::models::interface::InterfaceConnection;
use crate::models::tenant::Tenant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HardwareStatus {
    #[default]
    Active,
    Maintenance,
    Failed,
    Offline,
    Reserved,
    Deprecated,
}

impl HardwareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Failed => "failed",
            Self::Offline => "offline",
            Self::Reserved => "reserved",
            Self::Deprecated => "deprecated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "maintenance" => Some(Self::Maintenance),
            "failed" => Some(Self::Failed),
            "offline" => Some(Self::Offline),
            "reserved" => Some(Self::Reserved),
            "deprecated" => Some(Self::Deprecated),
            _ => None,
        }
    }
}

/// A physical hardware item. Mounted in exactly one rack, instantiating
/// exactly one catalog model, optionally owned by a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hardware {
    pub id: Uuid,
    pub rack_id: Uuid,
    pub hardware_info_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub status: HardwareStatus,
    /// Unique globally when present.
    pub serial_number: Option<String>,
    /// Out-of-band management address.
    pub oob_ip: Option<String>,
    pub specifications: Option<String>,
    pub note: Option<String>,
    /// Lowest occupied rack unit; occupied range is
    /// `u_position ..= u_position + info.height - 1`.
    pub u_position: Option<u32>,
    pub warranty_start: Option<DateTime<Utc>>,
    pub warranty_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHardware {
    pub rack_id: Uuid,
    pub hardware_info_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    /// Defaults to `active` when absent.
    pub status: Option<HardwareStatus>,
    pub serial_number: Option<String>,
    pub oob_ip: Option<String>,
    pub specifications: Option<String>,
    pub note: Option<String>,
    pub u_position: Option<u32>,
    pub warranty_start: Option<DateTime<Utc>>,
    pub warranty_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateHardware {
    pub rack_id: Option<Uuid>,
    pub hardware_info_id: Option<Uuid>,
    /// `Some(Some(v))` = reassign, `Some(None)` = clear, `None` = no change.
    pub tenant_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub status: Option<HardwareStatus>,
    pub serial_number: Option<String>,
    pub oob_ip: Option<String>,
    pub specifications: Option<String>,
    pub note: Option<String>,
    /// `Some(Some(v))` = move, `Some(None)` = unmount, `None` = no change.
    pub u_position: Option<Option<u32>>,
    pub warranty_start: Option<DateTime<Utc>>,
    pub warranty_end: Option<DateTime<Utc>>,
}

/// List filters. `search` matches the item's name/serial and the related
/// model's manufacturer/model; `hardware_type_id` filters through the
/// catalog relation.
#[derive(Debug, Clone, Default)]
pub struct HardwareFilter {
    pub search: Option<String>,
    pub name: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<HardwareStatus>,
    pub rack_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub hardware_type_id: Option<Uuid>,
}

/// A hardware item with its catalog chain, owner and owned interfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareDetail {
    pub hardware: Hardware,
    pub info: HardwareInfo,
    pub hardware_type: HardwareType,
    pub tenant: Option<Tenant>,
    pub interfaces: Vec<InterfaceConnection>,
}
