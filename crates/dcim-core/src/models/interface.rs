//! Interface connection domain model.
//!
//! An interface belongs to exactly one hardware item (the owner) and may
//! name another hardware item as its uplink target. The uplink must
//! never point back at the owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConnection {
    pub id: Uuid,
    /// Owning hardware item.
    pub hardware_id: Uuid,
    /// Uplink target (switch-role hardware), if connected.
    pub connected_switch_id: Option<Uuid>,
    pub name: String,
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub speed: Option<String>,
    pub interface_type: Option<String>,
    /// Port label on the uplink switch.
    pub connected_port: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInterfaceConnection {
    pub hardware_id: Uuid,
    pub connected_switch_id: Option<Uuid>,
    pub name: String,
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub speed: Option<String>,
    pub interface_type: Option<String>,
    pub connected_port: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateInterfaceConnection {
    pub hardware_id: Option<Uuid>,
    /// `Some(Some(v))` = reconnect, `Some(None)` = unplug, `None` = no change.
    pub connected_switch_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub speed: Option<String>,
    pub interface_type: Option<String>,
    pub connected_port: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceFilter {
    pub search: Option<String>,
    pub hardware_id: Option<Uuid>,
    pub connected_switch_id: Option<Uuid>,
}
