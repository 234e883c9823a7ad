//! SurrealDB implementation of [`InterfaceRepository`].
//!
//! An interface is owned by one hardware item and may uplink into
//! another. Owner and uplink are deliberately separate queries: listing
//! for a device returns what it owns, not what plugs into it.

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::interface::{
    CreateInterfaceConnection, InterfaceConnection, InterfaceFilter, UpdateInterfaceConnection,
};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::InterfaceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists};

const SORTABLE: &[&str] = &["name", "speed", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "ip_address", "mac_address"];

#[derive(Debug, SurrealValue)]
struct InterfaceRow {
    hardware_id: String,
    connected_switch_id: Option<String>,
    name: String,
    mac_address: Option<String>,
    ip_address: Option<String>,
    speed: Option<String>,
    interface_type: Option<String>,
    connected_port: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InterfaceRow {
    fn into_interface(self, id: Uuid) -> Result<InterfaceConnection, DbError> {
        let hardware_id = Uuid::parse_str(&self.hardware_id)
            .map_err(|e| DbError::Query(format!("invalid hardware UUID: {e}")))?;
        let connected_switch_id = self
            .connected_switch_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| DbError::Query(format!("invalid switch UUID: {e}")))?;
        Ok(InterfaceConnection {
            id,
            hardware_id,
            connected_switch_id,
            name: self.name,
            mac_address: self.mac_address,
            ip_address: self.ip_address,
            speed: self.speed,
            interface_type: self.interface_type,
            connected_port: self.connected_port,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct InterfaceRowWithId {
    record_id: String,
    hardware_id: String,
    connected_switch_id: Option<String>,
    name: String,
    mac_address: Option<String>,
    ip_address: Option<String>,
    speed: Option<String>,
    interface_type: Option<String>,
    connected_port: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InterfaceRowWithId {
    fn try_into_interface(self) -> Result<InterfaceConnection, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let row = InterfaceRow {
            hardware_id: self.hardware_id,
            connected_switch_id: self.connected_switch_id,
            name: self.name,
            mac_address: self.mac_address,
            ip_address: self.ip_address,
            speed: self.speed,
            interface_type: self.interface_type,
            connected_port: self.connected_port,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_interface(id)
    }
}

/// SurrealDB implementation of the InterfaceConnection repository.
#[derive(Clone)]
pub struct SurrealInterfaceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInterfaceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list_by_fk(
        &self,
        condition: &str,
        id: Uuid,
    ) -> Result<Vec<InterfaceConnection>, DbError> {
        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM interface_connection \
             WHERE {condition} = $id ORDER BY name ASC, id ASC"
        );
        let mut result = self.db.query(&sql).bind(("id", id.to_string())).await?;
        let rows: Vec<InterfaceRowWithId> = result.take(0)?;
        rows.into_iter().map(|row| row.try_into_interface()).collect()
    }
}

impl<C: Connection> InterfaceRepository for SurrealInterfaceRepository<C> {
    async fn create(&self, input: CreateInterfaceConnection) -> DcimResult<InterfaceConnection> {
        let hardware_id_str = input.hardware_id.to_string();
        ensure_exists(&self.db, EntityKind::Hardware, &hardware_id_str).await?;

        if let Some(switch_id) = input.connected_switch_id {
            // An interface must not uplink into its own owner.
            if switch_id == input.hardware_id {
                return Err(DbError::Validation(
                    "an interface cannot uplink to its own hardware".into(),
                )
                .into());
            }
            ensure_exists(&self.db, EntityKind::Hardware, &switch_id.to_string()).await?;
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('interface_connection', $id) SET \
                 hardware_id = $hardware_id, \
                 connected_switch_id = $connected_switch_id, \
                 name = $name, mac_address = $mac_address, \
                 ip_address = $ip_address, speed = $speed, \
                 interface_type = $interface_type, \
                 connected_port = $connected_port",
            )
            .bind(("id", id_str.clone()))
            .bind(("hardware_id", hardware_id_str))
            .bind((
                "connected_switch_id",
                input.connected_switch_id.map(|s| s.to_string()),
            ))
            .bind(("name", input.name))
            .bind(("mac_address", input.mac_address))
            .bind(("ip_address", input.ip_address))
            .bind(("speed", input.speed))
            .bind(("interface_type", input.interface_type))
            .bind(("connected_port", input.connected_port))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<InterfaceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "interface".into(),
            id: id_str,
        })?;

        Ok(row.into_interface(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<InterfaceConnection> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('interface_connection', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InterfaceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "interface".into(),
            id: id_str,
        })?;

        Ok(row.into_interface(id)?)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateInterfaceConnection,
    ) -> DcimResult<InterfaceConnection> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(hardware_id) = input.hardware_id {
            ensure_exists(&self.db, EntityKind::Hardware, &hardware_id.to_string()).await?;
        }

        // Self-uplink check runs on the effective owner/target pair, so
        // re-homing the interface cannot smuggle a loop in.
        let effective_owner = input.hardware_id.unwrap_or(current.hardware_id);
        let effective_switch = match input.connected_switch_id {
            Some(s) => s,
            None => current.connected_switch_id,
        };
        if let Some(switch_id) = effective_switch {
            if switch_id == effective_owner {
                return Err(DbError::Validation(
                    "an interface cannot uplink to its own hardware".into(),
                )
                .into());
            }
        }
        if let Some(Some(switch_id)) = input.connected_switch_id {
            ensure_exists(&self.db, EntityKind::Hardware, &switch_id.to_string()).await?;
        }

        let mut sets = Vec::new();
        if input.hardware_id.is_some() {
            sets.push("hardware_id = $hardware_id");
        }
        if input.connected_switch_id.is_some() {
            sets.push("connected_switch_id = $connected_switch_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.mac_address.is_some() {
            sets.push("mac_address = $mac_address");
        }
        if input.ip_address.is_some() {
            sets.push("ip_address = $ip_address");
        }
        if input.speed.is_some() {
            sets.push("speed = $speed");
        }
        if input.interface_type.is_some() {
            sets.push("interface_type = $interface_type");
        }
        if input.connected_port.is_some() {
            sets.push("connected_port = $connected_port");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('interface_connection', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(hardware_id) = input.hardware_id {
            builder = builder.bind(("hardware_id", hardware_id.to_string()));
        }
        if let Some(switch_id) = input.connected_switch_id {
            // Option<Option<_>>: Some(None) unplugs the uplink.
            builder = builder.bind(("connected_switch_id", switch_id.map(|s| s.to_string())));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(mac_address) = input.mac_address {
            builder = builder.bind(("mac_address", mac_address));
        }
        if let Some(ip_address) = input.ip_address {
            builder = builder.bind(("ip_address", ip_address));
        }
        if let Some(speed) = input.speed {
            builder = builder.bind(("speed", speed));
        }
        if let Some(interface_type) = input.interface_type {
            builder = builder.bind(("interface_type", interface_type));
        }
        if let Some(connected_port) = input.connected_port {
            builder = builder.bind(("connected_port", connected_port));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<InterfaceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "interface".into(),
            id: id_str,
        })?;

        Ok(row.into_interface(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::InterfaceConnection, id).await
    }

    async fn list(
        &self,
        filter: InterfaceFilter,
        options: ListOptions,
    ) -> DcimResult<Page<InterfaceConnection>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("interface_connection");
        query.search(SEARCHABLE, filter.search);
        query.eq("hardware_id", filter.hardware_id.map(|id| id.to_string()));
        query.eq(
            "connected_switch_id",
            filter.connected_switch_id.map(|id| id.to_string()),
        );

        let (rows, total): (Vec<InterfaceRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let results = rows
            .into_iter()
            .map(|row| row.try_into_interface())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }

    async fn list_for_hardware(&self, hardware_id: Uuid) -> DcimResult<Vec<InterfaceConnection>> {
        Ok(self.list_by_fk("hardware_id", hardware_id).await?)
    }

    async fn list_uplinked_to(&self, switch_id: Uuid) -> DcimResult<Vec<InterfaceConnection>> {
        Ok(self.list_by_fk("connected_switch_id", switch_id).await?)
    }
}
