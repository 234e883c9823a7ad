//! SurrealDB implementation of [`HardwareRepository`].
//!
//! Free-text search reaches into the related catalog model
//! (manufacturer/model) by pre-resolving matching model ids, so the
//! page query stays single-table and pagination totals stay correct.
//! A mounted item's `u_position` is validated against the rack's
//! declared capacity using the model's authoritative height; slot
//! overlap is exposed as a query but not enforced.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::hardware::{
    CreateHardware, Hardware, HardwareDetail, HardwareFilter, HardwareStatus, UpdateHardware,
};
use dcim_core::models::hardware_info::HardwareInfo;
use dcim_core::models::hardware_type::HardwareType;
use dcim_core::models::interface::InterfaceConnection;
use dcim_core::models::tenant::Tenant;
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::HardwareRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{IdRow, ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &[
    "name",
    "status",
    "serial_number",
    "u_position",
    "created_at",
    "updated_at",
];
const SEARCHABLE: &[&str] = &["name", "serial_number"];

#[derive(Debug, SurrealValue)]
struct HardwareRow {
    rack_id: String,
    hardware_info_id: String,
    tenant_id: Option<String>,
    name: String,
    status: String,
    serial_number: Option<String>,
    oob_ip: Option<String>,
    specifications: Option<String>,
    note: Option<String>,
    u_position: Option<u32>,
    warranty_start: Option<DateTime<Utc>>,
    warranty_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<HardwareStatus, DbError> {
    HardwareStatus::parse(s)
        .ok_or_else(|| DbError::Query(format!("unknown hardware status: {s}")))
}

impl HardwareRow {
    fn into_hardware(self, id: Uuid) -> Result<Hardware, DbError> {
        let rack_id = Uuid::parse_str(&self.rack_id)
            .map_err(|e| DbError::Query(format!("invalid rack UUID: {e}")))?;
        let hardware_info_id = Uuid::parse_str(&self.hardware_info_id)
            .map_err(|e| DbError::Query(format!("invalid model UUID: {e}")))?;
        let tenant_id = self
            .tenant_id
            .map(|t| Uuid::parse_str(&t))
            .transpose()
            .map_err(|e| DbError::Query(format!("invalid tenant UUID: {e}")))?;
        Ok(Hardware {
            id,
            rack_id,
            hardware_info_id,
            tenant_id,
            name: self.name,
            status: parse_status(&self.status)?,
            serial_number: self.serial_number,
            oob_ip: self.oob_ip,
            specifications: self.specifications,
            note: self.note,
            u_position: self.u_position,
            warranty_start: self.warranty_start,
            warranty_end: self.warranty_end,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct HardwareRowWithId {
    record_id: String,
    rack_id: String,
    hardware_info_id: String,
    tenant_id: Option<String>,
    name: String,
    status: String,
    serial_number: Option<String>,
    oob_ip: Option<String>,
    specifications: Option<String>,
    note: Option<String>,
    u_position: Option<u32>,
    warranty_start: Option<DateTime<Utc>>,
    warranty_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HardwareRowWithId {
    fn try_into_hardware(self) -> Result<Hardware, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let row = HardwareRow {
            rack_id: self.rack_id,
            hardware_info_id: self.hardware_info_id,
            tenant_id: self.tenant_id,
            name: self.name,
            status: self.status,
            serial_number: self.serial_number,
            oob_ip: self.oob_ip,
            specifications: self.specifications,
            note: self.note,
            u_position: self.u_position,
            warranty_start: self.warranty_start,
            warranty_end: self.warranty_end,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_hardware(id)
    }
}

#[derive(Debug, SurrealValue)]
struct RackUnitRow {
    unit: u32,
}

#[derive(Debug, SurrealValue)]
struct InfoHeightRow {
    record_id: String,
    height: u32,
}

#[derive(Debug, SurrealValue)]
struct InfoDetailRow {
    hardware_type_id: String,
    manufacturer: String,
    model: String,
    height: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TypeDetailRow {
    name: String,
    category: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TenantDetailRow {
    tenant_group_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct InterfaceDetailRow {
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

impl InterfaceDetailRow {
    fn try_into_interface(self) -> Result<InterfaceConnection, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
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

/// SurrealDB implementation of the Hardware repository.
#[derive(Clone)]
pub struct SurrealHardwareRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHardwareRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn rack_unit(&self, rack_id: &str) -> Result<u32, DbError> {
        let mut result = self
            .db
            .query("SELECT unit FROM type::record('rack', $id)")
            .bind(("id", rack_id.to_string()))
            .await?;
        let rows: Vec<RackUnitRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|r| r.unit)
            .ok_or_else(|| DbError::NotFound {
                entity: "rack".into(),
                id: rack_id.into(),
            })
    }

    async fn info_height(&self, info_id: &str) -> Result<u32, DbError> {
        let mut result = self
            .db
            .query("SELECT height FROM type::record('hardware_info', $id)")
            .bind(("id", info_id.to_string()))
            .await?;
        #[derive(Debug, SurrealValue)]
        struct HeightRow {
            height: u32,
        }
        let rows: Vec<HeightRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|r| r.height)
            .ok_or_else(|| DbError::NotFound {
                entity: "hardware model".into(),
                id: info_id.into(),
            })
    }

    /// Validate a mounting position against the rack's declared capacity.
    async fn check_position(
        &self,
        rack_id: &str,
        info_id: &str,
        u_position: u32,
    ) -> Result<(), DbError> {
        let unit = self.rack_unit(rack_id).await?;
        let height = self.info_height(info_id).await?;

        if u_position < 1 || u_position + height - 1 > unit {
            return Err(DbError::Validation(format!(
                "u_position {u_position} with height {height}U does not fit \
                 a {unit}U rack"
            )));
        }
        Ok(())
    }

    /// Model ids whose manufacturer or model matches the needle.
    async fn matching_info_ids(&self, needle: &str) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM hardware_info \
                 WHERE string::contains(string::lowercase(manufacturer), $search) \
                 OR string::contains(string::lowercase(model), $search)",
            )
            .bind(("search", needle.to_lowercase()))
            .await?;
        let rows: Vec<IdRow> = result.take(0)?;
        Ok(rows.into_iter().map(|r| r.record_id).collect())
    }

    /// Model ids belonging to the given type.
    async fn info_ids_of_type(&self, type_id: &str) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM hardware_info \
                 WHERE hardware_type_id = $type_id",
            )
            .bind(("type_id", type_id.to_string()))
            .await?;
        let rows: Vec<IdRow> = result.take(0)?;
        Ok(rows.into_iter().map(|r| r.record_id).collect())
    }
}

impl<C: Connection> HardwareRepository for SurrealHardwareRepository<C> {
    async fn create(&self, input: CreateHardware) -> DcimResult<Hardware> {
        let rack_id_str = input.rack_id.to_string();
        let info_id_str = input.hardware_info_id.to_string();

        ensure_exists(&self.db, EntityKind::Rack, &rack_id_str).await?;
        ensure_exists(&self.db, EntityKind::HardwareInfo, &info_id_str).await?;
        if let Some(tenant_id) = input.tenant_id {
            ensure_exists(&self.db, EntityKind::Tenant, &tenant_id.to_string()).await?;
        }
        if let Some(serial) = &input.serial_number {
            ensure_unique(
                &self.db,
                "hardware",
                &[("serial_number", serial)],
                None,
                "Serial number already exists",
            )
            .await?;
        }
        if let Some(u_position) = input.u_position {
            self.check_position(&rack_id_str, &info_id_str, u_position)
                .await?;
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let status = input.status.unwrap_or_default();

        let result = self
            .db
            .query(
                "CREATE type::record('hardware', $id) SET \
                 rack_id = $rack_id, \
                 hardware_info_id = $hardware_info_id, \
                 tenant_id = $tenant_id, \
                 name = $name, status = $status, \
                 serial_number = $serial_number, oob_ip = $oob_ip, \
                 specifications = $specifications, note = $note, \
                 u_position = $u_position, \
                 warranty_start = $warranty_start, \
                 warranty_end = $warranty_end",
            )
            .bind(("id", id_str.clone()))
            .bind(("rack_id", rack_id_str))
            .bind(("hardware_info_id", info_id_str))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("name", input.name))
            .bind(("status", status.as_str().to_string()))
            .bind(("serial_number", input.serial_number))
            .bind(("oob_ip", input.oob_ip))
            .bind(("specifications", input.specifications))
            .bind(("note", input.note))
            .bind(("u_position", input.u_position))
            .bind(("warranty_start", input.warranty_start))
            .bind(("warranty_end", input.warranty_end))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HardwareRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware".into(),
            id: id_str,
        })?;

        Ok(row.into_hardware(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Hardware> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('hardware', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HardwareRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware".into(),
            id: id_str,
        })?;

        Ok(row.into_hardware(id)?)
    }

    async fn get_detail(&self, id: Uuid) -> DcimResult<HardwareDetail> {
        let hardware = self.get_by_id(id).await?;

        let info_id_str = hardware.hardware_info_id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('hardware_info', $id)")
            .bind(("id", info_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<InfoDetailRow> = result.take(0).map_err(DbError::from)?;
        let info_row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware model".into(),
            id: info_id_str,
        })?;
        let type_id = Uuid::parse_str(&info_row.hardware_type_id)
            .map_err(|e| DbError::Query(format!("invalid type UUID: {e}")))?;
        let info = HardwareInfo {
            id: hardware.hardware_info_id,
            hardware_type_id: type_id,
            manufacturer: info_row.manufacturer,
            model: info_row.model,
            height: info_row.height,
            created_at: info_row.created_at,
            updated_at: info_row.updated_at,
        };

        let type_id_str = type_id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('hardware_type', $id)")
            .bind(("id", type_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<TypeDetailRow> = result.take(0).map_err(DbError::from)?;
        let type_row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware type".into(),
            id: type_id_str,
        })?;
        let hardware_type = HardwareType {
            id: type_id,
            name: type_row.name,
            category: type_row.category,
            description: type_row.description,
            created_at: type_row.created_at,
            updated_at: type_row.updated_at,
        };

        let tenant = match hardware.tenant_id {
            Some(tenant_id) => {
                let tenant_id_str = tenant_id.to_string();
                let mut result = self
                    .db
                    .query("SELECT * FROM type::record('tenant', $id)")
                    .bind(("id", tenant_id_str))
                    .await
                    .map_err(DbError::from)?;
                let rows: Vec<TenantDetailRow> = result.take(0).map_err(DbError::from)?;
                rows.into_iter()
                    .next()
                    .map(|row| {
                        let tenant_group_id = Uuid::parse_str(&row.tenant_group_id)
                            .map_err(|e| DbError::Query(format!("invalid group UUID: {e}")))?;
                        Ok::<_, DbError>(Tenant {
                            id: tenant_id,
                            tenant_group_id,
                            name: row.name,
                            description: row.description,
                            created_at: row.created_at,
                            updated_at: row.updated_at,
                        })
                    })
                    .transpose()?
            }
            None => None,
        };

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM interface_connection \
                 WHERE hardware_id = $hardware_id ORDER BY name ASC, id ASC",
            )
            .bind(("hardware_id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<InterfaceDetailRow> = result.take(0).map_err(DbError::from)?;
        let interfaces = rows
            .into_iter()
            .map(|row| row.try_into_interface())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(HardwareDetail {
            hardware,
            info,
            hardware_type,
            tenant,
            interfaces,
        })
    }

    async fn update(&self, id: Uuid, input: UpdateHardware) -> DcimResult<Hardware> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(rack_id) = input.rack_id {
            ensure_exists(&self.db, EntityKind::Rack, &rack_id.to_string()).await?;
        }
        if let Some(info_id) = input.hardware_info_id {
            ensure_exists(&self.db, EntityKind::HardwareInfo, &info_id.to_string()).await?;
        }
        if let Some(Some(tenant_id)) = input.tenant_id {
            ensure_exists(&self.db, EntityKind::Tenant, &tenant_id.to_string()).await?;
        }
        if let Some(serial) = &input.serial_number {
            if current.serial_number.as_deref() != Some(serial.as_str()) {
                ensure_unique(
                    &self.db,
                    "hardware",
                    &[("serial_number", serial)],
                    Some(&id_str),
                    "Serial number already exists",
                )
                .await?;
            }
        }

        // Re-validate the mount when the rack, the model or the position
        // changes, using the effective values.
        let effective_rack = input.rack_id.unwrap_or(current.rack_id).to_string();
        let effective_info = input
            .hardware_info_id
            .unwrap_or(current.hardware_info_id)
            .to_string();
        let effective_position = match input.u_position {
            Some(p) => p,
            None => current.u_position,
        };
        let mount_changed =
            input.rack_id.is_some() || input.hardware_info_id.is_some() || input.u_position.is_some();
        if mount_changed {
            if let Some(u_position) = effective_position {
                self.check_position(&effective_rack, &effective_info, u_position)
                    .await?;
            }
        }

        let mut sets = Vec::new();
        if input.rack_id.is_some() {
            sets.push("rack_id = $rack_id");
        }
        if input.hardware_info_id.is_some() {
            sets.push("hardware_info_id = $hardware_info_id");
        }
        if input.tenant_id.is_some() {
            sets.push("tenant_id = $tenant_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.serial_number.is_some() {
            sets.push("serial_number = $serial_number");
        }
        if input.oob_ip.is_some() {
            sets.push("oob_ip = $oob_ip");
        }
        if input.specifications.is_some() {
            sets.push("specifications = $specifications");
        }
        if input.note.is_some() {
            sets.push("note = $note");
        }
        if input.u_position.is_some() {
            sets.push("u_position = $u_position");
        }
        if input.warranty_start.is_some() {
            sets.push("warranty_start = $warranty_start");
        }
        if input.warranty_end.is_some() {
            sets.push("warranty_end = $warranty_end");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('hardware', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(rack_id) = input.rack_id {
            builder = builder.bind(("rack_id", rack_id.to_string()));
        }
        if let Some(info_id) = input.hardware_info_id {
            builder = builder.bind(("hardware_info_id", info_id.to_string()));
        }
        if let Some(tenant_id) = input.tenant_id {
            // Option<Option<_>>: Some(None) clears the ownership.
            builder = builder.bind(("tenant_id", tenant_id.map(|t| t.to_string())));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(serial) = input.serial_number {
            builder = builder.bind(("serial_number", serial));
        }
        if let Some(oob_ip) = input.oob_ip {
            builder = builder.bind(("oob_ip", oob_ip));
        }
        if let Some(specifications) = input.specifications {
            builder = builder.bind(("specifications", specifications));
        }
        if let Some(note) = input.note {
            builder = builder.bind(("note", note));
        }
        if let Some(u_position) = input.u_position {
            builder = builder.bind(("u_position", u_position));
        }
        if let Some(warranty_start) = input.warranty_start {
            builder = builder.bind(("warranty_start", warranty_start));
        }
        if let Some(warranty_end) = input.warranty_end {
            builder = builder.bind(("warranty_end", warranty_end));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HardwareRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware".into(),
            id: id_str,
        })?;

        Ok(row.into_hardware(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Hardware, id).await
    }

    async fn list(
        &self,
        filter: HardwareFilter,
        options: ListOptions,
    ) -> DcimResult<Page<Hardware>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("hardware");

        // Search reaches through the catalog: pre-resolve model ids
        // whose manufacturer/model matches, then add them as an OR
        // disjunct on the foreign key.
        match &filter.search {
            Some(needle) => {
                let info_ids = self.matching_info_ids(needle).await?;
                query.search_or_related(
                    SEARCHABLE,
                    filter.search.clone(),
                    Some(("hardware_info_id", info_ids)),
                );
            }
            None => query.search(SEARCHABLE, None),
        }

        query.eq("name", filter.name);
        query.eq("serial_number", filter.serial_number);
        query.eq("status", filter.status.map(|s| s.as_str().to_string()));
        query.eq("rack_id", filter.rack_id.map(|id| id.to_string()));
        query.eq("tenant_id", filter.tenant_id.map(|id| id.to_string()));
        if let Some(type_id) = filter.hardware_type_id {
            let info_ids = self.info_ids_of_type(&type_id.to_string()).await?;
            query.id_in("hardware_info_id", info_ids);
        }

        let (rows, total): (Vec<HardwareRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let results = rows
            .into_iter()
            .map(|row| row.try_into_hardware())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }

    async fn find_overlaps(
        &self,
        rack_id: Uuid,
        u_position: u32,
        height: u32,
        exclude: Option<Uuid>,
    ) -> DcimResult<Vec<Hardware>> {
        if u_position < 1 || height < 1 {
            return Err(DbError::Validation(
                "u_position and height must both be at least 1".into(),
            )
            .into());
        }
        let rack_id_str = rack_id.to_string();
        ensure_exists(&self.db, EntityKind::Rack, &rack_id_str).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM hardware \
                 WHERE rack_id = $rack_id AND u_position IS NOT NONE",
            )
            .bind(("rack_id", rack_id_str))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<HardwareRowWithId> = result.take(0).map_err(DbError::from)?;
        let mounted = rows
            .into_iter()
            .map(|row| row.try_into_hardware())
            .collect::<Result<Vec<_>, DbError>>()?;

        // Heights live on the catalog models; fetch them in one pass.
        let info_ids: Vec<String> = mounted
            .iter()
            .map(|h| h.hardware_info_id.to_string())
            .collect();
        let mut heights: HashMap<String, u32> = HashMap::new();
        if !info_ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, height \
                     FROM hardware_info WHERE meta::id(id) IN $ids",
                )
                .bind(("ids", info_ids))
                .await
                .map_err(DbError::from)?;
            let rows: Vec<InfoHeightRow> = result.take(0).map_err(DbError::from)?;
            heights = rows.into_iter().map(|r| (r.record_id, r.height)).collect();
        }

        let candidate_end = u_position + height - 1;
        let overlapping = mounted
            .into_iter()
            .filter(|h| Some(h.id) != exclude)
            .filter(|h| {
                let Some(start) = h.u_position else {
                    return false;
                };
                let item_height = heights
                    .get(&h.hardware_info_id.to_string())
                    .copied()
                    .unwrap_or(1);
                let end = start + item_height - 1;
                start <= candidate_end && u_position <= end
            })
            .collect();

        Ok(overlapping)
    }
}
