//! SurrealDB implementation of [`RackRepository`].
//!
//! Besides the usual CRUD surface, a rack can be fetched together with
//! its full ancestor chain (room → site → zone → region) for standalone
//! display.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::rack::{
    CreateRack, DEFAULT_RACK_UNITS, Rack, RackDetail, RackFilter, RackSummary, UpdateRack,
};
use dcim_core::models::region::Region;
use dcim_core::models::room::Room;
use dcim_core::models::site::Site;
use dcim_core::models::zone::Zone;
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::RackRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &["name", "unit", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];
const CONFLICT: &str = "Rack name already taken in this room";

#[derive(Debug, SurrealValue)]
struct RackRow {
    room_id: String,
    name: String,
    description: Option<String>,
    unit: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RackRow {
    fn into_rack(self, id: Uuid) -> Result<Rack, DbError> {
        let room_id = Uuid::parse_str(&self.room_id)
            .map_err(|e| DbError::Query(format!("invalid room UUID: {e}")))?;
        Ok(Rack {
            id,
            room_id,
            name: self.name,
            description: self.description,
            unit: self.unit,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RackRowWithId {
    record_id: String,
    room_id: String,
    name: String,
    description: Option<String>,
    unit: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RackRowWithId {
    fn try_into_rack(self) -> Result<Rack, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let room_id = Uuid::parse_str(&self.room_id)
            .map_err(|e| DbError::Query(format!("invalid room UUID: {e}")))?;
        Ok(Rack {
            id,
            room_id,
            name: self.name,
            description: self.description,
            unit: self.unit,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct HardwareCountRow {
    rack_id: String,
    total: u64,
}

// Ancestor rows for the location chain.

#[derive(Debug, SurrealValue)]
struct RoomAncestorRow {
    site_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SiteAncestorRow {
    zone_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ZoneAncestorRow {
    region_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RegionAncestorRow {
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// SurrealDB implementation of the Rack repository.
#[derive(Clone)]
pub struct SurrealRackRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRackRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_ancestor_row<R: SurrealValue>(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<R, DbError> {
        let sql = format!("SELECT * FROM type::record('{}', $id)", kind.table());
        let mut result = self.db.query(&sql).bind(("id", id.to_string())).await?;
        let rows: Vec<R> = result.take(0)?;
        rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: kind.label().into(),
            id: id.into(),
        })
    }
}

impl<C: Connection> RackRepository for SurrealRackRepository<C> {
    async fn create(&self, input: CreateRack) -> DcimResult<Rack> {
        let room_id_str = input.room_id.to_string();
        ensure_exists(&self.db, EntityKind::Room, &room_id_str).await?;
        ensure_unique(
            &self.db,
            "rack",
            &[("name", &input.name), ("room_id", &room_id_str)],
            None,
            CONFLICT,
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let unit = input.unit.unwrap_or(DEFAULT_RACK_UNITS);

        let result = self
            .db
            .query(
                "CREATE type::record('rack', $id) SET \
                 room_id = $room_id, \
                 name = $name, description = $description, \
                 unit = $unit",
            )
            .bind(("id", id_str.clone()))
            .bind(("room_id", room_id_str))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("unit", unit))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RackRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "rack".into(),
            id: id_str,
        })?;

        Ok(row.into_rack(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Rack> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('rack', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RackRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "rack".into(),
            id: id_str,
        })?;

        Ok(row.into_rack(id)?)
    }

    async fn get_with_location(&self, id: Uuid) -> DcimResult<RackDetail> {
        let rack = self.get_by_id(id).await?;

        let room_row: RoomAncestorRow = self
            .fetch_ancestor_row(EntityKind::Room, &rack.room_id.to_string())
            .await?;
        let site_id = Uuid::parse_str(&room_row.site_id)
            .map_err(|e| DbError::Query(format!("invalid site UUID: {e}")))?;
        let room = Room {
            id: rack.room_id,
            site_id,
            name: room_row.name,
            description: room_row.description,
            created_at: room_row.created_at,
            updated_at: room_row.updated_at,
        };

        let site_row: SiteAncestorRow = self
            .fetch_ancestor_row(EntityKind::Site, &site_id.to_string())
            .await?;
        let zone_id = Uuid::parse_str(&site_row.zone_id)
            .map_err(|e| DbError::Query(format!("invalid zone UUID: {e}")))?;
        let site = Site {
            id: site_id,
            zone_id,
            name: site_row.name,
            description: site_row.description,
            created_at: site_row.created_at,
            updated_at: site_row.updated_at,
        };

        let zone_row: ZoneAncestorRow = self
            .fetch_ancestor_row(EntityKind::Zone, &zone_id.to_string())
            .await?;
        let region_id = Uuid::parse_str(&zone_row.region_id)
            .map_err(|e| DbError::Query(format!("invalid region UUID: {e}")))?;
        let zone = Zone {
            id: zone_id,
            region_id,
            name: zone_row.name,
            description: zone_row.description,
            created_at: zone_row.created_at,
            updated_at: zone_row.updated_at,
        };

        let region_row: RegionAncestorRow = self
            .fetch_ancestor_row(EntityKind::Region, &region_id.to_string())
            .await?;
        let region = Region {
            id: region_id,
            name: region_row.name,
            description: region_row.description,
            created_at: region_row.created_at,
            updated_at: region_row.updated_at,
        };

        Ok(RackDetail {
            rack,
            room,
            site,
            zone,
            region,
        })
    }

    async fn update(&self, id: Uuid, input: UpdateRack) -> DcimResult<Rack> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(room_id) = input.room_id {
            ensure_exists(&self.db, EntityKind::Room, &room_id.to_string()).await?;
        }

        if input.name.is_some() || input.room_id.is_some() {
            let target_name = input.name.clone().unwrap_or(current.name);
            let target_room = input.room_id.unwrap_or(current.room_id).to_string();
            ensure_unique(
                &self.db,
                "rack",
                &[("name", &target_name), ("room_id", &target_room)],
                Some(&id_str),
                CONFLICT,
            )
            .await?;
        }

        let mut sets = Vec::new();
        if input.room_id.is_some() {
            sets.push("room_id = $room_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.unit.is_some() {
            sets.push("unit = $unit");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('rack', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(room_id) = input.room_id {
            builder = builder.bind(("room_id", room_id.to_string()));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(unit) = input.unit {
            builder = builder.bind(("unit", unit));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RackRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "rack".into(),
            id: id_str,
        })?;

        Ok(row.into_rack(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Rack, id).await
    }

    async fn list(&self, filter: RackFilter, options: ListOptions) -> DcimResult<Page<RackSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("rack");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);
        query.eq("room_id", filter.room_id.map(|id| id.to_string()));

        let (rows, total): (Vec<RackRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let racks = rows
            .into_iter()
            .map(|row| row.try_into_rack())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = racks.iter().map(|r| r.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT rack_id, count() AS total FROM hardware \
                     WHERE rack_id IN $ids GROUP BY rack_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<HardwareCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows.into_iter().map(|r| (r.rack_id, r.total)).collect();
        }

        let results = racks
            .into_iter()
            .map(|rack| {
                let hardware_count = counts.get(&rack.id.to_string()).copied().unwrap_or(0);
                RackSummary {
                    rack,
                    hardware_count,
                }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
