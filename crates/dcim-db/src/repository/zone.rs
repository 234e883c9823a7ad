//! SurrealDB implementation of [`ZoneRepository`].
//!
//! Zone names are unique per region, so both create and update validate
//! against the effective (name, region) pair.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::zone::{CreateZone, UpdateZone, Zone, ZoneFilter, ZoneSummary};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::ZoneRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];
const CONFLICT: &str = "Zone name already taken in this region";

#[derive(Debug, SurrealValue)]
struct ZoneRow {
    region_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ZoneRow {
    fn into_zone(self, id: Uuid) -> Result<Zone, DbError> {
        let region_id = Uuid::parse_str(&self.region_id)
            .map_err(|e| DbError::Query(format!("invalid region UUID: {e}")))?;
        Ok(Zone {
            id,
            region_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ZoneRowWithId {
    record_id: String,
    region_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ZoneRowWithId {
    fn try_into_zone(self) -> Result<Zone, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let region_id = Uuid::parse_str(&self.region_id)
            .map_err(|e| DbError::Query(format!("invalid region UUID: {e}")))?;
        Ok(Zone {
            id,
            region_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SiteCountRow {
    zone_id: String,
    total: u64,
}

/// SurrealDB implementation of the Zone repository.
#[derive(Clone)]
pub struct SurrealZoneRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealZoneRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ZoneRepository for SurrealZoneRepository<C> {
    async fn create(&self, input: CreateZone) -> DcimResult<Zone> {
        let region_id_str = input.region_id.to_string();
        ensure_exists(&self.db, EntityKind::Region, &region_id_str).await?;
        ensure_unique(
            &self.db,
            "zone",
            &[("name", &input.name), ("region_id", &region_id_str)],
            None,
            CONFLICT,
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('zone', $id) SET \
                 region_id = $region_id, \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("region_id", region_id_str))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ZoneRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "zone".into(),
            id: id_str,
        })?;

        Ok(row.into_zone(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Zone> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('zone', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ZoneRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "zone".into(),
            id: id_str,
        })?;

        Ok(row.into_zone(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateZone) -> DcimResult<Zone> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(region_id) = input.region_id {
            ensure_exists(&self.db, EntityKind::Region, &region_id.to_string()).await?;
        }

        // A name or parent change can collide with a sibling, so check
        // the effective pair and skip the record itself.
        if input.name.is_some() || input.region_id.is_some() {
            let target_name = input.name.clone().unwrap_or(current.name);
            let target_region = input.region_id.unwrap_or(current.region_id).to_string();
            ensure_unique(
                &self.db,
                "zone",
                &[("name", &target_name), ("region_id", &target_region)],
                Some(&id_str),
                CONFLICT,
            )
            .await?;
        }

        let mut sets = Vec::new();
        if input.region_id.is_some() {
            sets.push("region_id = $region_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('zone', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(region_id) = input.region_id {
            builder = builder.bind(("region_id", region_id.to_string()));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ZoneRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "zone".into(),
            id: id_str,
        })?;

        Ok(row.into_zone(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Zone, id).await
    }

    async fn list(&self, filter: ZoneFilter, options: ListOptions) -> DcimResult<Page<ZoneSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("zone");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);
        query.eq("region_id", filter.region_id.map(|id| id.to_string()));

        let (rows, total): (Vec<ZoneRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let zones = rows
            .into_iter()
            .map(|row| row.try_into_zone())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = zones.iter().map(|z| z.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT zone_id, count() AS total FROM site \
                     WHERE zone_id IN $ids GROUP BY zone_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<SiteCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows.into_iter().map(|r| (r.zone_id, r.total)).collect();
        }

        let results = zones
            .into_iter()
            .map(|zone| {
                let site_count = counts.get(&zone.id.to_string()).copied().unwrap_or(0);
                ZoneSummary { zone, site_count }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
