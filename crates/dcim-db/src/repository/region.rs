//! SurrealDB implementation of [`RegionRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::region::{CreateRegion, Region, RegionFilter, RegionSummary, UpdateRegion};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::RegionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_unique};

const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct RegionRow {
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RegionRow {
    fn into_region(self, id: Uuid) -> Region {
        Region {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct RegionRowWithId {
    record_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RegionRowWithId {
    fn try_into_region(self) -> Result<Region, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        Ok(Region {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Per-region zone tallies for the list annotation.
#[derive(Debug, SurrealValue)]
struct ZoneCountRow {
    region_id: String,
    total: u64,
}

/// SurrealDB implementation of the Region repository.
#[derive(Clone)]
pub struct SurrealRegionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRegionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RegionRepository for SurrealRegionRepository<C> {
    async fn create(&self, input: CreateRegion) -> DcimResult<Region> {
        ensure_unique(
            &self.db,
            "region",
            &[("name", &input.name)],
            None,
            "Region name already taken",
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('region', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RegionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "region".into(),
            id: id_str,
        })?;

        Ok(row.into_region(id))
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Region> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('region', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RegionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "region".into(),
            id: id_str,
        })?;

        Ok(row.into_region(id))
    }

    async fn update(&self, id: Uuid, input: UpdateRegion) -> DcimResult<Region> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        // Re-validate uniqueness only when the name actually changes.
        if let Some(name) = &input.name {
            if *name != current.name {
                ensure_unique(
                    &self.db,
                    "region",
                    &[("name", name)],
                    Some(&id_str),
                    "Region name already taken",
                )
                .await?;
            }
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('region', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RegionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "region".into(),
            id: id_str,
        })?;

        Ok(row.into_region(id))
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Region, id).await
    }

    async fn list(
        &self,
        filter: RegionFilter,
        options: ListOptions,
    ) -> DcimResult<Page<RegionSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("region");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);

        let (rows, total): (Vec<RegionRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let regions = rows
            .into_iter()
            .map(|row| row.try_into_region())
            .collect::<Result<Vec<_>, DbError>>()?;

        // Child counts come from an independent grouped query keyed on
        // the page's ids; joining would multiply rows and break totals.
        let ids: Vec<String> = regions.iter().map(|r| r.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT region_id, count() AS total FROM zone \
                     WHERE region_id IN $ids GROUP BY region_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<ZoneCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows.into_iter().map(|r| (r.region_id, r.total)).collect();
        }

        let results = regions
            .into_iter()
            .map(|region| {
                let zone_count = counts.get(&region.id.to_string()).copied().unwrap_or(0);
                RegionSummary { region, zone_count }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
