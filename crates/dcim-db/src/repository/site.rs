//! SurrealDB implementation of [`SiteRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::site::{CreateSite, Site, SiteFilter, SiteSummary, UpdateSite};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::SiteRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];
const CONFLICT: &str = "Site name already taken in this zone";

#[derive(Debug, SurrealValue)]
struct SiteRow {
    zone_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SiteRow {
    fn into_site(self, id: Uuid) -> Result<Site, DbError> {
        let zone_id = Uuid::parse_str(&self.zone_id)
            .map_err(|e| DbError::Query(format!("invalid zone UUID: {e}")))?;
        Ok(Site {
            id,
            zone_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SiteRowWithId {
    record_id: String,
    zone_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SiteRowWithId {
    fn try_into_site(self) -> Result<Site, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let zone_id = Uuid::parse_str(&self.zone_id)
            .map_err(|e| DbError::Query(format!("invalid zone UUID: {e}")))?;
        Ok(Site {
            id,
            zone_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RoomCountRow {
    site_id: String,
    total: u64,
}

/// SurrealDB implementation of the Site repository.
#[derive(Clone)]
pub struct SurrealSiteRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSiteRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SiteRepository for SurrealSiteRepository<C> {
    async fn create(&self, input: CreateSite) -> DcimResult<Site> {
        let zone_id_str = input.zone_id.to_string();
        ensure_exists(&self.db, EntityKind::Zone, &zone_id_str).await?;
        ensure_unique(
            &self.db,
            "site",
            &[("name", &input.name), ("zone_id", &zone_id_str)],
            None,
            CONFLICT,
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('site', $id) SET \
                 zone_id = $zone_id, \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("zone_id", zone_id_str))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "site".into(),
            id: id_str,
        })?;

        Ok(row.into_site(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Site> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('site', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "site".into(),
            id: id_str,
        })?;

        Ok(row.into_site(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateSite) -> DcimResult<Site> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(zone_id) = input.zone_id {
            ensure_exists(&self.db, EntityKind::Zone, &zone_id.to_string()).await?;
        }

        if input.name.is_some() || input.zone_id.is_some() {
            let target_name = input.name.clone().unwrap_or(current.name);
            let target_zone = input.zone_id.unwrap_or(current.zone_id).to_string();
            ensure_unique(
                &self.db,
                "site",
                &[("name", &target_name), ("zone_id", &target_zone)],
                Some(&id_str),
                CONFLICT,
            )
            .await?;
        }

        let mut sets = Vec::new();
        if input.zone_id.is_some() {
            sets.push("zone_id = $zone_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('site', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(zone_id) = input.zone_id {
            builder = builder.bind(("zone_id", zone_id.to_string()));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "site".into(),
            id: id_str,
        })?;

        Ok(row.into_site(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Site, id).await
    }

    async fn list(&self, filter: SiteFilter, options: ListOptions) -> DcimResult<Page<SiteSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("site");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);
        query.eq("zone_id", filter.zone_id.map(|id| id.to_string()));

        let (rows, total): (Vec<SiteRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let sites = rows
            .into_iter()
            .map(|row| row.try_into_site())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = sites.iter().map(|s| s.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT site_id, count() AS total FROM room \
                     WHERE site_id IN $ids GROUP BY site_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<RoomCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows.into_iter().map(|r| (r.site_id, r.total)).collect();
        }

        let results = sites
            .into_iter()
            .map(|site| {
                let room_count = counts.get(&site.id.to_string()).copied().unwrap_or(0);
                SiteSummary { site, room_count }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
