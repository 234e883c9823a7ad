//! SurrealDB implementation of [`TenantGroupRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::tenant_group::{
    CreateTenantGroup, TenantGroup, TenantGroupFilter, TenantGroupSummary, UpdateTenantGroup,
};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::TenantGroupRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_unique};

const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];

#[derive(Debug, SurrealValue)]
struct TenantGroupRow {
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantGroupRow {
    fn into_group(self, id: Uuid) -> TenantGroup {
        TenantGroup {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct TenantGroupRowWithId {
    record_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantGroupRowWithId {
    fn try_into_group(self) -> Result<TenantGroup, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        Ok(TenantGroup {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TenantCountRow {
    tenant_group_id: String,
    total: u64,
}

/// SurrealDB implementation of the TenantGroup repository.
#[derive(Clone)]
pub struct SurrealTenantGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantGroupRepository for SurrealTenantGroupRepository<C> {
    async fn create(&self, input: CreateTenantGroup) -> DcimResult<TenantGroup> {
        ensure_unique(
            &self.db,
            "tenant_group",
            &[("name", &input.name)],
            None,
            "Tenant group name already taken",
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant_group', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantGroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<TenantGroup> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant_group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantGroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn update(&self, id: Uuid, input: UpdateTenantGroup) -> DcimResult<TenantGroup> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(name) = &input.name {
            if *name != current.name {
                ensure_unique(
                    &self.db,
                    "tenant_group",
                    &[("name", name)],
                    Some(&id_str),
                    "Tenant group name already taken",
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

        let query = format!(
            "UPDATE type::record('tenant_group', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantGroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::TenantGroup, id).await
    }

    async fn list(
        &self,
        filter: TenantGroupFilter,
        options: ListOptions,
    ) -> DcimResult<Page<TenantGroupSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("tenant_group");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);

        let (rows, total): (Vec<TenantGroupRowWithId>, u64) =
            query.run(&self.db, &resolved).await?;
        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = groups.iter().map(|g| g.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT tenant_group_id, count() AS total FROM tenant \
                     WHERE tenant_group_id IN $ids GROUP BY tenant_group_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<TenantCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows
                .into_iter()
                .map(|r| (r.tenant_group_id, r.total))
                .collect();
        }

        let results = groups
            .into_iter()
            .map(|group| {
                let tenant_count = counts.get(&group.id.to_string()).copied().unwrap_or(0);
                TenantGroupSummary {
                    group,
                    tenant_count,
                }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
