//! SurrealDB implementation of [`TenantRepository`].
//!
//! Tenant deletion nullifies the ownership reference on hardware rather
//! than deleting the hardware; the policy executor handles that.

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::tenant::{CreateTenant, Tenant, TenantFilter, UpdateTenant};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];
const CONFLICT: &str = "Tenant name already taken in this group";

#[derive(Debug, SurrealValue)]
struct TenantRow {
    tenant_group_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        let tenant_group_id = Uuid::parse_str(&self.tenant_group_id)
            .map_err(|e| DbError::Query(format!("invalid group UUID: {e}")))?;
        Ok(Tenant {
            id,
            tenant_group_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    tenant_group_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let tenant_group_id = Uuid::parse_str(&self.tenant_group_id)
            .map_err(|e| DbError::Query(format!("invalid group UUID: {e}")))?;
        Ok(Tenant {
            id,
            tenant_group_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> DcimResult<Tenant> {
        let group_id_str = input.tenant_group_id.to_string();
        ensure_exists(&self.db, EntityKind::TenantGroup, &group_id_str).await?;
        ensure_unique(
            &self.db,
            "tenant",
            &[("name", &input.name), ("tenant_group_id", &group_id_str)],
            None,
            CONFLICT,
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 tenant_group_id = $tenant_group_id, \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_group_id", group_id_str))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> DcimResult<Tenant> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(group_id) = input.tenant_group_id {
            ensure_exists(&self.db, EntityKind::TenantGroup, &group_id.to_string()).await?;
        }

        if input.name.is_some() || input.tenant_group_id.is_some() {
            let target_name = input.name.clone().unwrap_or(current.name);
            let target_group = input
                .tenant_group_id
                .unwrap_or(current.tenant_group_id)
                .to_string();
            ensure_unique(
                &self.db,
                "tenant",
                &[("name", &target_name), ("tenant_group_id", &target_group)],
                Some(&id_str),
                CONFLICT,
            )
            .await?;
        }

        let mut sets = Vec::new();
        if input.tenant_group_id.is_some() {
            sets.push("tenant_group_id = $tenant_group_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('tenant', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(group_id) = input.tenant_group_id {
            builder = builder.bind(("tenant_group_id", group_id.to_string()));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Tenant, id).await
    }

    async fn list(&self, filter: TenantFilter, options: ListOptions) -> DcimResult<Page<Tenant>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("tenant");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);
        query.eq(
            "tenant_group_id",
            filter.tenant_group_id.map(|id| id.to_string()),
        );

        let (rows, total): (Vec<TenantRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let results = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
