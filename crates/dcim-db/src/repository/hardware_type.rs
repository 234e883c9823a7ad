//! SurrealDB implementation of [`HardwareTypeRepository`].
//!
//! The usage count on a type aggregates physical hardware through the
//! intermediate catalog models: type → models → items. Both steps are
//! independent queries keyed on ids, never joins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::hardware_type::{
    CreateHardwareType, HardwareType, HardwareTypeFilter, HardwareTypeSummary, UpdateHardwareType,
};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::HardwareTypeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_unique};

const SORTABLE: &[&str] = &["name", "category", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];

#[derive(Debug, SurrealValue)]
struct HardwareTypeRow {
    name: String,
    category: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HardwareTypeRow {
    fn into_hardware_type(self, id: Uuid) -> HardwareType {
        HardwareType {
            id,
            name: self.name,
            category: self.category,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct HardwareTypeRowWithId {
    record_id: String,
    name: String,
    category: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HardwareTypeRowWithId {
    fn try_into_hardware_type(self) -> Result<HardwareType, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        Ok(HardwareType {
            id,
            name: self.name,
            category: self.category,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Model row linking an info id to its type, for the aggregation step.
#[derive(Debug, SurrealValue)]
struct InfoLinkRow {
    record_id: String,
    hardware_type_id: String,
}

#[derive(Debug, SurrealValue)]
struct HardwareCountRow {
    hardware_info_id: String,
    total: u64,
}

/// SurrealDB implementation of the HardwareType repository.
#[derive(Clone)]
pub struct SurrealHardwareTypeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHardwareTypeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Hardware tallies per type id, summed across each type's models.
    async fn hardware_counts(&self, type_ids: &[String]) -> Result<HashMap<String, u64>, DbError> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        if type_ids.is_empty() {
            return Ok(counts);
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, hardware_type_id \
                 FROM hardware_info WHERE hardware_type_id IN $ids",
            )
            .bind(("ids", type_ids.to_vec()))
            .await?;
        let links: Vec<InfoLinkRow> = result.take(0)?;
        if links.is_empty() {
            return Ok(counts);
        }

        let info_ids: Vec<String> = links.iter().map(|l| l.record_id.clone()).collect();
        let mut result = self
            .db
            .query(
                "SELECT hardware_info_id, count() AS total FROM hardware \
                 WHERE hardware_info_id IN $ids GROUP BY hardware_info_id",
            )
            .bind(("ids", info_ids))
            .await?;
        let per_info: Vec<HardwareCountRow> = result.take(0)?;
        let per_info: HashMap<String, u64> = per_info
            .into_iter()
            .map(|r| (r.hardware_info_id, r.total))
            .collect();

        for link in links {
            let n = per_info.get(&link.record_id).copied().unwrap_or(0);
            *counts.entry(link.hardware_type_id).or_insert(0) += n;
        }
        Ok(counts)
    }
}

impl<C: Connection> HardwareTypeRepository for SurrealHardwareTypeRepository<C> {
    async fn create(&self, input: CreateHardwareType) -> DcimResult<HardwareType> {
        ensure_unique(
            &self.db,
            "hardware_type",
            &[("name", &input.name)],
            None,
            "Hardware type name already taken",
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('hardware_type', $id) SET \
                 name = $name, category = $category, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("category", input.category))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HardwareTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware type".into(),
            id: id_str,
        })?;

        Ok(row.into_hardware_type(id))
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<HardwareType> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('hardware_type', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HardwareTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware type".into(),
            id: id_str,
        })?;

        Ok(row.into_hardware_type(id))
    }

    async fn update(&self, id: Uuid, input: UpdateHardwareType) -> DcimResult<HardwareType> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(name) = &input.name {
            if *name != current.name {
                ensure_unique(
                    &self.db,
                    "hardware_type",
                    &[("name", name)],
                    Some(&id_str),
                    "Hardware type name already taken",
                )
                .await?;
            }
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.category.is_some() {
            sets.push("category = $category");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('hardware_type', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(category) = input.category {
            builder = builder.bind(("category", category));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HardwareTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware type".into(),
            id: id_str,
        })?;

        Ok(row.into_hardware_type(id))
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::HardwareType, id).await
    }

    async fn list(
        &self,
        filter: HardwareTypeFilter,
        options: ListOptions,
    ) -> DcimResult<Page<HardwareTypeSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("hardware_type");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);
        query.eq("category", filter.category);

        let (rows, total): (Vec<HardwareTypeRowWithId>, u64) =
            query.run(&self.db, &resolved).await?;
        let types = rows
            .into_iter()
            .map(|row| row.try_into_hardware_type())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = types.iter().map(|t| t.id.to_string()).collect();
        let counts = self.hardware_counts(&ids).await?;

        let results = types
            .into_iter()
            .map(|hardware_type| {
                let hardware_count = counts
                    .get(&hardware_type.id.to_string())
                    .copied()
                    .unwrap_or(0);
                HardwareTypeSummary {
                    hardware_type,
                    hardware_count,
                }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
