//! SurrealDB implementation of [`HardwareInfoRepository`].
//!
//! The uniqueness rule here is compound: the (manufacturer, model) pair
//! is unique globally, not either field on its own.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::hardware_info::{
    CreateHardwareInfo, DEFAULT_MODEL_HEIGHT, HardwareInfo, HardwareInfoFilter,
    HardwareInfoSummary, UpdateHardwareInfo,
};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::HardwareInfoRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &["manufacturer", "model", "height", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["manufacturer", "model"];
const CONFLICT: &str = "This manufacturer/model combination already exists";

#[derive(Debug, SurrealValue)]
struct HardwareInfoRow {
    hardware_type_id: String,
    manufacturer: String,
    model: String,
    height: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HardwareInfoRow {
    fn into_info(self, id: Uuid) -> Result<HardwareInfo, DbError> {
        let hardware_type_id = Uuid::parse_str(&self.hardware_type_id)
            .map_err(|e| DbError::Query(format!("invalid type UUID: {e}")))?;
        Ok(HardwareInfo {
            id,
            hardware_type_id,
            manufacturer: self.manufacturer,
            model: self.model,
            height: self.height,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct HardwareInfoRowWithId {
    record_id: String,
    hardware_type_id: String,
    manufacturer: String,
    model: String,
    height: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HardwareInfoRowWithId {
    fn try_into_info(self) -> Result<HardwareInfo, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let hardware_type_id = Uuid::parse_str(&self.hardware_type_id)
            .map_err(|e| DbError::Query(format!("invalid type UUID: {e}")))?;
        Ok(HardwareInfo {
            id,
            hardware_type_id,
            manufacturer: self.manufacturer,
            model: self.model,
            height: self.height,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct HardwareCountRow {
    hardware_info_id: String,
    total: u64,
}

/// SurrealDB implementation of the HardwareInfo repository.
#[derive(Clone)]
pub struct SurrealHardwareInfoRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHardwareInfoRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> HardwareInfoRepository for SurrealHardwareInfoRepository<C> {
    async fn create(&self, input: CreateHardwareInfo) -> DcimResult<HardwareInfo> {
        let type_id_str = input.hardware_type_id.to_string();
        ensure_exists(&self.db, EntityKind::HardwareType, &type_id_str).await?;
        ensure_unique(
            &self.db,
            "hardware_info",
            &[
                ("manufacturer", &input.manufacturer),
                ("model", &input.model),
            ],
            None,
            CONFLICT,
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let height = input.height.unwrap_or(DEFAULT_MODEL_HEIGHT);

        let result = self
            .db
            .query(
                "CREATE type::record('hardware_info', $id) SET \
                 hardware_type_id = $hardware_type_id, \
                 manufacturer = $manufacturer, model = $model, \
                 height = $height",
            )
            .bind(("id", id_str.clone()))
            .bind(("hardware_type_id", type_id_str))
            .bind(("manufacturer", input.manufacturer))
            .bind(("model", input.model))
            .bind(("height", height))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HardwareInfoRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware model".into(),
            id: id_str,
        })?;

        Ok(row.into_info(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<HardwareInfo> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('hardware_info', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HardwareInfoRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware model".into(),
            id: id_str,
        })?;

        Ok(row.into_info(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateHardwareInfo) -> DcimResult<HardwareInfo> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(type_id) = input.hardware_type_id {
            ensure_exists(&self.db, EntityKind::HardwareType, &type_id.to_string()).await?;
        }

        // Re-check the compound key on the effective pair.
        if input.manufacturer.is_some() || input.model.is_some() {
            let target_manufacturer = input
                .manufacturer
                .clone()
                .unwrap_or(current.manufacturer.clone());
            let target_model = input.model.clone().unwrap_or(current.model.clone());
            if target_manufacturer != current.manufacturer || target_model != current.model {
                ensure_unique(
                    &self.db,
                    "hardware_info",
                    &[
                        ("manufacturer", &target_manufacturer),
                        ("model", &target_model),
                    ],
                    Some(&id_str),
                    CONFLICT,
                )
                .await?;
            }
        }

        let mut sets = Vec::new();
        if input.hardware_type_id.is_some() {
            sets.push("hardware_type_id = $hardware_type_id");
        }
        if input.manufacturer.is_some() {
            sets.push("manufacturer = $manufacturer");
        }
        if input.model.is_some() {
            sets.push("model = $model");
        }
        if input.height.is_some() {
            sets.push("height = $height");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('hardware_info', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(type_id) = input.hardware_type_id {
            builder = builder.bind(("hardware_type_id", type_id.to_string()));
        }
        if let Some(manufacturer) = input.manufacturer {
            builder = builder.bind(("manufacturer", manufacturer));
        }
        if let Some(model) = input.model {
            builder = builder.bind(("model", model));
        }
        if let Some(height) = input.height {
            builder = builder.bind(("height", height));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HardwareInfoRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "hardware model".into(),
            id: id_str,
        })?;

        Ok(row.into_info(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::HardwareInfo, id).await
    }

    async fn list(
        &self,
        filter: HardwareInfoFilter,
        options: ListOptions,
    ) -> DcimResult<Page<HardwareInfoSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("hardware_info");
        query.search(SEARCHABLE, filter.search);
        query.eq("manufacturer", filter.manufacturer);
        query.eq("model", filter.model);
        query.eq(
            "hardware_type_id",
            filter.hardware_type_id.map(|id| id.to_string()),
        );

        let (rows, total): (Vec<HardwareInfoRowWithId>, u64) =
            query.run(&self.db, &resolved).await?;
        let infos = rows
            .into_iter()
            .map(|row| row.try_into_info())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = infos.iter().map(|i| i.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT hardware_info_id, count() AS total FROM hardware \
                     WHERE hardware_info_id IN $ids GROUP BY hardware_info_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<HardwareCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows
                .into_iter()
                .map(|r| (r.hardware_info_id, r.total))
                .collect();
        }

        let results = infos
            .into_iter()
            .map(|info| {
                let hardware_count = counts.get(&info.id.to_string()).copied().unwrap_or(0);
                HardwareInfoSummary {
                    info,
                    hardware_count,
                }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
