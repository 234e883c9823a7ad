//! SurrealDB implementation of [`RoomRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::room::{CreateRoom, Room, RoomFilter, RoomSummary, UpdateRoom};
use dcim_core::policy::EntityKind;
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::RoomRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::cascade;
use crate::error::DbError;
use crate::query::{ListQuery, ensure_exists, ensure_unique};

const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["name", "description"];
const CONFLICT: &str = "Room name already taken in this site";

#[derive(Debug, SurrealValue)]
struct RoomRow {
    site_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoomRow {
    fn into_room(self, id: Uuid) -> Result<Room, DbError> {
        let site_id = Uuid::parse_str(&self.site_id)
            .map_err(|e| DbError::Query(format!("invalid site UUID: {e}")))?;
        Ok(Room {
            id,
            site_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RoomRowWithId {
    record_id: String,
    site_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoomRowWithId {
    fn try_into_room(self) -> Result<Room, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let site_id = Uuid::parse_str(&self.site_id)
            .map_err(|e| DbError::Query(format!("invalid site UUID: {e}")))?;
        Ok(Room {
            id,
            site_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RackCountRow {
    room_id: String,
    total: u64,
}

/// SurrealDB implementation of the Room repository.
#[derive(Clone)]
pub struct SurrealRoomRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoomRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoomRepository for SurrealRoomRepository<C> {
    async fn create(&self, input: CreateRoom) -> DcimResult<Room> {
        let site_id_str = input.site_id.to_string();
        ensure_exists(&self.db, EntityKind::Site, &site_id_str).await?;
        ensure_unique(
            &self.db,
            "room",
            &[("name", &input.name), ("site_id", &site_id_str)],
            None,
            CONFLICT,
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('room', $id) SET \
                 site_id = $site_id, \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("site_id", site_id_str))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoomRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "room".into(),
            id: id_str,
        })?;

        Ok(row.into_room(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<Room> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('room', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoomRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "room".into(),
            id: id_str,
        })?;

        Ok(row.into_room(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateRoom) -> DcimResult<Room> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(site_id) = input.site_id {
            ensure_exists(&self.db, EntityKind::Site, &site_id.to_string()).await?;
        }

        if input.name.is_some() || input.site_id.is_some() {
            let target_name = input.name.clone().unwrap_or(current.name);
            let target_site = input.site_id.unwrap_or(current.site_id).to_string();
            ensure_unique(
                &self.db,
                "room",
                &[("name", &target_name), ("site_id", &target_site)],
                Some(&id_str),
                CONFLICT,
            )
            .await?;
        }

        let mut sets = Vec::new();
        if input.site_id.is_some() {
            sets.push("site_id = $site_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('room', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(site_id) = input.site_id {
            builder = builder.bind(("site_id", site_id.to_string()));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoomRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "room".into(),
            id: id_str,
        })?;

        Ok(row.into_room(id)?)
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        cascade::delete_entity(&self.db, EntityKind::Room, id).await
    }

    async fn list(&self, filter: RoomFilter, options: ListOptions) -> DcimResult<Page<RoomSummary>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("room");
        query.search(SEARCHABLE, filter.search);
        query.eq("name", filter.name);
        query.eq("site_id", filter.site_id.map(|id| id.to_string()));

        let (rows, total): (Vec<RoomRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let rooms = rows
            .into_iter()
            .map(|row| row.try_into_room())
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<String> = rooms.iter().map(|r| r.id.to_string()).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        if !ids.is_empty() {
            let mut result = self
                .db
                .query(
                    "SELECT room_id, count() AS total FROM rack \
                     WHERE room_id IN $ids GROUP BY room_id",
                )
                .bind(("ids", ids))
                .await
                .map_err(DbError::from)?;
            let count_rows: Vec<RackCountRow> = result.take(0).map_err(DbError::from)?;
            counts = count_rows.into_iter().map(|r| (r.room_id, r.total)).collect();
        }

        let results = rooms
            .into_iter()
            .map(|room| {
                let rack_count = counts.get(&room.id.to_string()).copied().unwrap_or(0);
                RoomSummary { room, rack_count }
            })
            .collect();

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}
