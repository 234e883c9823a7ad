//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity. UUIDs
//! are stored as strings. Enums are stored as strings with ASSERT
//! constraints. Compound unique indexes back every scoped-uniqueness
//! rule so that a concurrent check-then-insert race surfaces as a
//! storage error instead of silently corrupting the invariant.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Regions (containment root, global scope)
-- =======================================================================
DEFINE TABLE region SCHEMAFULL;
DEFINE FIELD name ON TABLE region TYPE string;
DEFINE FIELD description ON TABLE region TYPE option<string>;
DEFINE FIELD created_at ON TABLE region TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE region TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_region_name ON TABLE region COLUMNS name UNIQUE;

-- =======================================================================
-- Zones (scoped to region)
-- =======================================================================
DEFINE TABLE zone SCHEMAFULL;
DEFINE FIELD region_id ON TABLE zone TYPE string;
DEFINE FIELD name ON TABLE zone TYPE string;
DEFINE FIELD description ON TABLE zone TYPE option<string>;
DEFINE FIELD created_at ON TABLE zone TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE zone TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_zone_region_name ON TABLE zone \
    COLUMNS region_id, name UNIQUE;
DEFINE INDEX idx_zone_region ON TABLE zone COLUMNS region_id;

-- =======================================================================
-- Sites (scoped to zone)
-- =======================================================================
DEFINE TABLE site SCHEMAFULL;
DEFINE FIELD zone_id ON TABLE site TYPE string;
DEFINE FIELD name ON TABLE site TYPE string;
DEFINE FIELD description ON TABLE site TYPE option<string>;
DEFINE FIELD created_at ON TABLE site TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE site TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_site_zone_name ON TABLE site \
    COLUMNS zone_id, name UNIQUE;
DEFINE INDEX idx_site_zone ON TABLE site COLUMNS zone_id;

-- =======================================================================
-- Rooms (scoped to site)
-- =======================================================================
DEFINE TABLE room SCHEMAFULL;
DEFINE FIELD site_id ON TABLE room TYPE string;
DEFINE FIELD name ON TABLE room TYPE string;
DEFINE FIELD description ON TABLE room TYPE option<string>;
DEFINE FIELD created_at ON TABLE room TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE room TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_room_site_name ON TABLE room \
    COLUMNS site_id, name UNIQUE;
DEFINE INDEX idx_room_site ON TABLE room COLUMNS site_id;

-- =======================================================================
-- Racks (scoped to room)
-- =======================================================================
DEFINE TABLE rack SCHEMAFULL;
DEFINE FIELD room_id ON TABLE rack TYPE string;
DEFINE FIELD name ON TABLE rack TYPE string;
DEFINE FIELD description ON TABLE rack TYPE option<string>;
DEFINE FIELD unit ON TABLE rack TYPE int DEFAULT 42;
DEFINE FIELD created_at ON TABLE rack TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE rack TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_rack_room_name ON TABLE rack \
    COLUMNS room_id, name UNIQUE;
DEFINE INDEX idx_rack_room ON TABLE rack COLUMNS room_id;

-- =======================================================================
-- Tenant groups (ownership root, global scope)
-- =======================================================================
DEFINE TABLE tenant_group SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant_group TYPE string;
DEFINE FIELD description ON TABLE tenant_group TYPE option<string>;
DEFINE FIELD created_at ON TABLE tenant_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_group_name ON TABLE tenant_group \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Tenants (scoped to tenant group)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD tenant_group_id ON TABLE tenant TYPE string;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD description ON TABLE tenant TYPE option<string>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_group_name ON TABLE tenant \
    COLUMNS tenant_group_id, name UNIQUE;
DEFINE INDEX idx_tenant_group ON TABLE tenant COLUMNS tenant_group_id;

-- =======================================================================
-- Hardware types (catalog, global scope)
-- =======================================================================
DEFINE TABLE hardware_type SCHEMAFULL;
DEFINE FIELD name ON TABLE hardware_type TYPE string;
DEFINE FIELD category ON TABLE hardware_type TYPE option<string>;
DEFINE FIELD description ON TABLE hardware_type TYPE option<string>;
DEFINE FIELD created_at ON TABLE hardware_type TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE hardware_type TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_hardware_type_name ON TABLE hardware_type \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Hardware infos (catalog models, compound-unique)
-- =======================================================================
DEFINE TABLE hardware_info SCHEMAFULL;
DEFINE FIELD hardware_type_id ON TABLE hardware_info TYPE string;
DEFINE FIELD manufacturer ON TABLE hardware_info TYPE string;
DEFINE FIELD model ON TABLE hardware_info TYPE string;
DEFINE FIELD height ON TABLE hardware_info TYPE int DEFAULT 1;
DEFINE FIELD created_at ON TABLE hardware_info TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE hardware_info TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_hardware_info_make_model ON TABLE hardware_info \
    COLUMNS manufacturer, model UNIQUE;
DEFINE INDEX idx_hardware_info_type ON TABLE hardware_info \
    COLUMNS hardware_type_id;

-- =======================================================================
-- Hardware (physical items)
-- =======================================================================
DEFINE TABLE hardware SCHEMAFULL;
DEFINE FIELD rack_id ON TABLE hardware TYPE string;
DEFINE FIELD hardware_info_id ON TABLE hardware TYPE string;
DEFINE FIELD tenant_id ON TABLE hardware TYPE option<string>;
DEFINE FIELD name ON TABLE hardware TYPE string;
DEFINE FIELD status ON TABLE hardware TYPE string \
    ASSERT $value IN ['active', 'maintenance', 'failed', 'offline', \
    'reserved', 'deprecated'];
DEFINE FIELD serial_number ON TABLE hardware TYPE option<string>;
DEFINE FIELD oob_ip ON TABLE hardware TYPE option<string>;
DEFINE FIELD specifications ON TABLE hardware TYPE option<string>;
DEFINE FIELD note ON TABLE hardware TYPE option<string>;
DEFINE FIELD u_position ON TABLE hardware TYPE option<int>;
DEFINE FIELD warranty_start ON TABLE hardware TYPE option<datetime>;
DEFINE FIELD warranty_end ON TABLE hardware TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE hardware TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE hardware TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_hardware_rack ON TABLE hardware COLUMNS rack_id;
DEFINE INDEX idx_hardware_info ON TABLE hardware \
    COLUMNS hardware_info_id;
DEFINE INDEX idx_hardware_tenant ON TABLE hardware COLUMNS tenant_id;
DEFINE INDEX idx_hardware_serial ON TABLE hardware \
    COLUMNS serial_number;

-- =======================================================================
-- Interface connections
-- =======================================================================
DEFINE TABLE interface_connection SCHEMAFULL;
DEFINE FIELD hardware_id ON TABLE interface_connection TYPE string;
DEFINE FIELD connected_switch_id ON TABLE interface_connection \
    TYPE option<string>;
DEFINE FIELD name ON TABLE interface_connection TYPE string;
DEFINE FIELD mac_address ON TABLE interface_connection \
    TYPE option<string>;
DEFINE FIELD ip_address ON TABLE interface_connection \
    TYPE option<string>;
DEFINE FIELD speed ON TABLE interface_connection TYPE option<string>;
DEFINE FIELD interface_type ON TABLE interface_connection \
    TYPE option<string>;
DEFINE FIELD connected_port ON TABLE interface_connection \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE interface_connection TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE interface_connection TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_interface_hardware ON TABLE interface_connection \
    COLUMNS hardware_id;
DEFINE INDEX idx_interface_switch ON TABLE interface_connection \
    COLUMNS connected_switch_id;

-- =======================================================================
-- Users (auxiliary, soft-deleted)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE option<string>;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['user', 'admin', 'moderator'];
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['active', 'pending', 'banned'];
DEFINE FIELD is_email_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD deleted_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcim_core::policy::{DeletePolicy, EntityKind, RELATIONS};

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn schema_defines_every_policy_table() {
        let kinds = [
            EntityKind::Region,
            EntityKind::Zone,
            EntityKind::Site,
            EntityKind::Room,
            EntityKind::Rack,
            EntityKind::TenantGroup,
            EntityKind::Tenant,
            EntityKind::HardwareType,
            EntityKind::HardwareInfo,
            EntityKind::Hardware,
            EntityKind::InterfaceConnection,
            EntityKind::User,
        ];
        for kind in kinds {
            let ddl = format!("DEFINE TABLE {} SCHEMAFULL", kind.table());
            assert!(SCHEMA_V1.contains(&ddl), "missing table for {kind:?}");
        }
    }

    #[test]
    fn schema_defines_every_foreign_key_field() {
        for rel in RELATIONS {
            let ddl_prefix = format!(
                "DEFINE FIELD {} ON TABLE {}",
                rel.foreign_key,
                rel.child.table()
            );
            assert!(
                SCHEMA_V1.contains(&ddl_prefix),
                "missing fk field {} on {}",
                rel.foreign_key,
                rel.child.table()
            );
        }
    }

    /// Nullify foreign keys must be optional fields or the policy
    /// executor could not clear them. Line continuations in the DDL
    /// string collapse to single spaces, so a plain substring check
    /// works.
    #[test]
    fn nullify_foreign_keys_are_optional() {
        for rel in RELATIONS.iter().filter(|r| r.on_delete == DeletePolicy::Nullify) {
            let ddl = format!(
                "DEFINE FIELD {} ON TABLE {} TYPE option<string>",
                rel.foreign_key,
                rel.child.table()
            );
            assert!(
                SCHEMA_V1.contains(&ddl),
                "nullify fk {} on {} must be option<string>",
                rel.foreign_key,
                rel.child.table()
            );
        }
    }
}
