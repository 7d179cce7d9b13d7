//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity. Row
//! entities are keyed by sequence-allocated integer record ids (see
//! [`crate::sequence`]); authentications are keyed by their string UID.

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
-- Sequences (one record per entity table)
-- =======================================================================
DEFINE TABLE seq SCHEMAFULL;
DEFINE FIELD value ON TABLE seq TYPE int DEFAULT 0;

-- =======================================================================
-- Tenants
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD external_tenant ON TABLE tenant TYPE string;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_external ON TABLE tenant \
    COLUMNS external_tenant UNIQUE;

-- =======================================================================
-- Sources (tenant scope)
-- =======================================================================
DEFINE TABLE source SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE source TYPE int;
DEFINE FIELD name ON TABLE source TYPE string;
DEFINE FIELD uid ON TABLE source TYPE option<string>;
DEFINE FIELD source_type_id ON TABLE source TYPE int;
DEFINE FIELD availability_status ON TABLE source TYPE option<string>;
DEFINE FIELD paused_at ON TABLE source TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE source TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE source TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_source_tenant ON TABLE source COLUMNS tenant_id;

-- =======================================================================
-- Applications (tenant scope, children of sources)
-- =======================================================================
DEFINE TABLE application SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE application TYPE int;
DEFINE FIELD source_id ON TABLE application TYPE int;
DEFINE FIELD application_type_id ON TABLE application TYPE int;
DEFINE FIELD availability_status ON TABLE application TYPE option<string>;
DEFINE FIELD paused_at ON TABLE application TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE application TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE application TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_application_source ON TABLE application \
    COLUMNS tenant_id, source_id;

-- =======================================================================
-- Endpoints (tenant scope, children of sources)
-- 'default' clashes with the DDL keyword, so the column is is_default.
-- =======================================================================
DEFINE TABLE endpoint SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE endpoint TYPE int;
DEFINE FIELD source_id ON TABLE endpoint TYPE int;
DEFINE FIELD role ON TABLE endpoint TYPE option<string>;
DEFINE FIELD is_default ON TABLE endpoint TYPE bool DEFAULT false;
DEFINE FIELD scheme ON TABLE endpoint TYPE option<string>;
DEFINE FIELD host ON TABLE endpoint TYPE option<string>;
DEFINE FIELD port ON TABLE endpoint TYPE option<int>;
DEFINE FIELD verify_ssl ON TABLE endpoint TYPE option<bool>;
DEFINE FIELD availability_status ON TABLE endpoint TYPE option<string>;
DEFINE FIELD created_at ON TABLE endpoint TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE endpoint TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_endpoint_source ON TABLE endpoint \
    COLUMNS tenant_id, source_id;

-- =======================================================================
-- Authentications (tenant scope, polymorphic owner, keyed by UID)
-- =======================================================================
DEFINE TABLE authentication SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE authentication TYPE int;
DEFINE FIELD resource_type ON TABLE authentication TYPE string \
    ASSERT $value IN ['Source', 'Endpoint', 'Application', \
    'ApplicationAuthentication'];
DEFINE FIELD resource_id ON TABLE authentication TYPE int;
DEFINE FIELD authtype ON TABLE authentication TYPE option<string>;
DEFINE FIELD name ON TABLE authentication TYPE option<string>;
DEFINE FIELD username ON TABLE authentication TYPE option<string>;
DEFINE FIELD availability_status ON TABLE authentication \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE authentication TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_authentication_owner ON TABLE authentication \
    COLUMNS tenant_id, resource_type, resource_id;

-- =======================================================================
-- Application ↔ Authentication links (tenant scope)
-- =======================================================================
DEFINE TABLE application_authentication SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE application_authentication TYPE int;
DEFINE FIELD application_id ON TABLE application_authentication TYPE int;
DEFINE FIELD authentication_uid ON TABLE application_authentication \
    TYPE string;
DEFINE FIELD created_at ON TABLE application_authentication \
    TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_appauth_pair ON TABLE application_authentication \
    COLUMNS tenant_id, application_id, authentication_uid UNIQUE;

-- =======================================================================
-- RHC connections (no direct tenant column; tenancy lives on the join)
-- =======================================================================
DEFINE TABLE rhc_connection SCHEMAFULL;
DEFINE FIELD rhc_id ON TABLE rhc_connection TYPE string;
DEFINE FIELD extra ON TABLE rhc_connection TYPE option<object> FLEXIBLE;
DEFINE FIELD availability_status ON TABLE rhc_connection \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE rhc_connection TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_rhc_connection_rhc_id ON TABLE rhc_connection \
    COLUMNS rhc_id UNIQUE;

-- =======================================================================
-- Source ↔ RHC connection join rows (tenant-tagged)
-- Keyed by [source_id, connection_id] so the record id itself is the
-- uniqueness constraint for the association.
-- source_id stays a plain int for string aggregation;
-- rhc_connection_id is a record link for traversal.
-- =======================================================================
DEFINE TABLE source_rhc_connection SCHEMAFULL;
DEFINE FIELD source_id ON TABLE source_rhc_connection TYPE int;
DEFINE FIELD rhc_connection_id ON TABLE source_rhc_connection \
    TYPE record<rhc_connection>;
DEFINE FIELD tenant_id ON TABLE source_rhc_connection TYPE int;
DEFINE FIELD created_at ON TABLE source_rhc_connection TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_source_rhc_tenant ON TABLE source_rhc_connection \
    COLUMNS tenant_id;
";

/// Applies all pending migrations.
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

#[cfg(test)]
mod tests {
    use super::*;

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
}
