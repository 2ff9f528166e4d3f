//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

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

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "access_grants_and_otps",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "directory_views",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: grants and one-time codes (owned by this core)
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Access grants
-- =======================================================================
-- `active_key` is `<pet_id>:<clinic_id>` while the grant is Active and
-- `closed:<grant_id>` once terminal, so the unique index admits at most
-- one active grant per pet and clinic.
DEFINE TABLE access_grant SCHEMAFULL;
DEFINE FIELD grant_id ON TABLE access_grant TYPE string;
DEFINE FIELD pet_id ON TABLE access_grant TYPE string;
DEFINE FIELD clinic_id ON TABLE access_grant TYPE string;
DEFINE FIELD doctor_id ON TABLE access_grant TYPE option<string>;
DEFINE FIELD owner_id ON TABLE access_grant TYPE string;
DEFINE FIELD otp_id ON TABLE access_grant TYPE string;
DEFINE FIELD purpose ON TABLE access_grant TYPE string;
DEFINE FIELD status ON TABLE access_grant TYPE string \
    ASSERT $value IN ['Active', 'Expired', 'Revoked'];
DEFINE FIELD active_key ON TABLE access_grant TYPE string;
DEFINE FIELD granted_at ON TABLE access_grant TYPE datetime;
DEFINE FIELD expires_at ON TABLE access_grant TYPE datetime;
DEFINE FIELD revoked_by ON TABLE access_grant TYPE option<string>;
DEFINE FIELD superseded_by ON TABLE access_grant TYPE option<string>;
DEFINE FIELD updated_at ON TABLE access_grant TYPE datetime;
DEFINE INDEX idx_grant_active_key ON TABLE access_grant \
    COLUMNS active_key UNIQUE;
DEFINE INDEX idx_grant_pet_clinic ON TABLE access_grant \
    COLUMNS pet_id, clinic_id;
DEFINE INDEX idx_grant_expires ON TABLE access_grant \
    COLUMNS expires_at;

-- =======================================================================
-- One-time codes
-- =======================================================================
DEFINE TABLE otp SCHEMAFULL;
DEFINE FIELD pet_id ON TABLE otp TYPE string;
DEFINE FIELD clinic_id ON TABLE otp TYPE string;
DEFINE FIELD owner_id ON TABLE otp TYPE string;
DEFINE FIELD code_hash ON TABLE otp TYPE string;
DEFINE FIELD purpose ON TABLE otp TYPE string;
DEFINE FIELD status ON TABLE otp TYPE string \
    ASSERT $value IN ['Pending', 'Used', 'Expired', 'Locked'];
DEFINE FIELD attempt_count ON TABLE otp TYPE int ASSERT $value >= 0;
DEFINE FIELD max_attempts ON TABLE otp TYPE int ASSERT $value > 0;
DEFINE FIELD issued_at ON TABLE otp TYPE datetime;
DEFINE FIELD expires_at ON TABLE otp TYPE datetime;
DEFINE INDEX idx_otp_pet_clinic ON TABLE otp \
    COLUMNS pet_id, clinic_id;
DEFINE INDEX idx_otp_expires ON TABLE otp \
    COLUMNS expires_at;
";

// -----------------------------------------------------------------------
// Schema v2: read-only views of CRUD-owned tables
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE IF NOT EXISTS pet SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS name ON TABLE pet TYPE string;
DEFINE FIELD IF NOT EXISTS owner_id ON TABLE pet TYPE string;
DEFINE FIELD IF NOT EXISTS owner_contact ON TABLE pet TYPE string;

DEFINE TABLE IF NOT EXISTS clinic SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS name ON TABLE clinic TYPE string;

DEFINE TABLE IF NOT EXISTS clinic_doctor SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS clinic_id ON TABLE clinic_doctor TYPE string;
DEFINE FIELD IF NOT EXISTS doctor_id ON TABLE clinic_doctor TYPE string;
DEFINE INDEX IF NOT EXISTS idx_clinic_doctor ON TABLE clinic_doctor \
    COLUMNS clinic_id, doctor_id UNIQUE;

DEFINE TABLE IF NOT EXISTS family_member SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS pet_id ON TABLE family_member TYPE string;
DEFINE FIELD IF NOT EXISTS user_id ON TABLE family_member TYPE string;
DEFINE FIELD IF NOT EXISTS access_level ON TABLE family_member \
    TYPE string ASSERT $value IN ['Full', 'ReadOnly'];
DEFINE INDEX IF NOT EXISTS idx_family_pet_user ON TABLE family_member \
    COLUMNS pet_id, user_id UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Outcome of bringing a store up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied by this call, ascending.
    pub applied: Vec<u32>,
    /// Highest version recorded after this call.
    pub current_version: u32,
}

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

async fn applied_versions<C: Connection>(db: &Surreal<C>) -> Result<Vec<u32>, DbError> {
    let mut result = db.query("SELECT version FROM _migration").await?;
    let rows: Vec<AppliedVersion> = result.take(0)?;
    Ok(rows.into_iter().map(|r| r.version).collect())
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    db.query(migration.sql).await?.check().map_err(|e| {
        DbError::Migration(format!(
            "v{} '{}' rejected: {e}",
            migration.version, migration.name
        ))
    })?;

    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!("v{} applied but not recorded: {e}", migration.version))
        })?;
    Ok(())
}

/// Bring the grant store's schema up to date.
///
/// Every migration whose version is missing from `_migration` is
/// applied in ascending order, so a store restored from an older dump
/// picks up later tables too.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<MigrationReport, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("tracking table: {e}")))?;

    let done = applied_versions(db).await?;
    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !done.contains(&m.version))
        .collect();

    let mut report = MigrationReport {
        applied: Vec::with_capacity(pending.len()),
        current_version: done.iter().copied().max().unwrap_or(0),
    };
    if pending.is_empty() {
        debug!(schema_version = report.current_version, "Grant store schema current");
        return Ok(report);
    }

    for migration in pending {
        info!(version = migration.version, name = migration.name, "Applying migration");
        apply(db, migration).await?;
        report.applied.push(migration.version);
        report.current_version = report.current_version.max(migration.version);
    }

    info!(
        schema_version = report.current_version,
        applied = ?report.applied,
        "Grant store schema migrated"
    );
    Ok(report)
}

/// Returns the raw DDL for the grant and one-time code tables.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
