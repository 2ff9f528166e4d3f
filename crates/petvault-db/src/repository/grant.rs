//! SurrealDB implementation of [`AccessGrantRepository`].
//!
//! Every status change is a single `UPDATE ... WHERE status = 'Active'`
//! so concurrent revoke, sweep and supersede operations commute: a grant
//! only ever leaves `Active` once.

use chrono::{DateTime, Utc};
use petvault_core::error::VetResult;
use petvault_core::models::grant::{AccessGrant, CreateAccessGrant, GrantStatus, active_key};
use petvault_core::repository::{AccessGrantRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

const ENTITY: &str = "access_grant";

#[derive(Debug, SurrealValue)]
struct GrantRow {
    grant_id: String,
    pet_id: String,
    clinic_id: String,
    doctor_id: Option<String>,
    owner_id: String,
    otp_id: String,
    purpose: String,
    status: String,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_by: Option<String>,
    superseded_by: Option<String>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<GrantStatus, DbError> {
    match s {
        "Active" => Ok(GrantStatus::Active),
        "Expired" => Ok(GrantStatus::Expired),
        "Revoked" => Ok(GrantStatus::Revoked),
        other => Err(DbError::Decode(format!("unknown grant status: {other}"))),
    }
}

impl GrantRow {
    fn try_into_grant(self) -> Result<AccessGrant, DbError> {
        Ok(AccessGrant {
            id: parse_uuid("grant", &self.grant_id)?,
            pet_id: parse_uuid("pet", &self.pet_id)?,
            clinic_id: parse_uuid("clinic", &self.clinic_id)?,
            doctor_id: parse_opt_uuid("doctor", self.doctor_id.as_deref())?,
            owner_id: parse_uuid("owner", &self.owner_id)?,
            otp_id: parse_uuid("otp", &self.otp_id)?,
            purpose: self.purpose,
            status: parse_status(&self.status)?,
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            revoked_by: parse_opt_uuid("revoked_by", self.revoked_by.as_deref())?,
            superseded_by: parse_opt_uuid("superseded_by", self.superseded_by.as_deref())?,
            updated_at: self.updated_at,
        })
    }
}

fn first_grant(rows: Vec<GrantRow>) -> Result<Option<AccessGrant>, DbError> {
    rows.into_iter()
        .next()
        .map(GrantRow::try_into_grant)
        .transpose()
}

/// SurrealDB implementation of the access grant repository.
#[derive(Clone)]
pub struct SurrealAccessGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccessGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AccessGrantRepository for SurrealAccessGrantRepository<C> {
    async fn activate(&self, input: CreateAccessGrant) -> VetResult<AccessGrant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let key = active_key(input.pet_id, input.clinic_id);

        // The supersede and the insert share one transaction; the unique
        // index on `active_key` rejects a concurrent activation that
        // slipped in between. A predecessor already past its expiry is
        // closed as Expired and keeps no successor link.
        let response = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE access_grant SET \
                 status = IF expires_at <= $granted_at THEN 'Expired' ELSE 'Revoked' END, \
                 superseded_by = IF expires_at <= $granted_at THEN NONE ELSE $grant_id END, \
                 active_key = string::concat('closed:', grant_id), \
                 updated_at = $granted_at \
                 WHERE active_key = $active_key AND status = 'Active'; \
                 CREATE type::record('access_grant', $grant_id) SET \
                 grant_id = $grant_id, \
                 pet_id = $pet_id, \
                 clinic_id = $clinic_id, \
                 doctor_id = $doctor_id, \
                 owner_id = $owner_id, \
                 otp_id = $otp_id, \
                 purpose = $purpose, \
                 status = 'Active', \
                 active_key = $active_key, \
                 granted_at = $granted_at, \
                 expires_at = $expires_at, \
                 revoked_by = NONE, \
                 superseded_by = NONE, \
                 updated_at = $granted_at; \
                 COMMIT TRANSACTION;",
            )
            .bind(("grant_id", id_str.clone()))
            .bind(("active_key", key))
            .bind(("pet_id", input.pet_id.to_string()))
            .bind(("clinic_id", input.clinic_id.to_string()))
            .bind(("doctor_id", input.doctor_id.map(|d| d.to_string())))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("otp_id", input.otp_id.to_string()))
            .bind(("purpose", input.purpose))
            .bind(("granted_at", input.granted_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        response
            .check()
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        debug!(grant_id = %id, pet_id = %input.pet_id, clinic_id = %input.clinic_id, "Grant row activated");

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> VetResult<AccessGrant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('access_grant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        let grant = first_grant(rows)?.ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(grant)
    }

    async fn find_active(&self, pet_id: Uuid, clinic_id: Uuid) -> VetResult<Option<AccessGrant>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM access_grant \
                 WHERE active_key = $active_key AND status = 'Active'",
            )
            .bind(("active_key", active_key(pet_id, clinic_id)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_grant(rows)?)
    }

    async fn revoke(
        &self,
        id: Uuid,
        revoked_by: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<Option<AccessGrant>> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('access_grant', $id) SET \
                 status = 'Revoked', \
                 revoked_by = $revoked_by, \
                 active_key = string::concat('closed:', grant_id), \
                 updated_at = $now \
                 WHERE status = 'Active' AND expires_at > $now",
            )
            .bind(("id", id_str.clone()))
            .bind(("revoked_by", revoked_by.to_string()))
            .bind(("now", now))
            .await
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_grant(rows)?)
    }

    async fn assign_doctor(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<Option<AccessGrant>> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('access_grant', $id) SET \
                 doctor_id = $doctor_id, \
                 updated_at = $now \
                 WHERE status = 'Active' AND expires_at > $now",
            )
            .bind(("id", id_str.clone()))
            .bind(("doctor_id", doctor_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_grant(rows)?)
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> VetResult<u64> {
        let result = self
            .db
            .query(
                "UPDATE access_grant SET \
                 status = 'Expired', \
                 active_key = string::concat('closed:', grant_id), \
                 updated_at = $now \
                 WHERE status = 'Active' AND expires_at <= $now",
            )
            .bind(("now", now))
            .await
            .map_err(|e| DbError::from_write(e, ENTITY, "sweep"))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, ENTITY, "sweep"))?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }

    async fn list_by_pet(
        &self,
        pet_id: Uuid,
        pagination: Pagination,
    ) -> VetResult<PaginatedResult<AccessGrant>> {
        let pet_id_str = pet_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM access_grant \
                 WHERE pet_id = $pet_id GROUP ALL",
            )
            .bind(("pet_id", pet_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT * FROM access_grant \
                 WHERE pet_id = $pet_id \
                 ORDER BY granted_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("pet_id", pet_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(GrantRow::try_into_grant)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
