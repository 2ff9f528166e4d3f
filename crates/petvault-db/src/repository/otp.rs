//! SurrealDB implementation of [`OtpRepository`].

use chrono::{DateTime, Utc};
use petvault_core::error::VetResult;
use petvault_core::models::otp::{CreateOtp, Otp, OtpStatus, OtpTransition};
use petvault_core::repository::OtpRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

const ENTITY: &str = "otp";

#[derive(Debug, SurrealValue)]
struct OtpRow {
    pet_id: String,
    clinic_id: String,
    owner_id: String,
    code_hash: String,
    purpose: String,
    status: String,
    attempt_count: u32,
    max_attempts: u32,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<OtpStatus, DbError> {
    match s {
        "Pending" => Ok(OtpStatus::Pending),
        "Used" => Ok(OtpStatus::Used),
        "Expired" => Ok(OtpStatus::Expired),
        "Locked" => Ok(OtpStatus::Locked),
        other => Err(DbError::Decode(format!("unknown otp status: {other}"))),
    }
}

impl OtpRow {
    fn into_otp(self, id: Uuid) -> Result<Otp, DbError> {
        Ok(Otp {
            id,
            pet_id: parse_uuid("pet", &self.pet_id)?,
            clinic_id: parse_uuid("clinic", &self.clinic_id)?,
            owner_id: parse_uuid("owner", &self.owner_id)?,
            code_hash: self.code_hash,
            purpose: self.purpose,
            status: parse_status(&self.status)?,
            attempt_count: self.attempt_count,
            max_attempts: self.max_attempts,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        })
    }
}

/// SurrealDB implementation of the one-time code repository.
#[derive(Clone)]
pub struct SurrealOtpRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOtpRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OtpRepository for SurrealOtpRepository<C> {
    async fn create(&self, input: CreateOtp) -> VetResult<Otp> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('otp', $id) SET \
                 pet_id = $pet_id, \
                 clinic_id = $clinic_id, \
                 owner_id = $owner_id, \
                 code_hash = $code_hash, \
                 purpose = $purpose, \
                 status = 'Pending', \
                 attempt_count = 0, \
                 max_attempts = $max_attempts, \
                 issued_at = $issued_at, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("pet_id", input.pet_id.to_string()))
            .bind(("clinic_id", input.clinic_id.to_string()))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("code_hash", input.code_hash))
            .bind(("purpose", input.purpose))
            .bind(("max_attempts", input.max_attempts))
            .bind(("issued_at", input.issued_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let rows: Vec<OtpRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_otp(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> VetResult<Otp> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('otp', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OtpRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_otp(id)?)
    }

    async fn transition(&self, id: Uuid, change: OtpTransition) -> VetResult<Option<Otp>> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('otp', $id) SET \
                 status = $status, \
                 attempt_count = $attempt_count \
                 WHERE status = 'Pending' \
                 AND attempt_count = $expected_attempts",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", change.status.as_str().to_string()))
            .bind(("attempt_count", change.attempt_count))
            .bind(("expected_attempts", change.expected_attempts))
            .await
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write(e, ENTITY, &id_str))?;

        let rows: Vec<OtpRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.into_otp(id))
            .transpose()
            .map_err(Into::into)
    }
}
