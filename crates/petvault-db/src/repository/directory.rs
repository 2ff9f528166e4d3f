//! SurrealDB implementation of [`DirectoryRepository`].
//!
//! Pets, clinics and clinic staff are owned by the CRUD layer; this
//! repository only reads them.

use petvault_core::error::VetResult;
use petvault_core::models::directory::{ClinicSummary, PetSummary};
use petvault_core::repository::DirectoryRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PetRow {
    name: String,
    owner_id: String,
    owner_contact: String,
}

#[derive(Debug, SurrealValue)]
struct ClinicRow {
    name: String,
}

/// SurrealDB implementation of the pet/clinic directory.
#[derive(Clone)]
pub struct SurrealDirectoryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDirectoryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DirectoryRepository for SurrealDirectoryRepository<C> {
    async fn get_pet(&self, pet_id: Uuid) -> VetResult<PetSummary> {
        let id_str = pet_id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('pet', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PetRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pet".into(),
            id: id_str,
        })?;

        Ok(PetSummary {
            id: pet_id,
            name: row.name,
            owner_id: parse_uuid("owner", &row.owner_id)?,
            owner_contact: row.owner_contact,
        })
    }

    async fn get_clinic(&self, clinic_id: Uuid) -> VetResult<ClinicSummary> {
        let id_str = clinic_id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('clinic', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClinicRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "clinic".into(),
            id: id_str,
        })?;

        Ok(ClinicSummary {
            id: clinic_id,
            name: row.name,
        })
    }

    async fn is_affiliated(&self, doctor_id: Uuid, clinic_id: Uuid) -> VetResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM clinic_doctor \
                 WHERE clinic_id = $clinic_id AND doctor_id = $doctor_id \
                 GROUP ALL",
            )
            .bind(("clinic_id", clinic_id.to_string()))
            .bind(("doctor_id", doctor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
