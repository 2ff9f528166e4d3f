//! SurrealDB implementation of [`MembershipRepository`].

use petvault_core::error::VetResult;
use petvault_core::models::membership::{AccessLevel, FamilyMembership};
use petvault_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OwnerRow {
    owner_id: String,
}

#[derive(Debug, SurrealValue)]
struct FamilyRow {
    access_level: String,
}

fn parse_access_level(s: &str) -> Result<AccessLevel, DbError> {
    match s {
        "Full" => Ok(AccessLevel::Full),
        "ReadOnly" => Ok(AccessLevel::ReadOnly),
        other => Err(DbError::Decode(format!("unknown access level: {other}"))),
    }
}

/// Read-only view over pet ownership and family membership rows.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn owner_of(&self, pet_id: Uuid) -> VetResult<Option<Uuid>> {
        let mut result = self
            .db
            .query("SELECT owner_id FROM type::record('pet', $id)")
            .bind(("id", pet_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OwnerRow> = result.take(0).map_err(DbError::from)?;
        let owner = rows
            .into_iter()
            .next()
            .map(|row| parse_uuid("owner", &row.owner_id))
            .transpose()?;

        Ok(owner)
    }

    async fn get_membership(
        &self,
        pet_id: Uuid,
        user_id: Uuid,
    ) -> VetResult<Option<FamilyMembership>> {
        let mut result = self
            .db
            .query(
                "SELECT access_level FROM family_member \
                 WHERE pet_id = $pet_id AND user_id = $user_id",
            )
            .bind(("pet_id", pet_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FamilyRow> = result.take(0).map_err(DbError::from)?;
        let membership = match rows.into_iter().next() {
            Some(row) => Some(FamilyMembership {
                pet_id,
                user_id,
                access_level: parse_access_level(&row.access_level)?,
            }),
            None => None,
        };

        Ok(membership)
    }
}
