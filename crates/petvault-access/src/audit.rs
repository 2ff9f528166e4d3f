//! Authorship stamps for medical resources.

use chrono::{DateTime, Utc};
use petvault_core::error::VetResult;
use petvault_core::models::actor::{Actor, Role};
use petvault_core::models::medical::{ResourceKind, ResourceProvenance};
use uuid::Uuid;

use crate::error::AccessError;

/// Order in which a multi-role actor's authoring role is chosen.
const ROLE_PRECEDENCE: [Role; 4] = [
    Role::Owner,
    Role::FamilyMember,
    Role::Doctor,
    Role::ClinicOwner,
];

/// Stamps creation and update metadata. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditAnnotator;

impl AuditAnnotator {
    pub fn new() -> Self {
        Self
    }

    /// The role an actor's writes are attributed to.
    pub fn authoring_role(actor: &Actor) -> Option<Role> {
        ROLE_PRECEDENCE.into_iter().find(|r| actor.has_role(*r))
    }

    pub fn stamp_create(
        &self,
        actor: &Actor,
        kind: ResourceKind,
        pet_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<ResourceProvenance> {
        let role = Self::authoring_role(actor).ok_or(AccessError::NoAuthorRole)?;
        Ok(ResourceProvenance {
            pet_id,
            kind,
            created_by_user_id: actor.user_id,
            created_by_role: role,
            clinic_id: if role.is_professional() {
                actor.clinic_id
            } else {
                None
            },
            created_at: now,
            updated_by_user_id: None,
            updated_at: None,
        })
    }

    /// Record an edit. Creation fields are carried over untouched.
    pub fn stamp_update(
        &self,
        provenance: &ResourceProvenance,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> VetResult<ResourceProvenance> {
        Self::authoring_role(actor).ok_or(AccessError::NoAuthorRole)?;
        Ok(ResourceProvenance {
            updated_by_user_id: Some(actor.user_id),
            updated_at: Some(now),
            ..provenance.clone()
        })
    }
}
