//! Per-pet relationship lookup over the external owner/family tables.

use petvault_core::error::VetResult;
use petvault_core::models::actor::{Actor, AuthContext, Role};
use petvault_core::models::membership::MembershipLookup;
use petvault_core::repository::MembershipRepository;
use uuid::Uuid;

pub struct MembershipResolver<M: MembershipRepository> {
    memberships: M,
}

impl<M: MembershipRepository> MembershipResolver<M> {
    pub fn new(memberships: M) -> Self {
        Self { memberships }
    }

    /// How `user_id` relates to `pet_id`. An owner is never reported as
    /// a family member of their own pet, even if a family row exists.
    pub async fn lookup(&self, pet_id: Uuid, user_id: Uuid) -> VetResult<MembershipLookup> {
        if self.is_owner(pet_id, user_id).await? {
            return Ok(MembershipLookup {
                is_owner: true,
                family_access_level: None,
            });
        }

        let membership = self.memberships.get_membership(pet_id, user_id).await?;
        Ok(MembershipLookup {
            is_owner: false,
            family_access_level: membership.map(|m| m.access_level),
        })
    }

    pub async fn is_owner(&self, pet_id: Uuid, user_id: Uuid) -> VetResult<bool> {
        let owner = self.memberships.owner_of(pet_id).await?;
        Ok(owner == Some(user_id))
    }

    /// Combine authenticated professional roles with the caller's
    /// relationship to one pet.
    pub async fn actor_for_pet(&self, ctx: &AuthContext, pet_id: Uuid) -> VetResult<Actor> {
        let lookup = self.lookup(pet_id, ctx.user_id).await?;
        let mut actor = Actor::from(ctx);
        if lookup.is_owner {
            actor = actor.with_role(Role::Owner);
        } else if lookup.family_access_level.is_some() {
            actor = actor.with_role(Role::FamilyMember);
        }
        Ok(actor)
    }
}
