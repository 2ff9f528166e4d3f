//! Request actor model.
//!
//! An [`Actor`] is never persisted. Professional roles come from the
//! authentication context; owner and family roles are derived per pet.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of roles an actor can hold with respect to a pet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Owner,
    FamilyMember,
    Doctor,
    ClinicOwner,
}

impl Role {
    /// Roles that can only be asserted by the authentication layer.
    pub fn is_professional(self) -> bool {
        matches!(self, Role::Doctor | Role::ClinicOwner)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::FamilyMember => "FamilyMember",
            Role::Doctor => "Doctor",
            Role::ClinicOwner => "ClinicOwner",
        }
    }
}

/// Identity handed over by the (external) login subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub authenticated_roles: BTreeSet<Role>,
    /// Clinic the professional is acting for, if any.
    pub clinic_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub roles: BTreeSet<Role>,
    pub clinic_id: Option<Uuid>,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            roles: BTreeSet::new(),
            clinic_id: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn at_clinic(mut self, clinic_id: Uuid) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// The clinic this actor acts for, provided it holds `role`.
    pub fn clinic_for(&self, role: Role) -> Option<Uuid> {
        if self.has_role(role) {
            self.clinic_id
        } else {
            None
        }
    }
}

impl From<&AuthContext> for Actor {
    /// Only professional roles are carried over; pet-relative roles
    /// must be resolved against membership data.
    fn from(ctx: &AuthContext) -> Self {
        Self {
            user_id: ctx.user_id,
            roles: ctx
                .authenticated_roles
                .iter()
                .copied()
                .filter(|r| r.is_professional())
                .collect(),
            clinic_id: ctx.clinic_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_context_cannot_assert_pet_roles() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            authenticated_roles: [Role::Owner, Role::Doctor].into_iter().collect(),
            clinic_id: Some(Uuid::new_v4()),
        };
        let actor = Actor::from(&ctx);
        assert!(actor.has_role(Role::Doctor));
        assert!(!actor.has_role(Role::Owner));
        assert_eq!(actor.clinic_id, ctx.clinic_id);
    }

    #[test]
    fn clinic_for_requires_role() {
        let clinic = Uuid::new_v4();
        let actor = Actor::new(Uuid::new_v4())
            .with_role(Role::Doctor)
            .at_clinic(clinic);
        assert_eq!(actor.clinic_for(Role::Doctor), Some(clinic));
        assert_eq!(actor.clinic_for(Role::ClinicOwner), None);
    }
}
