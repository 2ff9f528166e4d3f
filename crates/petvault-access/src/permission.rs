//! Permission decisions for medical resources.
//!
//! The actor's relationship to the pet is gathered first (ownership,
//! family membership, live clinic grant), then a fixed precedence
//! table is evaluated over those facts. The first relationship that
//! applies decides, even when it denies.
//!
//! | relation                          | read  | create                 | update      |
//! |-----------------------------------|-------|------------------------|-------------|
//! | owner                             | allow | allow                  | own records |
//! | family, full                      | allow | non-professional kinds | deny        |
//! | family, read-only                 | allow | deny                   | deny        |
//! | doctor with live grant            | allow | allow                  | own records |
//! | clinic owner, own clinic's record | allow | deny                   | deny        |
//! | none of the above                 | deny  | deny                   | deny        |

use std::fmt;

use chrono::{DateTime, Utc};
use petvault_core::error::{VetError, VetResult};
use petvault_core::models::actor::{Actor, Role};
use petvault_core::models::medical::{Action, ResourceKind, ResourceProvenance};
use petvault_core::models::membership::{AccessLevel, MembershipLookup};
use petvault_core::repository::MembershipRepository;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::membership::MembershipResolver;

/// Source of truth for "does this doctor hold a live grant?".
pub trait GrantCheck: Send + Sync {
    fn has_active_grant(
        &self,
        pet_id: Uuid,
        clinic_id: Uuid,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = VetResult<bool>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Updates are limited to the record's author.
    NotAuthor,
    /// Prescriptions, lab tests and vaccinations need a professional author.
    ProfessionalAuthorshipRequired,
    ReadOnlyMembership,
    FamilyCannotUpdate,
    /// Clinic owners may read their clinic's records but not write.
    ObserverOnly,
    NoRelation,
    /// The supplied record belongs to another pet or kind.
    ResourceMismatch,
    /// A relationship lookup failed; the request is refused.
    LookupFailed,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::NotAuthor => "only the author may update this record",
            DenyReason::ProfessionalAuthorshipRequired => {
                "this record type must be authored by a veterinary professional"
            }
            DenyReason::ReadOnlyMembership => "read-only family access",
            DenyReason::FamilyCannotUpdate => "family members cannot update records",
            DenyReason::ObserverOnly => "clinic owners may only read their clinic's records",
            DenyReason::NoRelation => "no relationship to this pet",
            DenyReason::ResourceMismatch => "record does not belong to this pet",
            DenyReason::LookupFailed => "relationship lookup failed",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert into the error the request boundary should return.
    pub fn into_result(self) -> VetResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::NoRelation) => Err(VetError::NoRelation),
            Decision::Deny(DenyReason::LookupFailed) => Err(VetError::Unavailable(
                DenyReason::LookupFailed.as_str().into(),
            )),
            Decision::Deny(reason) => Err(VetError::Forbidden {
                reason: reason.as_str().into(),
            }),
        }
    }
}

/// What is known about the actor's standing with one pet.
#[derive(Debug, Clone, Copy, Default)]
struct Facts {
    membership: MembershipLookup,
    has_active_grant: bool,
}

fn authored(actor: &Actor, resource: Option<&ResourceProvenance>) -> Decision {
    match resource {
        Some(r) if r.is_authored_by(actor.user_id) => Decision::Allow,
        _ => Decision::Deny(DenyReason::NotAuthor),
    }
}

fn evaluate(
    actor: &Actor,
    action: Action,
    kind: ResourceKind,
    resource: Option<&ResourceProvenance>,
    facts: Facts,
) -> Decision {
    if facts.membership.is_owner {
        return match action {
            Action::Read | Action::Create => Decision::Allow,
            Action::Update => authored(actor, resource),
        };
    }

    match facts.membership.family_access_level {
        Some(AccessLevel::Full) => {
            return match action {
                Action::Read => Decision::Allow,
                Action::Create if kind.requires_professional_authorship() => {
                    Decision::Deny(DenyReason::ProfessionalAuthorshipRequired)
                }
                Action::Create => Decision::Allow,
                Action::Update => Decision::Deny(DenyReason::FamilyCannotUpdate),
            };
        }
        Some(AccessLevel::ReadOnly) => {
            return match action {
                Action::Read => Decision::Allow,
                Action::Create | Action::Update => {
                    Decision::Deny(DenyReason::ReadOnlyMembership)
                }
            };
        }
        None => {}
    }

    if facts.has_active_grant {
        return match action {
            Action::Read | Action::Create => Decision::Allow,
            Action::Update => authored(actor, resource),
        };
    }

    if let (Some(clinic_id), Some(r)) = (actor.clinic_for(Role::ClinicOwner), resource) {
        if r.clinic_id == Some(clinic_id) {
            return match action {
                Action::Read => Decision::Allow,
                Action::Create | Action::Update => Decision::Deny(DenyReason::ObserverOnly),
            };
        }
    }

    Decision::Deny(DenyReason::NoRelation)
}

/// Decides every read and write on a pet's medical resources.
pub struct PermissionEngine<M: MembershipRepository, A: GrantCheck> {
    memberships: MembershipResolver<M>,
    grants: A,
}

impl<M: MembershipRepository, A: GrantCheck> PermissionEngine<M, A> {
    pub fn new(memberships: MembershipResolver<M>, grants: A) -> Self {
        Self {
            memberships,
            grants,
        }
    }

    /// Decide whether `actor` may perform `action` on a resource of
    /// `kind` belonging to `pet_id`. `resource` is the existing record
    /// for reads and updates, `None` for creates.
    ///
    /// Never fails: lookup errors are logged and deny.
    pub async fn decide(
        &self,
        actor: &Actor,
        action: Action,
        kind: ResourceKind,
        pet_id: Uuid,
        resource: Option<&ResourceProvenance>,
        now: DateTime<Utc>,
    ) -> Decision {
        let decision = match self.gather(actor, kind, pet_id, resource, now).await {
            Ok(facts) => evaluate(actor, action, kind, resource, facts),
            Err(reason) => Decision::Deny(reason),
        };

        debug!(
            user_id = %actor.user_id,
            pet_id = %pet_id,
            action = ?action,
            kind = ?kind,
            decision = ?decision,
            "Permission decided"
        );
        decision
    }

    async fn gather(
        &self,
        actor: &Actor,
        kind: ResourceKind,
        pet_id: Uuid,
        resource: Option<&ResourceProvenance>,
        now: DateTime<Utc>,
    ) -> Result<Facts, DenyReason> {
        if let Some(r) = resource {
            if r.pet_id != pet_id || r.kind != kind {
                return Err(DenyReason::ResourceMismatch);
            }
        }

        let membership = self
            .memberships
            .lookup(pet_id, actor.user_id)
            .await
            .map_err(|e| {
                warn!(pet_id = %pet_id, user_id = %actor.user_id, error = %e, "Membership lookup failed");
                DenyReason::LookupFailed
            })?;

        // Grant state only matters once owner and family rules are ruled out.
        let related = membership.is_owner || membership.family_access_level.is_some();
        let has_active_grant = match actor.clinic_for(Role::Doctor) {
            Some(clinic_id) if !related => self
                .grants
                .has_active_grant(pet_id, clinic_id, actor.user_id, now)
                .await
                .map_err(|e| {
                    warn!(pet_id = %pet_id, clinic_id = %clinic_id, error = %e, "Grant lookup failed");
                    DenyReason::LookupFailed
                })?,
            _ => false,
        };

        Ok(Facts {
            membership,
            has_active_grant,
        })
    }
}
