//! Family membership model (read-only view of external data).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    Full,
    ReadOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyMembership {
    pub pet_id: Uuid,
    pub user_id: Uuid,
    pub access_level: AccessLevel,
}

/// Answer to "how is this user related to this pet?".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipLookup {
    pub is_owner: bool,
    /// `None` when the user is not a family member of the pet.
    pub family_access_level: Option<AccessLevel>,
}
