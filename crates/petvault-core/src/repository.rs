//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every status change on a grant
//! or one-time code is a conditional update guarded by the expected
//! prior state, so implementations must apply them as single atomic
//! writes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::VetResult;
use crate::models::{
    directory::{ClinicSummary, PetSummary},
    grant::{AccessGrant, CreateAccessGrant},
    membership::FamilyMembership,
    otp::{CreateOtp, Otp, OtpTransition},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Owned state: grants and one-time codes
// ---------------------------------------------------------------------------

pub trait AccessGrantRepository: Send + Sync {
    /// Insert a new `Active` grant, revoking any grant currently active
    /// for the same pet and clinic in the same atomic write.
    ///
    /// Fails with `Conflict` when a concurrent activation for the pair
    /// won the race.
    fn activate(
        &self,
        input: CreateAccessGrant,
    ) -> impl Future<Output = VetResult<AccessGrant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VetResult<AccessGrant>> + Send;
    /// The grant whose status is `Active` for the pair, if any. Expiry is
    /// not evaluated here.
    fn find_active(
        &self,
        pet_id: Uuid,
        clinic_id: Uuid,
    ) -> impl Future<Output = VetResult<Option<AccessGrant>>> + Send;
    /// `Active -> Revoked`, applied only while the grant is active and
    /// unexpired at `now`. Returns `None` when the guard did not match.
    fn revoke(
        &self,
        id: Uuid,
        revoked_by: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = VetResult<Option<AccessGrant>>> + Send;
    /// Reassign the doctor on a grant that is active and unexpired at
    /// `now`. Returns `None` when the guard did not match.
    fn assign_doctor(
        &self,
        id: Uuid,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = VetResult<Option<AccessGrant>>> + Send;
    /// `Active -> Expired` for every grant with `expires_at <= now`.
    /// Returns the number of grants this call transitioned.
    fn expire_due(&self, now: DateTime<Utc>) -> impl Future<Output = VetResult<u64>> + Send;
    /// Grant history for a pet, newest first.
    fn list_by_pet(
        &self,
        pet_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = VetResult<PaginatedResult<AccessGrant>>> + Send;
}

pub trait OtpRepository: Send + Sync {
    fn create(&self, input: CreateOtp) -> impl Future<Output = VetResult<Otp>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VetResult<Otp>> + Send;
    /// Apply `change` if the code is still `Pending` with the expected
    /// attempt count. Returns `None` when the guard did not match.
    fn transition(
        &self,
        id: Uuid,
        change: OtpTransition,
    ) -> impl Future<Output = VetResult<Option<Otp>>> + Send;
}

// ---------------------------------------------------------------------------
// External read-only views
// ---------------------------------------------------------------------------

pub trait MembershipRepository: Send + Sync {
    /// Owner of the pet, or `None` for an unknown pet.
    fn owner_of(&self, pet_id: Uuid) -> impl Future<Output = VetResult<Option<Uuid>>> + Send;
    fn get_membership(
        &self,
        pet_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = VetResult<Option<FamilyMembership>>> + Send;
}

pub trait DirectoryRepository: Send + Sync {
    fn get_pet(&self, pet_id: Uuid) -> impl Future<Output = VetResult<PetSummary>> + Send;
    fn get_clinic(&self, clinic_id: Uuid) -> impl Future<Output = VetResult<ClinicSummary>> + Send;
    /// Whether the doctor practises at the clinic.
    fn is_affiliated(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
    ) -> impl Future<Output = VetResult<bool>> + Send;
}
