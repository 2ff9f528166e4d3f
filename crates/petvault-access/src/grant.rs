//! Clinic grant lifecycle: issue from a redeemed code, revoke, expire.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use petvault_core::error::{VetError, VetResult};
use petvault_core::models::grant::{AccessGrant, CreateAccessGrant, GrantStatus};
use petvault_core::repository::{
    AccessGrantRepository, DirectoryRepository, OtpRepository, PaginatedResult, Pagination,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::delivery::OtpDelivery;
use crate::error::AccessError;
use crate::otp::{OtpIssuer, unknown_target};
use crate::permission::GrantCheck;

/// Input for [`GrantLifecycleManager::grant`].
#[derive(Clone)]
pub struct GrantRequest {
    pub otp_id: Uuid,
    pub code: String,
    pub doctor_id: Option<Uuid>,
    /// Falls back to the configured default when unset.
    pub duration_hours: Option<u32>,
}

impl GrantRequest {
    pub fn new(otp_id: Uuid, code: impl Into<String>) -> Self {
        Self {
            otp_id,
            code: code.into(),
            doctor_id: None,
            duration_hours: None,
        }
    }

    pub fn with_doctor(mut self, doctor_id: Uuid) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }

    pub fn for_hours(mut self, hours: u32) -> Self {
        self.duration_hours = Some(hours);
        self
    }
}

impl fmt::Debug for GrantRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantRequest")
            .field("otp_id", &self.otp_id)
            .field("code", &"******")
            .field("doctor_id", &self.doctor_id)
            .field("duration_hours", &self.duration_hours)
            .finish()
    }
}

/// Status to report for a grant that no longer authorizes anything.
fn terminal_status(grant: &AccessGrant) -> GrantStatus {
    match grant.status {
        GrantStatus::Active => GrantStatus::Expired,
        other => other,
    }
}

/// Owns every state change of an [`AccessGrant`].
///
/// Generic over repository implementations so that the access layer
/// has no dependency on the database crate.
pub struct GrantLifecycleManager<G, O, D, L>
where
    G: AccessGrantRepository,
    O: OtpRepository,
    D: DirectoryRepository,
    L: OtpDelivery,
{
    grants: G,
    issuer: OtpIssuer<O, D, L>,
    config: AccessConfig,
}

impl<G, O, D, L> GrantLifecycleManager<G, O, D, L>
where
    G: AccessGrantRepository,
    O: OtpRepository,
    D: DirectoryRepository,
    L: OtpDelivery,
{
    pub fn new(grants: G, issuer: OtpIssuer<O, D, L>, config: AccessConfig) -> Self {
        Self {
            grants,
            issuer,
            config,
        }
    }

    pub fn issuer(&self) -> &OtpIssuer<O, D, L> {
        &self.issuer
    }

    fn duration_for(&self, requested: Option<u32>) -> Result<Duration, AccessError> {
        let max = self.config.max_grant_duration_hours;
        let hours = requested.unwrap_or(self.config.default_grant_duration_hours);
        if hours == 0 || hours > max {
            return Err(AccessError::InvalidDuration {
                requested: hours,
                max,
            });
        }
        Ok(Duration::hours(i64::from(hours)))
    }

    async fn ensure_affiliated(&self, doctor_id: Uuid, clinic_id: Uuid) -> VetResult<()> {
        let affiliated = self
            .issuer
            .directory()
            .is_affiliated(doctor_id, clinic_id)
            .await?;
        if !affiliated {
            return Err(AccessError::DoctorNotAffiliated {
                doctor_id,
                clinic_id,
            }
            .into());
        }
        Ok(())
    }

    /// Redeem a one-time code and activate a grant for its pet and
    /// clinic, superseding whatever grant the pair held before.
    pub async fn grant(&self, request: GrantRequest, now: DateTime<Utc>) -> VetResult<AccessGrant> {
        let duration = self.duration_for(request.duration_hours)?;
        let otp = self.issuer.get(request.otp_id).await?;

        if let Some(doctor_id) = request.doctor_id {
            self.ensure_affiliated(doctor_id, otp.clinic_id).await?;
        }

        let outcome = self.issuer.validate(otp.id, &request.code, now).await?;
        if let Some(reason) = outcome.failure() {
            return Err(AccessError::OtpRejected(reason).into());
        }

        // The code is spent from here on; only the activation is retried.
        let input = CreateAccessGrant {
            pet_id: otp.pet_id,
            clinic_id: otp.clinic_id,
            doctor_id: request.doctor_id,
            owner_id: otp.owner_id,
            otp_id: otp.id,
            purpose: otp.purpose,
            granted_at: now,
            expires_at: now + duration,
        };

        let mut attempt = 0;
        loop {
            match self.grants.activate(input.clone()).await {
                Ok(grant) => {
                    info!(
                        grant_id = %grant.id,
                        pet_id = %grant.pet_id,
                        clinic_id = %grant.clinic_id,
                        expires_at = %grant.expires_at,
                        "Access grant activated"
                    );
                    return Ok(grant);
                }
                Err(VetError::Conflict { .. }) if attempt < self.config.activation_retries => {
                    attempt += 1;
                    warn!(
                        pet_id = %input.pet_id,
                        clinic_id = %input.clinic_id,
                        attempt,
                        "Grant activation conflicted, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Owner-initiated revocation of a live grant.
    pub async fn revoke(
        &self,
        grant_id: Uuid,
        requesting_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<AccessGrant> {
        let grant = self.grants.get_by_id(grant_id).await?;

        if grant.owner_id != requesting_user_id {
            warn!(
                grant_id = %grant_id,
                user_id = %requesting_user_id,
                "Revocation refused for non-owner"
            );
            return Err(AccessError::NotOwner {
                action: "revoke this grant",
            }
            .into());
        }

        if !grant.is_live_at(now) {
            return Err(AccessError::AlreadyTerminal {
                id: grant_id,
                status: terminal_status(&grant),
            }
            .into());
        }

        match self.grants.revoke(grant_id, requesting_user_id, now).await? {
            Some(revoked) => {
                info!(
                    grant_id = %grant_id,
                    pet_id = %revoked.pet_id,
                    clinic_id = %revoked.clinic_id,
                    "Access grant revoked"
                );
                Ok(revoked)
            }
            None => {
                // Lost to a concurrent revoke, sweep or supersede.
                let current = self.grants.get_by_id(grant_id).await?;
                Err(AccessError::AlreadyTerminal {
                    id: grant_id,
                    status: terminal_status(&current),
                }
                .into())
            }
        }
    }

    /// Reassign the doctor on a live grant held by `acting_clinic_id`.
    pub async fn assign_doctor(
        &self,
        grant_id: Uuid,
        doctor_id: Uuid,
        acting_clinic_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<AccessGrant> {
        let grant = self.grants.get_by_id(grant_id).await?;

        if grant.clinic_id != acting_clinic_id {
            return Err(AccessError::WrongClinic.into());
        }
        if !grant.is_live_at(now) {
            return Err(AccessError::AlreadyTerminal {
                id: grant_id,
                status: terminal_status(&grant),
            }
            .into());
        }
        self.ensure_affiliated(doctor_id, grant.clinic_id).await?;

        match self.grants.assign_doctor(grant_id, doctor_id, now).await? {
            Some(updated) => {
                info!(grant_id = %grant_id, doctor_id = %doctor_id, "Grant doctor reassigned");
                Ok(updated)
            }
            None => {
                let current = self.grants.get_by_id(grant_id).await?;
                Err(AccessError::AlreadyTerminal {
                    id: grant_id,
                    status: terminal_status(&current),
                }
                .into())
            }
        }
    }

    /// Mark every grant past its expiry as `Expired`. Safe to run
    /// concurrently with itself and with revocations.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> VetResult<u64> {
        let expired = self.grants.expire_due(now).await?;
        if expired > 0 {
            info!(expired, "Expired access grants swept");
        } else {
            debug!("No access grants due for expiry");
        }
        Ok(expired)
    }

    /// Whether `doctor_id`, acting for `clinic_id`, currently holds a
    /// live grant on the pet. Expiry is evaluated against `now`, not
    /// against the stored status alone.
    pub async fn is_active(
        &self,
        pet_id: Uuid,
        clinic_id: Uuid,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<bool> {
        let grant = self.grants.find_active(pet_id, clinic_id).await?;
        Ok(grant.is_some_and(|g| g.is_live_at(now) && g.admits_doctor(doctor_id)))
    }

    pub async fn get(&self, grant_id: Uuid) -> VetResult<AccessGrant> {
        self.grants.get_by_id(grant_id).await
    }

    /// Grant history for a pet, newest first. Owner only.
    pub async fn list_for_pet(
        &self,
        pet_id: Uuid,
        requesting_user_id: Uuid,
        pagination: Pagination,
    ) -> VetResult<PaginatedResult<AccessGrant>> {
        let pet = self
            .issuer
            .directory()
            .get_pet(pet_id)
            .await
            .map_err(|e| unknown_target(e, "pet", pet_id))?;
        if pet.owner_id != requesting_user_id {
            return Err(AccessError::NotOwner {
                action: "list grants",
            }
            .into());
        }
        self.grants.list_by_pet(pet_id, pagination).await
    }
}

impl<G, O, D, L> GrantCheck for GrantLifecycleManager<G, O, D, L>
where
    G: AccessGrantRepository,
    O: OtpRepository,
    D: DirectoryRepository,
    L: OtpDelivery,
{
    async fn has_active_grant(
        &self,
        pet_id: Uuid,
        clinic_id: Uuid,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<bool> {
        self.is_active(pet_id, clinic_id, doctor_id, now).await
    }
}

impl<T: GrantCheck> GrantCheck for Arc<T> {
    async fn has_active_grant(
        &self,
        pet_id: Uuid,
        clinic_id: Uuid,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> VetResult<bool> {
        (**self).has_active_grant(pet_id, clinic_id, doctor_id, now).await
    }
}

#[cfg(test)]
mod tests {
    use petvault_core::models::directory::{ClinicSummary, PetSummary};
    use petvault_core::models::otp::{CreateOtp, Otp, OtpTransition};
    use proptest::prelude::*;

    use super::*;
    use crate::delivery::TracingDelivery;

    /// Hands back its one stored grant for every pair, whatever its
    /// status, and never moves it on by itself.
    struct FrozenGrants {
        stored: AccessGrant,
    }

    impl AccessGrantRepository for FrozenGrants {
        async fn activate(&self, _input: CreateAccessGrant) -> VetResult<AccessGrant> {
            Err(VetError::Internal("read-only store".into()))
        }

        async fn get_by_id(&self, _id: Uuid) -> VetResult<AccessGrant> {
            Ok(self.stored.clone())
        }

        async fn find_active(
            &self,
            _pet_id: Uuid,
            _clinic_id: Uuid,
        ) -> VetResult<Option<AccessGrant>> {
            Ok(Some(self.stored.clone()))
        }

        async fn revoke(
            &self,
            _id: Uuid,
            _revoked_by: Uuid,
            _now: DateTime<Utc>,
        ) -> VetResult<Option<AccessGrant>> {
            Ok(None)
        }

        async fn assign_doctor(
            &self,
            _id: Uuid,
            _doctor_id: Uuid,
            _now: DateTime<Utc>,
        ) -> VetResult<Option<AccessGrant>> {
            Ok(None)
        }

        async fn expire_due(&self, _now: DateTime<Utc>) -> VetResult<u64> {
            Ok(0)
        }

        async fn list_by_pet(
            &self,
            _pet_id: Uuid,
            pagination: Pagination,
        ) -> VetResult<PaginatedResult<AccessGrant>> {
            Ok(PaginatedResult {
                items: vec![self.stored.clone()],
                total: 1,
                offset: pagination.offset,
                limit: pagination.limit,
            })
        }
    }

    struct NoOtps;

    impl OtpRepository for NoOtps {
        async fn create(&self, _input: CreateOtp) -> VetResult<Otp> {
            Err(VetError::Internal("unused".into()))
        }

        async fn get_by_id(&self, _id: Uuid) -> VetResult<Otp> {
            Err(VetError::Internal("unused".into()))
        }

        async fn transition(&self, _id: Uuid, _change: OtpTransition) -> VetResult<Option<Otp>> {
            Err(VetError::Internal("unused".into()))
        }
    }

    struct NoDirectory;

    impl DirectoryRepository for NoDirectory {
        async fn get_pet(&self, _pet_id: Uuid) -> VetResult<PetSummary> {
            Err(VetError::Internal("unused".into()))
        }

        async fn get_clinic(&self, _clinic_id: Uuid) -> VetResult<ClinicSummary> {
            Err(VetError::Internal("unused".into()))
        }

        async fn is_affiliated(&self, _doctor_id: Uuid, _clinic_id: Uuid) -> VetResult<bool> {
            Err(VetError::Internal("unused".into()))
        }
    }

    fn frozen_manager(
        stored: AccessGrant,
    ) -> GrantLifecycleManager<FrozenGrants, NoOtps, NoDirectory, TracingDelivery> {
        let config = AccessConfig::default();
        let issuer = OtpIssuer::new(NoOtps, NoDirectory, TracingDelivery, config.clone());
        GrantLifecycleManager::new(FrozenGrants { stored }, issuer, config)
    }

    fn status() -> impl Strategy<Value = GrantStatus> {
        prop_oneof![
            Just(GrantStatus::Active),
            Just(GrantStatus::Expired),
            Just(GrantStatus::Revoked),
        ]
    }

    /// 0: unassigned, 1: the asking doctor, 2: a colleague.
    fn assignment() -> impl Strategy<Value = u8> {
        0u8..3
    }

    proptest! {
        #[test]
        fn no_grant_is_active_at_or_after_its_expiry(
            status in status(),
            lifetime_secs in 1i64..7 * 24 * 3600,
            check_offset_secs in -3600i64..14 * 24 * 3600,
            assigned in assignment(),
        ) {
            let granted_at = Utc::now();
            let expires_at = granted_at + Duration::seconds(lifetime_secs);
            let now = granted_at + Duration::seconds(check_offset_secs);
            let doctor = Uuid::new_v4();
            let doctor_id = match assigned {
                0 => None,
                1 => Some(doctor),
                _ => Some(Uuid::new_v4()),
            };
            let stored = AccessGrant {
                id: Uuid::new_v4(),
                pet_id: Uuid::new_v4(),
                clinic_id: Uuid::new_v4(),
                doctor_id,
                owner_id: Uuid::new_v4(),
                otp_id: Uuid::new_v4(),
                purpose: "checkup".into(),
                status,
                granted_at,
                expires_at,
                revoked_by: None,
                superseded_by: None,
                updated_at: granted_at,
            };
            let (pet, clinic) = (stored.pet_id, stored.clinic_id);
            let m = frozen_manager(stored);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let active = runtime
                .block_on(m.is_active(pet, clinic, doctor, now))
                .unwrap();

            if now >= expires_at || status != GrantStatus::Active {
                prop_assert!(!active);
            } else {
                prop_assert_eq!(active, assigned != 2);
            }
        }
    }

    #[test]
    fn request_debug_hides_code() {
        let request = GrantRequest::new(Uuid::nil(), "042137").for_hours(12);
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("042137"));
        assert!(rendered.contains("12"));
    }

    #[test]
    fn active_but_past_expiry_reports_expired() {
        let now = Utc::now();
        let grant = AccessGrant {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            doctor_id: None,
            owner_id: Uuid::new_v4(),
            otp_id: Uuid::new_v4(),
            purpose: "checkup".into(),
            status: GrantStatus::Active,
            granted_at: now - Duration::hours(25),
            expires_at: now - Duration::hours(1),
            revoked_by: None,
            superseded_by: None,
            updated_at: now - Duration::hours(25),
        };
        assert_eq!(terminal_status(&grant), GrantStatus::Expired);

        let revoked = AccessGrant {
            status: GrantStatus::Revoked,
            ..grant
        };
        assert_eq!(terminal_status(&revoked), GrantStatus::Revoked);
    }
}
