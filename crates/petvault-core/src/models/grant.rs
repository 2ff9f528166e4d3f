//! Access grant domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GrantStatus {
    Active,
    Expired,
    Revoked,
}

impl GrantStatus {
    /// `Expired` and `Revoked` can never transition again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, GrantStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrantStatus::Active => "Active",
            GrantStatus::Expired => "Expired",
            GrantStatus::Revoked => "Revoked",
        }
    }
}

/// A clinic's time-bounded authorization on one pet's records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub clinic_id: Uuid,
    /// Unset until a doctor is assigned; any doctor acting for the
    /// clinic is admitted meanwhile.
    pub doctor_id: Option<Uuid>,
    pub owner_id: Uuid,
    /// The one-time code this grant was issued from.
    pub otp_id: Uuid,
    pub purpose: String,
    pub status: GrantStatus,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_by: Option<Uuid>,
    /// Grant that replaced this one for the same pet and clinic.
    pub superseded_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Whether the grant authorizes anything at `now`.
    ///
    /// Evaluates `expires_at` directly so that a grant the sweep has
    /// not reached yet is still treated as expired.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && now < self.expires_at
    }

    pub fn admits_doctor(&self, doctor_id: Uuid) -> bool {
        self.doctor_id.is_none_or(|assigned| assigned == doctor_id)
    }
}

/// Storage key shared by every grant that is active for a pair.
pub fn active_key(pet_id: Uuid, clinic_id: Uuid) -> String {
    format!("{pet_id}:{clinic_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccessGrant {
    pub pet_id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub otp_id: Uuid,
    pub purpose: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn grant(status: GrantStatus, expires_in: Duration) -> AccessGrant {
        let now = Utc::now();
        AccessGrant {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            doctor_id: None,
            owner_id: Uuid::new_v4(),
            otp_id: Uuid::new_v4(),
            purpose: "checkup".into(),
            status,
            granted_at: now,
            expires_at: now + expires_in,
            revoked_by: None,
            superseded_by: None,
            updated_at: now,
        }
    }

    #[test]
    fn live_requires_active_and_future_expiry() {
        let now = Utc::now();
        assert!(grant(GrantStatus::Active, Duration::hours(1)).is_live_at(now));
        assert!(!grant(GrantStatus::Active, Duration::hours(-1)).is_live_at(now));
        assert!(!grant(GrantStatus::Revoked, Duration::hours(1)).is_live_at(now));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let g = grant(GrantStatus::Active, Duration::hours(1));
        assert!(!g.is_live_at(g.expires_at));
    }

    #[test]
    fn unassigned_grant_admits_any_doctor() {
        let mut g = grant(GrantStatus::Active, Duration::hours(1));
        assert!(g.admits_doctor(Uuid::new_v4()));

        let doctor = Uuid::new_v4();
        g.doctor_id = Some(doctor);
        assert!(g.admits_doctor(doctor));
        assert!(!g.admits_doctor(Uuid::new_v4()));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!GrantStatus::Active.is_terminal());
        assert!(GrantStatus::Expired.is_terminal());
        assert!(GrantStatus::Revoked.is_terminal());
    }
}
