//! One-time code domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of digits in a one-time code.
pub const OTP_CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OtpStatus {
    Pending,
    Used,
    Expired,
    Locked,
}

impl OtpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpStatus::Pending => "Pending",
            OtpStatus::Used => "Used",
            OtpStatus::Expired => "Expired",
            OtpStatus::Locked => "Locked",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Otp {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub clinic_id: Uuid,
    /// Owner of the pet when the code was requested.
    pub owner_id: Uuid,
    /// SHA-256 hex digest of the code. The raw code is never stored.
    pub code_hash: String,
    pub purpose: String,
    pub status: OtpStatus,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOtp {
    pub pet_id: Uuid,
    pub clinic_id: Uuid,
    pub owner_id: Uuid,
    pub code_hash: String,
    pub purpose: String,
    pub max_attempts: u32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Compare-and-swap on an OTP row.
///
/// Applied only while the row is still `Pending` with
/// `expected_attempts` recorded attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpTransition {
    pub expected_attempts: u32,
    pub status: OtpStatus,
    pub attempt_count: u32,
}

/// Outcome of submitting a code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationResult {
    Success,
    WrongCode { remaining_attempts: u32 },
    Expired,
    Locked,
    /// The code was already redeemed.
    AlreadyUsed,
}

impl ValidationResult {
    pub fn is_success(self) -> bool {
        matches!(self, ValidationResult::Success)
    }

    pub fn failure(self) -> Option<OtpFailure> {
        match self {
            ValidationResult::Success => None,
            ValidationResult::WrongCode { remaining_attempts } => {
                Some(OtpFailure::WrongCode { remaining_attempts })
            }
            ValidationResult::Expired => Some(OtpFailure::Expired),
            ValidationResult::Locked => Some(OtpFailure::Locked),
            ValidationResult::AlreadyUsed => Some(OtpFailure::AlreadyUsed),
        }
    }
}

/// Why a code was not accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OtpFailure {
    WrongCode { remaining_attempts: u32 },
    Expired,
    Locked,
    AlreadyUsed,
}

impl fmt::Display for OtpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpFailure::WrongCode { remaining_attempts } => write!(
                f,
                "wrong code, {remaining_attempts} attempts remaining"
            ),
            OtpFailure::Expired => f.write_str("code expired, request a new code"),
            OtpFailure::Locked => f.write_str("too many attempts, request a new code"),
            OtpFailure::AlreadyUsed => f.write_str("code already used, request a new code"),
        }
    }
}
