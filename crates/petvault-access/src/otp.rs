//! One-time code issuance and validation.
//!
//! Codes are six random digits, stored only as SHA-256 digests and
//! compared in constant time. Each validation step is applied as a
//! compare-and-swap on `(status = Pending, attempt_count)`, so two
//! receptionists submitting at once can never both redeem a code or
//! lose an attempt.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use petvault_core::error::{VetError, VetResult};
use petvault_core::models::otp::{
    CreateOtp, OTP_CODE_LENGTH, Otp, OtpStatus, OtpTransition, ValidationResult,
};
use petvault_core::repository::{DirectoryRepository, OtpRepository};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::delivery::{OtpDelivery, OtpMessage};
use crate::error::AccessError;

const MAX_PURPOSE_LEN: usize = 255;

/// A freshly issued code. `code` is the only copy of the raw digits.
#[derive(Clone)]
pub struct IssuedOtp {
    pub otp: Otp,
    pub code: String,
}

impl fmt::Debug for IssuedOtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedOtp")
            .field("otp", &self.otp)
            .field("code", &"******")
            .finish()
    }
}

fn otp_expiry(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>, AccessError> {
    i64::try_from(ttl_secs)
        .ok()
        .filter(|secs| *secs > 0)
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(AccessError::OtpTtlOutOfRange { secs: ttl_secs })
}

/// Generate a zero-padded six-digit code from the thread-local CSPRNG.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:0width$}", width = OTP_CODE_LENGTH)
}

/// SHA-256 hash of a code, hex-encoded.
///
/// This is the value stored as `otp.code_hash`.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

fn code_matches(submitted: &str, code_hash: &str) -> bool {
    hash_code(submitted)
        .as_bytes()
        .ct_eq(code_hash.as_bytes())
        .into()
}

/// Decide the outcome of a submission against the current row, and the
/// write (if any) that records it.
fn evaluate(
    otp: &Otp,
    submitted_code: &str,
    now: DateTime<Utc>,
) -> (ValidationResult, Option<OtpTransition>) {
    match otp.status {
        OtpStatus::Used => return (ValidationResult::AlreadyUsed, None),
        OtpStatus::Expired => return (ValidationResult::Expired, None),
        OtpStatus::Locked => return (ValidationResult::Locked, None),
        OtpStatus::Pending => {}
    }

    let keep = |status| OtpTransition {
        expected_attempts: otp.attempt_count,
        status,
        attempt_count: otp.attempt_count,
    };

    if now > otp.expires_at {
        return (ValidationResult::Expired, Some(keep(OtpStatus::Expired)));
    }

    if !code_matches(submitted_code, &otp.code_hash) {
        let attempts = (otp.attempt_count + 1).min(otp.max_attempts);
        if attempts >= otp.max_attempts {
            return (
                ValidationResult::Locked,
                Some(OtpTransition {
                    expected_attempts: otp.attempt_count,
                    status: OtpStatus::Locked,
                    attempt_count: attempts,
                }),
            );
        }
        return (
            ValidationResult::WrongCode {
                remaining_attempts: otp.max_attempts - attempts,
            },
            Some(OtpTransition {
                expected_attempts: otp.attempt_count,
                status: OtpStatus::Pending,
                attempt_count: attempts,
            }),
        );
    }

    (ValidationResult::Success, Some(keep(OtpStatus::Used)))
}

fn validate_purpose(purpose: &str) -> Result<String, AccessError> {
    let trimmed = purpose.trim();
    if trimmed.is_empty() {
        return Err(AccessError::InvalidPurpose("must not be empty"));
    }
    if trimmed.chars().count() > MAX_PURPOSE_LEN {
        return Err(AccessError::InvalidPurpose("longer than 255 characters"));
    }
    Ok(trimmed.to_string())
}

/// Turn a directory `NotFound` into the caller-facing unknown-target error.
pub(crate) fn unknown_target(err: VetError, entity: &'static str, id: Uuid) -> VetError {
    match err {
        VetError::NotFound { .. } => AccessError::UnknownTarget { entity, id }.into(),
        other => other,
    }
}

/// Issues and validates one-time codes for (pet, clinic) pairs.
///
/// Generic over repository implementations so that the access layer
/// has no dependency on the database crate.
pub struct OtpIssuer<O: OtpRepository, D: DirectoryRepository, L: OtpDelivery> {
    otps: O,
    directory: D,
    delivery: L,
    config: AccessConfig,
}

impl<O: OtpRepository, D: DirectoryRepository, L: OtpDelivery> OtpIssuer<O, D, L> {
    pub fn new(otps: O, directory: D, delivery: L, config: AccessConfig) -> Self {
        Self {
            otps,
            directory,
            delivery,
            config,
        }
    }

    pub(crate) fn directory(&self) -> &D {
        &self.directory
    }

    /// Issue a code for `clinic_id` to access `pet_id` and hand it to
    /// the owner's channel.
    pub async fn request(
        &self,
        pet_id: Uuid,
        clinic_id: Uuid,
        purpose: &str,
        now: DateTime<Utc>,
    ) -> VetResult<IssuedOtp> {
        let purpose = validate_purpose(purpose)?;

        let pet = self
            .directory
            .get_pet(pet_id)
            .await
            .map_err(|e| unknown_target(e, "pet", pet_id))?;
        let clinic = self
            .directory
            .get_clinic(clinic_id)
            .await
            .map_err(|e| unknown_target(e, "clinic", clinic_id))?;

        let expires_at = otp_expiry(now, self.config.otp_ttl_secs)?;
        let code = generate_code();

        let otp = self
            .otps
            .create(CreateOtp {
                pet_id,
                clinic_id,
                owner_id: pet.owner_id,
                code_hash: hash_code(&code),
                purpose,
                max_attempts: self.config.otp_max_attempts,
                issued_at: now,
                expires_at,
            })
            .await?;

        info!(
            otp_id = %otp.id,
            pet_id = %pet_id,
            clinic_id = %clinic_id,
            expires_at = %expires_at,
            "One-time code issued"
        );

        let message = OtpMessage {
            channel: pet.owner_contact,
            code: code.clone(),
            pet_name: pet.name,
            clinic_name: clinic.name,
            expires_at,
        };
        if let Err(e) = self.delivery.send_otp(message).await {
            warn!(otp_id = %otp.id, error = %e, "One-time code delivery failed");
        }

        Ok(IssuedOtp { otp, code })
    }

    /// Submit a code. Failures are reported in the result, not as
    /// errors; `Err` only signals storage trouble.
    pub async fn validate(
        &self,
        otp_id: Uuid,
        submitted_code: &str,
        now: DateTime<Utc>,
    ) -> VetResult<ValidationResult> {
        for _ in 0..=self.config.otp_cas_retries {
            let otp = self.otps.get_by_id(otp_id).await?;
            let (outcome, change) = evaluate(&otp, submitted_code, now);

            let Some(change) = change else {
                return Ok(outcome);
            };

            match self.otps.transition(otp_id, change).await? {
                Some(updated) => {
                    match outcome {
                        ValidationResult::Success => {
                            info!(otp_id = %otp_id, "One-time code redeemed");
                        }
                        ValidationResult::Locked => {
                            warn!(
                                otp_id = %otp_id,
                                attempts = updated.attempt_count,
                                "One-time code locked after repeated wrong submissions"
                            );
                        }
                        _ => {
                            info!(
                                otp_id = %otp_id,
                                status = updated.status.as_str(),
                                attempts = updated.attempt_count,
                                "One-time code rejected"
                            );
                        }
                    }
                    return Ok(outcome);
                }
                None => {
                    warn!(otp_id = %otp_id, "One-time code changed concurrently, re-evaluating");
                }
            }
        }

        Err(AccessError::Contended { id: otp_id }.into())
    }

    pub async fn get(&self, otp_id: Uuid) -> VetResult<Otp> {
        self.otps.get_by_id(otp_id).await
    }
}
