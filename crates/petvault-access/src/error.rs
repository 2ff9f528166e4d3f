//! Access-control error types.

use petvault_core::error::VetError;
use petvault_core::models::grant::GrantStatus;
use petvault_core::models::otp::OtpFailure;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("unknown {entity} {id}")]
    UnknownTarget { entity: &'static str, id: Uuid },

    #[error("doctor {doctor_id} does not practise at clinic {clinic_id}")]
    DoctorNotAffiliated { doctor_id: Uuid, clinic_id: Uuid },

    #[error("one-time code rejected: {0}")]
    OtpRejected(OtpFailure),

    #[error("only the pet's owner may {action}")]
    NotOwner { action: &'static str },

    #[error("grant belongs to another clinic")]
    WrongClinic,

    #[error("grant {id} is already {}", .status.as_str())]
    AlreadyTerminal { id: Uuid, status: GrantStatus },

    #[error("grant duration must be between 1 and {max} hours, got {requested}")]
    InvalidDuration { requested: u32, max: u32 },

    #[error("invalid purpose: {0}")]
    InvalidPurpose(&'static str),

    #[error("otp {id} kept changing during validation")]
    Contended { id: Uuid },

    #[error("actor holds no role that can author records")]
    NoAuthorRole,

    #[error("one-time code lifetime of {secs}s is out of range")]
    OtpTtlOutOfRange { secs: u64 },
}

impl From<AccessError> for VetError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::UnknownTarget { entity, id } => VetError::InvalidTarget {
                entity: entity.into(),
                id: id.to_string(),
            },
            AccessError::DoctorNotAffiliated { doctor_id, .. } => VetError::InvalidTarget {
                entity: "doctor".into(),
                id: doctor_id.to_string(),
            },
            AccessError::OtpRejected(reason) => VetError::OtpInvalid(reason),
            AccessError::NotOwner { .. } | AccessError::WrongClinic => VetError::Forbidden {
                reason: err.to_string(),
            },
            AccessError::AlreadyTerminal { id, status } => VetError::AlreadyTerminal {
                id: id.to_string(),
                status: status.as_str().into(),
            },
            AccessError::InvalidDuration { .. }
            | AccessError::InvalidPurpose(_)
            | AccessError::NoAuthorRole => VetError::Validation {
                message: err.to_string(),
            },
            AccessError::Contended { id } => VetError::Conflict {
                entity: "otp".into(),
                id: id.to_string(),
            },
            AccessError::OtpTtlOutOfRange { .. } => VetError::Internal(err.to_string()),
        }
    }
}
