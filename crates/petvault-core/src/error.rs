//! Error types for the PetVault access core.

use thiserror::Error;

use crate::models::otp::OtpFailure;

#[derive(Debug, Error)]
pub enum VetError {
    #[error("Unknown target: {entity} with id {id}")]
    InvalidTarget { entity: String, id: String },

    #[error("One-time code rejected: {0}")]
    OtpInvalid(OtpFailure),

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Grant {id} is already {status}")]
    AlreadyTerminal { id: String, status: String },

    #[error("No relation between actor and pet")]
    NoRelation,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VetError {
    /// HTTP status code the controller boundary should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            VetError::InvalidTarget { .. }
            | VetError::OtpInvalid(_)
            | VetError::Validation { .. } => 400,
            VetError::Forbidden { .. } | VetError::NoRelation => 403,
            VetError::NotFound { .. } => 404,
            VetError::AlreadyTerminal { .. } | VetError::Conflict { .. } => 409,
            VetError::Unavailable(_) => 503,
            VetError::Database(_) | VetError::Internal(_) => 500,
        }
    }
}

pub type VetResult<T> = Result<T, VetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        let invalid = VetError::InvalidTarget {
            entity: "pet".into(),
            id: "x".into(),
        };
        assert_eq!(invalid.http_status(), 400);
        assert_eq!(VetError::OtpInvalid(OtpFailure::Locked).http_status(), 400);
        assert_eq!(
            VetError::Forbidden {
                reason: "not owner".into()
            }
            .http_status(),
            403
        );
        assert_eq!(VetError::NoRelation.http_status(), 403);
        assert_eq!(
            VetError::AlreadyTerminal {
                id: "g".into(),
                status: "Revoked".into()
            }
            .http_status(),
            409
        );
        assert_eq!(VetError::Database("boom".into()).http_status(), 500);
    }

    #[test]
    fn otp_failures_stay_distinguishable() {
        let wrong = VetError::OtpInvalid(OtpFailure::WrongCode {
            remaining_attempts: 2,
        })
        .to_string();
        let locked = VetError::OtpInvalid(OtpFailure::Locked).to_string();
        let expired = VetError::OtpInvalid(OtpFailure::Expired).to_string();

        assert_ne!(wrong, locked);
        assert_ne!(locked, expired);
        assert!(wrong.contains("2 attempts remaining"));
    }
}
