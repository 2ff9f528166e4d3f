//! SurrealDB repository implementations.

mod directory;
mod grant;
mod membership;
mod otp;

pub use directory::SurrealDirectoryRepository;
pub use grant::SurrealAccessGrantRepository;
pub use membership::SurrealMembershipRepository;
pub use otp::SurrealOtpRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

fn parse_opt_uuid(field: &str, value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(field, v)).transpose()
}
