//! Pet and clinic directory entries consumed for target validation
//! and OTP addressing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetSummary {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    /// Phone number or email the owner receives one-time codes on.
    pub owner_contact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSummary {
    pub id: Uuid,
    pub name: String,
}
