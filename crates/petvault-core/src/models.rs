//! Domain models for the PetVault access core.
//!
//! Grants and one-time codes are owned by this core. Pets, clinics,
//! family memberships and medical record payloads belong to the CRUD
//! layer; only the metadata needed for access decisions is modelled.

pub mod actor;
pub mod directory;
pub mod grant;
pub mod medical;
pub mod membership;
pub mod otp;
