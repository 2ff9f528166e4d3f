//! PetVault Core: domain models, repository traits and the error
//! taxonomy shared by the storage and access crates.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{VetError, VetResult};
