//! PetVault Database: SurrealDB connection management, schema
//! migrations and repository implementations for the access core.
//!
//! This crate provides:
//! - Store bootstrap ([`DbManager`], [`DbConfig`]) handing out the
//!   repository set ([`Repositories`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repositories for grants, one-time codes and the read-only
//!   directory/membership views ([`repository`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager, Repositories};
pub use error::DbError;
pub use schema::{MigrationReport, run_migrations, schema_v1};
