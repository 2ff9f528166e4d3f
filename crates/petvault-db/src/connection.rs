//! Storage bootstrap: connect, bring the schema up to date and hand out
//! the repositories the access services are built from.

use std::fmt;

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealAccessGrantRepository, SurrealDirectoryRepository, SurrealMembershipRepository,
    SurrealOtpRepository,
};
use crate::schema::run_migrations;

/// Where the grant store lives.
#[derive(Clone)]
pub struct DbConfig {
    /// WebSocket address, e.g. `127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "petvault".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// Owned grant/OTP tables plus the read-only directory views, all on
/// one client.
#[derive(Clone)]
pub struct Repositories<C: Connection> {
    pub grants: SurrealAccessGrantRepository<C>,
    pub otps: SurrealOtpRepository<C>,
    pub directory: SurrealDirectoryRepository<C>,
    pub memberships: SurrealMembershipRepository<C>,
}

/// A migrated PetVault store.
#[derive(Clone)]
pub struct DbManager<C: Connection = Client> {
    db: Surreal<C>,
    schema_version: u32,
}

impl DbManager<Client> {
    /// Sign in as root over WebSocket, select the namespace and
    /// database, then apply pending migrations.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to grant store"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Self::open(db).await
    }
}

impl<C: Connection> DbManager<C> {
    /// Take over a client whose namespace and database are already
    /// selected and migrate it.
    pub async fn open(db: Surreal<C>) -> Result<Self, DbError> {
        let report = run_migrations(&db).await?;
        info!(
            schema_version = report.current_version,
            applied = report.applied.len(),
            "Grant store ready"
        );
        Ok(Self {
            db,
            schema_version: report.current_version,
        })
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn repositories(&self) -> Repositories<C> {
        Repositories {
            grants: SurrealAccessGrantRepository::new(self.db.clone()),
            otps: SurrealOtpRepository::new(self.db.clone()),
            directory: SurrealDirectoryRepository::new(self.db.clone()),
            memberships: SurrealMembershipRepository::new(self.db.clone()),
        }
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }
}
