//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    petvault_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("access_grant"), "missing access_grant table");
    assert!(info_str.contains("otp"), "missing otp table");
    assert!(info_str.contains("pet"), "missing pet table");
    assert!(info_str.contains("clinic"), "missing clinic table");
    assert!(info_str.contains("clinic_doctor"), "missing clinic_doctor table");
    assert!(info_str.contains("family_member"), "missing family_member table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let first = petvault_db::run_migrations(&db).await.unwrap();
    assert_eq!(first.applied, vec![1, 2]);
    assert_eq!(first.current_version, 2);

    let second = petvault_db::run_migrations(&db).await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.current_version, 2);

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn unique_active_key_rejects_second_active_grant() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    petvault_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE access_grant SET \
         grant_id = $grant_id, pet_id = 'p', clinic_id = 'c', \
         owner_id = 'o', otp_id = 'x', purpose = 'visit', \
         status = 'Active', active_key = 'p:c', \
         granted_at = time::now(), expires_at = time::now() + 1h, \
         updated_at = time::now()";

    db.query(insert)
        .bind(("grant_id", "g1"))
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query(insert)
        .bind(("grant_id", "g2"))
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "second active grant for a pair must be rejected");
}

#[tokio::test]
async fn invalid_status_is_rejected() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    petvault_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE otp SET pet_id = 'p', clinic_id = 'c', owner_id = 'o', \
             code_hash = 'h', purpose = 'visit', status = 'Bogus', \
             attempt_count = 0, max_attempts = 3, \
             issued_at = time::now(), expires_at = time::now() + 10m",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "unknown OTP status should be rejected");
}

#[tokio::test]
async fn manager_migrates_and_hands_out_repositories() {
    use petvault_core::repository::{AccessGrantRepository, MembershipRepository};
    use petvault_db::DbManager;
    use uuid::Uuid;

    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let manager = DbManager::open(db.clone()).await.unwrap();
    assert_eq!(manager.schema_version(), 2);

    let repos = manager.repositories();
    let pet = Uuid::new_v4();
    assert!(repos.grants.find_active(pet, Uuid::new_v4()).await.unwrap().is_none());
    assert!(repos.memberships.owner_of(pet).await.unwrap().is_none());

    let reopened = DbManager::open(db).await.unwrap();
    assert_eq!(reopened.schema_version(), 2);
}
