//! Integration tests for the one-time code repository.

use chrono::{Duration, Utc};
use petvault_core::models::otp::{CreateOtp, OtpStatus, OtpTransition};
use petvault_core::repository::OtpRepository;
use petvault_db::repository::SurrealOtpRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealOtpRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    petvault_db::run_migrations(&db).await.unwrap();
    SurrealOtpRepository::new(db)
}

fn input() -> CreateOtp {
    let now = Utc::now();
    CreateOtp {
        pet_id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        code_hash: "ab".repeat(32),
        purpose: "vaccination".into(),
        max_attempts: 3,
        issued_at: now,
        expires_at: now + Duration::minutes(10),
    }
}

#[tokio::test]
async fn create_starts_pending() {
    let repo = setup().await;
    let otp = repo.create(input()).await.unwrap();

    assert_eq!(otp.status, OtpStatus::Pending);
    assert_eq!(otp.attempt_count, 0);
    assert_eq!(otp.max_attempts, 3);

    let fetched = repo.get_by_id(otp.id).await.unwrap();
    assert_eq!(fetched.code_hash, otp.code_hash);
    assert_eq!(fetched.purpose, "vaccination");
}

#[tokio::test]
async fn transition_applies_when_guard_matches() {
    let repo = setup().await;
    let otp = repo.create(input()).await.unwrap();

    let updated = repo
        .transition(
            otp.id,
            OtpTransition {
                expected_attempts: 0,
                status: OtpStatus::Pending,
                attempt_count: 1,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.attempt_count, 1);
    assert_eq!(updated.status, OtpStatus::Pending);
}

#[tokio::test]
async fn stale_attempt_count_loses_the_race() {
    let repo = setup().await;
    let otp = repo.create(input()).await.unwrap();
    let wrong_attempt = OtpTransition {
        expected_attempts: 0,
        status: OtpStatus::Pending,
        attempt_count: 1,
    };

    assert!(repo.transition(otp.id, wrong_attempt).await.unwrap().is_some());
    assert!(repo.transition(otp.id, wrong_attempt).await.unwrap().is_none());

    let current = repo.get_by_id(otp.id).await.unwrap();
    assert_eq!(current.attempt_count, 1);
}

#[tokio::test]
async fn terminal_code_never_transitions_again() {
    let repo = setup().await;
    let otp = repo.create(input()).await.unwrap();

    repo.transition(
        otp.id,
        OtpTransition {
            expected_attempts: 0,
            status: OtpStatus::Used,
            attempt_count: 0,
        },
    )
    .await
    .unwrap()
    .unwrap();

    let reopen = repo
        .transition(
            otp.id,
            OtpTransition {
                expected_attempts: 0,
                status: OtpStatus::Pending,
                attempt_count: 0,
            },
        )
        .await
        .unwrap();
    assert!(reopen.is_none());
    assert_eq!(repo.get_by_id(otp.id).await.unwrap().status, OtpStatus::Used);
}

#[tokio::test]
async fn transition_on_missing_code_is_none() {
    let repo = setup().await;
    let result = repo
        .transition(
            Uuid::new_v4(),
            OtpTransition {
                expected_attempts: 0,
                status: OtpStatus::Used,
                attempt_count: 0,
            },
        )
        .await
        .unwrap();
    assert!(result.is_none());
}
