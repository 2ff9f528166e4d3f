//! Integration tests for the read-only directory and membership views.

use petvault_core::error::VetError;
use petvault_core::models::membership::AccessLevel;
use petvault_core::repository::{DirectoryRepository, MembershipRepository};
use petvault_db::repository::{SurrealDirectoryRepository, SurrealMembershipRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

struct Fixture {
    db: Surreal<Db>,
    pet_id: Uuid,
    owner_id: Uuid,
    clinic_id: Uuid,
    doctor_id: Uuid,
}

/// Seed one pet, one clinic with one doctor.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    petvault_db::run_migrations(&db).await.unwrap();

    let fixture = Fixture {
        db,
        pet_id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
    };

    fixture
        .db
        .query(
            "CREATE type::record('pet', $pet_id) SET \
             name = 'Biscuit', owner_id = $owner_id, owner_contact = '+15550100'; \
             CREATE type::record('clinic', $clinic_id) SET name = 'Riverside Vets'; \
             CREATE clinic_doctor SET clinic_id = $clinic_id, doctor_id = $doctor_id;",
        )
        .bind(("pet_id", fixture.pet_id.to_string()))
        .bind(("owner_id", fixture.owner_id.to_string()))
        .bind(("clinic_id", fixture.clinic_id.to_string()))
        .bind(("doctor_id", fixture.doctor_id.to_string()))
        .await
        .unwrap()
        .check()
        .unwrap();

    fixture
}

#[tokio::test]
async fn get_pet_and_clinic() {
    let f = setup().await;
    let repo = SurrealDirectoryRepository::new(f.db.clone());

    let pet = repo.get_pet(f.pet_id).await.unwrap();
    assert_eq!(pet.name, "Biscuit");
    assert_eq!(pet.owner_id, f.owner_id);
    assert_eq!(pet.owner_contact, "+15550100");

    let clinic = repo.get_clinic(f.clinic_id).await.unwrap();
    assert_eq!(clinic.name, "Riverside Vets");
}

#[tokio::test]
async fn unknown_pet_is_not_found() {
    let f = setup().await;
    let repo = SurrealDirectoryRepository::new(f.db.clone());

    let err = repo.get_pet(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, VetError::NotFound { .. }));
    let err = repo.get_clinic(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, VetError::NotFound { .. }));
}

#[tokio::test]
async fn doctor_affiliation() {
    let f = setup().await;
    let repo = SurrealDirectoryRepository::new(f.db.clone());

    assert!(repo.is_affiliated(f.doctor_id, f.clinic_id).await.unwrap());
    assert!(!repo.is_affiliated(Uuid::new_v4(), f.clinic_id).await.unwrap());
    assert!(!repo.is_affiliated(f.doctor_id, Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn owner_and_family_lookups() {
    let f = setup().await;
    let repo = SurrealMembershipRepository::new(f.db.clone());
    let sibling = Uuid::new_v4();

    f.db.query(
        "CREATE family_member SET pet_id = $pet_id, user_id = $user_id, \
         access_level = 'ReadOnly'",
    )
    .bind(("pet_id", f.pet_id.to_string()))
    .bind(("user_id", sibling.to_string()))
    .await
    .unwrap()
    .check()
    .unwrap();

    assert_eq!(repo.owner_of(f.pet_id).await.unwrap(), Some(f.owner_id));
    assert_eq!(repo.owner_of(Uuid::new_v4()).await.unwrap(), None);

    let membership = repo
        .get_membership(f.pet_id, sibling)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.access_level, AccessLevel::ReadOnly);
    assert!(
        repo.get_membership(f.pet_id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none()
    );
}
