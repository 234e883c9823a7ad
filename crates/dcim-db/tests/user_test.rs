//! Integration tests for the auxiliary user repository: email
//! uniqueness, the password-free read projection, soft deletion and
//! password verification.

use dcim_core::error::DcimError;
use dcim_core::models::user::{CreateUser, UpdateUser, UserFilter, UserRole, UserStatus};
use dcim_core::query::ListOptions;
use dcim_core::repository::UserRepository;
use dcim_db::repository::{SurrealUserRepository, verify_password};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

type TestDb = Surreal<surrealdb::engine::local::Db>;

async fn setup() -> TestDb {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dcim_db::run_migrations(&db).await.unwrap();
    db
}

fn input(email: &str) -> CreateUser {
    CreateUser {
        first_name: "Ada".into(),
        last_name: Some("Lovelace".into()),
        email: email.into(),
        password: "correct horse battery staple".into(),
        role: None,
    }
}

#[tokio::test]
async fn create_defaults_role_and_status() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(input("ada@example.com")).await.unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.status, UserStatus::Active);
    assert!(!user.is_email_verified);
}

#[tokio::test]
async fn duplicate_email_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(input("ada@example.com")).await.unwrap();
    let err = repo.create(input("ada@example.com")).await.unwrap_err();
    assert!(matches!(err, DcimError::Conflict { .. }));
}

#[tokio::test]
async fn stored_hash_verifies_but_is_not_exposed() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(input("ada@example.com")).await.unwrap();

    // The read projection has no password field at all; the full row is
    // only reachable through the login-path accessor.
    let full = repo.get_with_password("ada@example.com").await.unwrap();
    assert_ne!(full.password_hash, "correct horse battery staple");
    assert!(
        verify_password("correct horse battery staple", &full.password_hash, None).unwrap()
    );
    assert!(!verify_password("wrong password", &full.password_hash, None).unwrap());
}

#[tokio::test]
async fn peppered_hash_requires_the_same_pepper() {
    let db = setup().await;
    let repo = SurrealUserRepository::with_pepper(db, "server-secret".into());

    repo.create(input("ada@example.com")).await.unwrap();
    let full = repo.get_with_password("ada@example.com").await.unwrap();

    assert!(
        verify_password(
            "correct horse battery staple",
            &full.password_hash,
            Some("server-secret"),
        )
        .unwrap()
    );
    assert!(
        !verify_password("correct horse battery staple", &full.password_hash, None).unwrap()
    );
}

#[tokio::test]
async fn soft_deleted_user_disappears_from_reads() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(input("ada@example.com")).await.unwrap();
    repo.delete(user.id).await.unwrap();

    assert!(matches!(
        repo.get_by_id(user.id).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
    assert!(matches!(
        repo.get_with_password("ada@example.com").await.unwrap_err(),
        DcimError::NotFound { .. }
    ));

    let page = repo
        .list(UserFilter::default(), ListOptions::default())
        .await
        .unwrap();
    assert_eq!(page.total_results, 0);

    // Deleting twice reports NotFound, not success.
    assert!(matches!(
        repo.delete(user.id).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
}

#[tokio::test]
async fn update_checks_email_only_when_it_changes() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let ada = repo.create(input("ada@example.com")).await.unwrap();
    repo.create(input("grace@example.com")).await.unwrap();

    // Same email back is fine.
    let updated = repo
        .update(
            ada.id,
            UpdateUser {
                email: Some("ada@example.com".into()),
                role: Some(UserRole::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, UserRole::Admin);

    // Taking another live user's email conflicts.
    let err = repo
        .update(
            ada.id,
            UpdateUser {
                email: Some("grace@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::Conflict { .. }));
}

#[tokio::test]
async fn list_filters_by_role() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let ada = repo.create(input("ada@example.com")).await.unwrap();
    repo.create(input("grace@example.com")).await.unwrap();
    repo.update(
        ada.id,
        UpdateUser {
            role: Some(UserRole::Admin),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let page = repo
        .list(
            UserFilter {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_results, 1);
    assert_eq!(page.results[0].id, ada.id);
}
