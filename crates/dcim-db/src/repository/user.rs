//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.
//!
//! Users are soft-deleted: reads filter on `deleted_at IS NONE` and the
//! public read type is [`UserView`], which never carries the hash.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use dcim_core::error::DcimResult;
use dcim_core::models::user::{
    CreateUser, UpdateUser, User, UserFilter, UserRole, UserStatus, UserView,
};
use dcim_core::query::{ListOptions, Page};
use dcim_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::query::{IdRow, ListQuery};

const SORTABLE: &[&str] = &["first_name", "email", "created_at", "updated_at"];
const SEARCHABLE: &[&str] = &["first_name", "last_name", "email"];

#[derive(Debug, SurrealValue)]
struct UserRow {
    first_name: String,
    last_name: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    is_email_verified: bool,
    last_login_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<UserRole, DbError> {
    UserRole::parse(s).ok_or_else(|| DbError::Query(format!("unknown user role: {s}")))
}

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    UserStatus::parse(s).ok_or_else(|| DbError::Query(format!("unknown user status: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            status: parse_status(&self.status)?,
            is_email_verified: self.is_email_verified,
            last_login_at: self.last_login_at,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    first_name: String,
    last_name: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    is_email_verified: bool,
    last_login_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let row = UserRow {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            status: self.status,
            is_email_verified: self.is_email_verified,
            last_login_at: self.last_login_at,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_user(id)
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Query(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Query(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    /// Email uniqueness among live rows only; the schema's unique index
    /// still reserves soft-deleted emails as the backstop.
    async fn ensure_email_free(&self, email: &str, exclude_id: Option<&str>) -> Result<(), DbError> {
        let mut sql = "SELECT meta::id(id) AS record_id FROM user \
                       WHERE email = $email AND deleted_at IS NONE"
            .to_string();
        if exclude_id.is_some() {
            sql.push_str(" AND meta::id(id) != $exclude");
        }

        let mut query = self.db.query(&sql).bind(("email", email.to_string()));
        if let Some(exclude) = exclude_id {
            query = query.bind(("exclude", exclude.to_string()));
        }

        let mut result = query.await?;
        let rows: Vec<IdRow> = result.take(0)?;
        if rows.is_empty() {
            Ok(())
        } else {
            Err(DbError::Conflict("Email already taken".into()))
        }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> DcimResult<UserView> {
        self.ensure_email_free(&input.email, None).await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let role = input.role.unwrap_or_default();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 first_name = $first_name, last_name = $last_name, \
                 email = $email, password_hash = $password_hash, \
                 role = $role, status = $status, \
                 is_email_verified = false, \
                 last_login_at = NONE, deleted_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("role", role.as_str().to_string()))
            .bind(("status", UserStatus::Active.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?.into())
    }

    async fn get_by_id(&self, id: Uuid) -> DcimResult<UserView> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('user', $id) \
                 WHERE deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?.into())
    }

    async fn get_with_password(&self, email: &str) -> DcimResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE email = $email AND deleted_at IS NONE",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> DcimResult<UserView> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(email) = &input.email {
            if *email != current.email {
                self.ensure_email_free(email, Some(&id_str)).await?;
            }
        }

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.is_email_verified.is_some() {
            sets.push("is_email_verified = $is_email_verified");
        }
        if input.last_login_at.is_some() {
            sets.push("last_login_at = $last_login_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE deleted_at IS NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(is_email_verified) = input.is_email_verified {
            builder = builder.bind(("is_email_verified", is_email_verified));
        }
        if let Some(last_login_at) = input.last_login_at {
            builder = builder.bind(("last_login_at", last_login_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?.into())
    }

    async fn delete(&self, id: Uuid) -> DcimResult<()> {
        // Soft delete; NotFound when already deleted or never existed.
        self.get_by_id(id).await?;

        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 deleted_at = time::now(), updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, filter: UserFilter, options: ListOptions) -> DcimResult<Page<UserView>> {
        let resolved = options.resolve(SORTABLE);

        let mut query = ListQuery::new("user");
        query.raw("deleted_at IS NONE");
        query.search(SEARCHABLE, filter.search);
        query.eq("role", filter.role.map(|r| r.as_str().to_string()));
        query.eq("status", filter.status.map(|s| s.as_str().to_string()));

        let (rows, total): (Vec<UserRowWithId>, u64) = query.run(&self.db, &resolved).await?;
        let results = rows
            .into_iter()
            .map(|row| row.try_into_user().map(UserView::from))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(results, resolved.page, resolved.limit, total))
    }
}

/// Verify a password against an Argon2id hash.
///
/// Public for use by the auth collaborator.
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<bool, DbError> {
    use argon2::PasswordVerifier;

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| DbError::Query(format!("invalid hash format: {e}")))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DbError::Query(format!("verify error: {e}"))),
    }
}
