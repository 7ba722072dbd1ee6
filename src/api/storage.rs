//! User persistence behind a narrow store interface.
//!
//! Handlers depend on [`UserStore`] so flow tests can run against an
//! in-memory double; production wires in [`PgUserStore`]. The expected
//! schema lives in `sql/schema.sql`: `users(id uuid pk, name, email unique,
//! password_hash, profile_pic nullable, created_at)`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Durable user record as stored.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_pic: Option<String>,
}

/// Outcome when attempting to create a user.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(UserRecord),
    DuplicateEmail,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user, reporting an email conflict instead of failing.
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Replace the profile-picture reference, returning the stored value or
    /// `None` when no such user exists.
    async fn update_profile_pic(&self, id: Uuid, reference: &str) -> Result<Option<String>>;
}

/// Postgres-backed [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_pic: row.get("profile_pic"),
        created_at: row.get("created_at"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let id = Uuid::new_v4();
        let query = r"
            INSERT INTO users
                (id, name, email, password_hash, profile_pic)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.profile_pic.as_deref())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(UserRecord {
                id,
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                profile_pic: user.profile_pic,
                created_at: row.get("created_at"),
            })),
            Err(err) => {
                if is_unique_violation(&err) {
                    return Ok(InsertOutcome::DuplicateEmail);
                }
                Err(err).context("failed to insert user")
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = "SELECT id, name, email, password_hash, profile_pic, created_at FROM users WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up user by email")?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = "SELECT id, name, email, password_hash, profile_pic, created_at FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up user by id")?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password")?;

        Ok(())
    }

    async fn update_profile_pic(&self, id: Uuid, reference: &str) -> Result<Option<String>> {
        let query = "UPDATE users SET profile_pic = $2 WHERE id = $1 RETURNING profile_pic";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(reference)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update profile picture")?;

        Ok(row.map(|row| row.get("profile_pic")))
    }
}
