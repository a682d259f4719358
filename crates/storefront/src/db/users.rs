//! `PostgreSQL` user directory.
//!
//! Subject IDs issued for Postgres users are the textual form of the
//! `users.id` UUID. A subject that does not parse as a UUID cannot belong to
//! any stored user and resolves to `None`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use carlot_core::{Email, SubjectId};

use super::{RepositoryError, UserDirectory, conflict_or_database};
use crate::models::{NewUser, UserProfile};

/// User directory backed by the `carlot.users` table.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new user directory.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    profile_image: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: SubjectId::new(row.id.to_string()),
            name: row.name,
            email,
            profile_image: row.profile_image,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<UserProfile>, RepositoryError> {
        let Ok(id) = Uuid::parse_str(id.as_str()) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, profile_image, created_at
            FROM carlot.users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(UserProfile, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, name, email, profile_image, created_at, password_hash
            FROM carlot.users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let profile = UserProfile::try_from(row.user)?;
        Ok(Some((profile, row.password_hash)))
    }

    async fn create(&self, user: NewUser) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO carlot.users (id, name, email, password_hash, profile_image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, profile_image, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.profile_image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "email already exists"))?;

        UserProfile::try_from(row)
    }
}
