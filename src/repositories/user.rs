use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User, UserWithProfile},
};

/// Persistence operations for users, their credentials and profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Finds a user and its profile by ID.
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserWithProfile>>;

    /// Returns whether a user with this email exists.
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Returns the stored password hash for a user.
    async fn find_password_hash(&self, user_id: Uuid) -> Result<Option<String>>;

    /// Inserts the user, credential and profile as one unit.
    ///
    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn create(&self, new_user: NewUser) -> Result<User>;
}

/// `UserRepository` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    /// Creates a new `PgUserRepository`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, email, created_at
                FROM users
                WHERE email = $1
                "#,
                &[&email],
            )
            .await?;
        Ok(row.as_ref().map(User::from))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserWithProfile>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT u.id, u.email, u.created_at, p.first_name, p.last_name
                FROM users u
                LEFT JOIN profiles p ON p.user_id = u.id
                WHERE u.id = $1
                "#,
                &[&user_id],
            )
            .await?;
        Ok(row.as_ref().map(UserWithProfile::from_row))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)",
                &[&email],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn find_password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT hash FROM credentials WHERE user_id = $1",
                &[&user_id],
            )
            .await?;
        Ok(row.map(|r| r.get("hash")))
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let id = Uuid::new_v4();

        let row = tx
            .query_one(
                r#"
                INSERT INTO users (id, email)
                VALUES ($1, $2)
                RETURNING id, email, created_at
                "#,
                &[&id, &new_user.email],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::Conflict("User already exists with that email".to_string())
                } else {
                    AppError::from(e)
                }
            })?;

        tx.execute(
            "INSERT INTO credentials (user_id, hash) VALUES ($1, $2)",
            &[&id, &new_user.password_hash],
        )
        .await?;

        tx.execute(
            "INSERT INTO profiles (user_id, first_name, last_name) VALUES ($1, $2, $3)",
            &[&id, &new_user.first_name, &new_user.last_name],
        )
        .await?;

        tx.commit().await?;

        Ok(User::from(&row))
    }
}
