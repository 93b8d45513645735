use tokio_postgres::Row;
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's email address, unique and compared as stored.
    pub email: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

impl From<&Row> for User {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        }
    }
}

/// The non-authentication attributes of a user.
#[derive(Clone, Debug)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
}

impl Profile {
    /// Returns "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A user joined with its profile, as loaded for an authenticated request.
#[derive(Clone, Debug)]
pub struct UserWithProfile {
    pub user: User,
    pub profile: Option<Profile>,
}

impl UserWithProfile {
    /// Builds the value from a `users LEFT JOIN profiles` row.
    pub fn from_row(row: &Row) -> Self {
        let first_name: Option<String> = row.get("first_name");
        let last_name: Option<String> = row.get("last_name");

        Self {
            user: User::from(row),
            profile: first_name
                .zip(last_name)
                .map(|(first_name, last_name)| Profile { first_name, last_name }),
        }
    }

    /// The name shown to the user, falling back to the email when no profile exists.
    pub fn display_name(&self) -> String {
        self.profile
            .as_ref()
            .map(Profile::full_name)
            .unwrap_or_else(|| self.user.email.clone())
    }
}

/// The data needed to persist a new user together with its credential and profile.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}
