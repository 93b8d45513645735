//! Test-only `UserRepository` implementations.

use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::user::{NewUser, Profile, User, UserWithProfile},
    repositories::user::UserRepository,
};

struct StoredUser {
    user: User,
    hash: String,
    profile: Profile,
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<HashMap<Uuid, StoredUser>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a user, simulating an account removed behind a live session.
    pub fn remove(&self, user_id: Uuid) {
        self.users.lock().unwrap().remove(&user_id);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|stored| stored.user.email == email)
            .map(|stored| stored.user.clone()))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserWithProfile>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&user_id).map(|stored| UserWithProfile {
            user: stored.user.clone(),
            profile: Some(stored.profile.clone()),
        }))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn find_password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&user_id).map(|stored| stored.hash.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|stored| stored.user.email == new_user.email) {
            return Err(AppError::Conflict(
                "User already exists with that email".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            created_at: Utc::now(),
        };
        users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                hash: new_user.password_hash,
                profile: Profile {
                    first_name: new_user.first_name,
                    last_name: new_user.last_name,
                },
            },
        );
        Ok(user)
    }
}

/// How a `FailingUserRepository` fails.
#[derive(Clone, Copy)]
pub enum StoreFailure {
    /// No connection could be checked out of the pool.
    Unavailable,
    /// The query itself failed.
    Query,
}

/// A `UserRepository` whose every call fails, standing in for a broken store.
pub struct FailingUserRepository {
    failure: StoreFailure,
}

impl FailingUserRepository {
    pub fn new(failure: StoreFailure) -> Self {
        Self { failure }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(match self.failure {
            StoreFailure::Unavailable => AppError::Pool(deadpool_postgres::PoolError::Closed),
            StoreFailure::Query => AppError::Internal("Store query failed".to_string()),
        })
    }
}

#[async_trait]
impl UserRepository for FailingUserRepository {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>> {
        self.fail()
    }

    async fn find_by_id(&self, _user_id: Uuid) -> Result<Option<UserWithProfile>> {
        self.fail()
    }

    async fn exists_by_email(&self, _email: &str) -> Result<bool> {
        self.fail()
    }

    async fn find_password_hash(&self, _user_id: Uuid) -> Result<Option<String>> {
        self.fail()
    }

    async fn create(&self, _new_user: NewUser) -> Result<User> {
        self.fail()
    }
}
