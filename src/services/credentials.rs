use std::sync::Arc;
use once_cell::sync::Lazy;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use uuid::Uuid;
use zeroize::Zeroize;
use crate::{
    crypto::aes::random_bytes,
    error::{AppError, Result},
    models::user::{NewUser, User, UserWithProfile},
    repositories::user::UserRepository,
};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;
/// The salt length in bytes.
const SALT_SIZE: usize = 16;

/// Verified against when no stored hash exists, so every login attempt costs
/// one Argon2 run with the stored parameters.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("gatehouse-dummy-password").ok());

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-formatted hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = random_bytes::<SALT_SIZE>();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Encryption(format!("Salt encoding error: {}", e)))?;
    salt_bytes.zeroize();

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Encryption(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Encryption(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a stored hash.
///
/// Returns `false` on mismatch and on a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("⚠️  Stored password hash is unparsable: {}", e);
            return false;
        }
    };

    let mut password_bytes = password.as_bytes().to_vec();
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    tracing::debug!("Password verification completed");
    result
}

/// Runs a CPU-heavy closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))
}

/// A signup request after validation.
#[derive(Debug, Clone)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Bridges plaintext credentials and their persisted, hashed representation.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepository>,
}

impl CredentialStore {
    /// Creates a new `CredentialStore` over a repository.
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Finds a user by email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.find_by_email(email).await
    }

    /// Finds a user and its profile by ID.
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserWithProfile>> {
        self.repo.find_by_id(user_id).await
    }

    /// Returns whether an account already uses this email.
    pub async fn user_exists_by_email(&self, email: &str) -> Result<bool> {
        self.repo.exists_by_email(email).await
    }

    /// Hashes the password and persists the user, credential and profile.
    pub async fn create_user(&self, signup: Signup) -> Result<User> {
        tracing::debug!("🔐 Creating user: {}", signup.email);

        let Signup { email, mut password, first_name, last_name } = signup;
        let password_hash = blocking(move || {
            let hash = hash_password(&password);
            password.zeroize();
            hash
        })
        .await??;

        let user = self
            .repo
            .create(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
            })
            .await?;

        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    /// Checks an email/password pair.
    ///
    /// Unknown email and wrong password are both `None`.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        tracing::debug!("🔐 Authenticating user: {}", email);

        let Some(user) = self.find_user_by_email(email).await? else {
            tracing::warn!("❌ Login attempt for unknown email");
            Self::verify_blocking(password, None).await?;
            return Ok(None);
        };

        let Some(hash) = self.repo.find_password_hash(user.id).await? else {
            tracing::warn!("❌ No credential stored for user: {}", user.id);
            Self::verify_blocking(password, None).await?;
            return Ok(None);
        };

        if !Self::verify_blocking(password, Some(hash)).await? {
            tracing::warn!("❌ Wrong password for user: {}", user.id);
            return Ok(None);
        }

        tracing::info!("✅ User authenticated: {}", user.id);
        Ok(Some(user))
    }

    /// Verifies on the blocking pool. Without a stored hash the password is
    /// checked against `DUMMY_HASH` and the result is always `false`.
    async fn verify_blocking(password: &str, hash: Option<String>) -> Result<bool> {
        let mut password = password.to_string();
        blocking(move || {
            let valid = match hash {
                Some(hash) => verify_password(&password, &hash),
                None => {
                    if let Some(dummy) = DUMMY_HASH.as_deref() {
                        verify_password(&password, dummy);
                    }
                    false
                }
            };
            password.zeroize();
            valid
        })
        .await
    }
}
