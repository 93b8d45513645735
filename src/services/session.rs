//! Stateless cookie sessions.
//!
//! A session is an AES-256-GCM sealed [`SessionPayload`] stored in the
//! `auth-session` cookie as `base64url(nonce || ciphertext)`. Nothing is kept
//! server side: a cookie that fails to decode, decrypt or deserialize, or whose
//! payload has expired, resolves to "no session".

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use tower_cookies::{Cookie, Cookies};
use tower_cookies::cookie::SameSite;
use uuid::Uuid;

use crate::{
    config::Config,
    crypto::aes::{self, SecureKey, NONCE_SIZE},
    error::{AppError, Result},
    models::{session::SessionPayload, user::UserWithProfile},
    services::credentials::CredentialStore,
};

/// The name of the session cookie.
pub const SESSION_COOKIE: &str = "auth-session";
/// Where unauthenticated callers are sent.
pub const LOGIN_PATH: &str = "/login";
/// AES-GCM authentication tag length.
const TAG_SIZE: usize = 16;

/// The outcome of a `require_*` check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGate<T> {
    /// The caller holds a valid session.
    Authenticated(T),
    /// The caller must be redirected to this location; the handler must not continue.
    RedirectRequired(String),
}

impl<T> AuthGate<T> {
    /// Maps a resolved session to a gate, sending absent callers to the login page.
    pub fn from_resolved(resolved: Option<T>, redirect_to: &str) -> Self {
        match resolved {
            Some(value) => AuthGate::Authenticated(value),
            None => AuthGate::RedirectRequired(login_redirect(redirect_to)),
        }
    }
}

/// A `302 Found` redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// The login URL that brings the caller back to `redirect_to` afterwards.
pub fn login_redirect(redirect_to: &str) -> String {
    format!("{}?redirectTo={}", LOGIN_PATH, urlencoding::encode(redirect_to))
}

/// Mints, reads and destroys session cookies.
#[derive(Clone)]
pub struct SessionManager {
    key: SecureKey,
    lifetime: Duration,
    secure: bool,
    credentials: CredentialStore,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `secret` - The server secret the cookie key is derived from.
    /// * `lifetime` - How long an issued session stays valid.
    /// * `secure` - Whether cookies carry the `Secure` attribute.
    /// * `credentials` - Used to load the user behind a session.
    pub fn new(secret: &[u8], lifetime: Duration, secure: bool, credentials: CredentialStore) -> Self {
        Self {
            key: SecureKey::derive(secret),
            lifetime,
            secure,
            credentials,
        }
    }

    /// Creates a `SessionManager` from the application's configuration.
    pub fn from_config(config: &Config, credentials: CredentialStore) -> Result<Self> {
        let lifetime = Duration::try_days(config.session_duration_days).ok_or_else(|| {
            AppError::Internal(format!(
                "Session duration out of range: {} days",
                config.session_duration_days
            ))
        })?;

        Ok(Self::new(
            config.session_secret.as_bytes(),
            lifetime,
            config.secure_cookies,
            credentials,
        ))
    }

    /// Encrypts a payload for `user_id` issued at `now`.
    pub fn seal(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let payload = SessionPayload::new(user_id, now, self.lifetime)
            .ok_or_else(|| AppError::Internal("Session expiry overflow".to_string()))?;
        let plaintext = sonic_rs::to_vec(&payload)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let (ciphertext, nonce) = aes::encrypt(self.key.as_bytes(), &plaintext)?;

        let mut token = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(token))
    }

    /// Decrypts a token and returns its user ID if it is still valid at `now`.
    pub fn open(&self, token: &str, now: DateTime<Utc>) -> Option<Uuid> {
        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(token).ok()?;
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return None;
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce.try_into().ok()?;
        let plaintext = aes::decrypt(self.key.as_bytes(), ciphertext, &nonce).ok()?;
        let payload: SessionPayload = sonic_rs::from_slice(&plaintext).ok()?;

        if payload.is_expired(now) {
            tracing::debug!("⌛ Session expired for user: {}", payload.user_id);
            return None;
        }

        Some(payload.user_id)
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_secure(self.secure);
        cookie.set_max_age(tower_cookies::cookie::time::Duration::seconds(
            self.lifetime.num_seconds(),
        ));
        cookie
    }

    fn clear_cookie(&self, cookies: &Cookies) {
        let mut cookie = self.cookie(String::new());
        cookie.make_removal();
        cookies.add(cookie);
    }

    /// Sets a fresh session cookie for `user_id` and redirects to `redirect_to`.
    ///
    /// This is the only place a session is created.
    pub fn issue_session(&self, cookies: &Cookies, user_id: Uuid, redirect_to: &str) -> Result<Response> {
        let token = self.seal(user_id, Utc::now())?;
        cookies.add(self.cookie(token));
        tracing::info!("✅ Session issued for user: {}", user_id);
        Ok(found(redirect_to))
    }

    /// Returns the user ID of a valid session cookie, if any.
    pub fn resolve_user_id(&self, cookies: &Cookies) -> Option<Uuid> {
        let cookie = cookies.get(SESSION_COOKIE)?;
        let user_id = self.open(cookie.value(), Utc::now());
        if user_id.is_none() {
            tracing::debug!("🔒 Ignoring invalid session cookie");
        }
        user_id
    }

    /// Like `resolve_user_id`, but demands a session.
    pub fn require_user_id(&self, cookies: &Cookies, redirect_to: &str) -> AuthGate<Uuid> {
        AuthGate::from_resolved(self.resolve_user_id(cookies), redirect_to)
    }

    /// Loads the user behind the session.
    ///
    /// A session whose user no longer exists is cleared and treated as absent.
    pub async fn resolve_logged_in_user(&self, cookies: &Cookies) -> Result<Option<UserWithProfile>> {
        let Some(user_id) = self.resolve_user_id(cookies) else {
            return Ok(None);
        };

        match self.credentials.find_user_by_id(user_id).await? {
            Some(user) => {
                tracing::debug!("✅ Session resolved for user: {}", user_id);
                Ok(Some(user))
            }
            None => {
                tracing::warn!("⚠️  Session for missing user {}, forcing logout", user_id);
                self.clear_cookie(cookies);
                Ok(None)
            }
        }
    }

    /// Like `resolve_logged_in_user`, but demands a session.
    pub async fn require_logged_in_user(
        &self,
        cookies: &Cookies,
        redirect_to: &str,
    ) -> Result<AuthGate<UserWithProfile>> {
        let user = self.resolve_logged_in_user(cookies).await?;
        Ok(AuthGate::from_resolved(user, redirect_to))
    }

    /// Clears the session cookie and redirects to the login page.
    ///
    /// Emits the same removal cookie whether or not a session was present.
    pub fn destroy_session(&self, cookies: &Cookies) -> Response {
        if let Some(user_id) = self.resolve_user_id(cookies) {
            tracing::info!("👋 Session destroyed for user: {}", user_id);
        }
        self.clear_cookie(cookies);
        found(LOGIN_PATH)
    }
}
