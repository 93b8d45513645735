use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    services::{
        credentials::Signup,
        session::found,
    },
    state::AppState,
    validation::auth::*,
    views,
};

/// Shown for an unknown email or a wrong password alike.
pub const INCORRECT_CREDENTIALS: &str = "Incorrect login credentials";
/// Shown when signing up with an email that is already registered.
pub const USER_EXISTS: &str = "User already exists with that email";

/// The query parameters of the login page.
#[derive(Deserialize, Debug, Default)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// The `400` body of a rejected login/signup submission.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthFormResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_error: Option<String>,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<EchoFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
}

impl IntoResponse for AuthFormResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Only local absolute paths are followed after login.
fn safe_redirect(target: Option<&str>) -> &str {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

/// Renders the login page, or sends logged-in users home.
#[axum::debug_handler]
pub async fn login_page(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    if state.sessions.resolve_logged_in_user(&cookies).await?.is_some() {
        return Ok(found("/"));
    }

    let redirect_to = safe_redirect(query.redirect_to.as_deref());
    Ok(Html(views::login_page(redirect_to)).into_response())
}

/// Handles the login and signup form.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    form: std::result::Result<Form<RawAuthForm>, FormRejection>,
) -> Result<Response> {
    let raw = match form {
        Ok(Form(raw)) => raw,
        Err(rejection) => {
            tracing::warn!("❌ Undecodable login form: {}", rejection);
            return Ok(AuthFormResponse {
                form_error: Some(MalformedRequest { form: None }.to_string()),
                ..Default::default()
            }
            .into_response());
        }
    };

    let redirect_to = safe_redirect(raw.redirect_to.as_deref()).to_string();

    let form = match AuthForm::parse(raw) {
        Ok(form) => form,
        Err(malformed) => {
            tracing::warn!("❌ Malformed login form: {:?}", malformed.form);
            return Ok(AuthFormResponse {
                form_error: Some(malformed.to_string()),
                form: malformed.form,
                ..Default::default()
            }
            .into_response());
        }
    };

    tracing::info!("🔐 {} attempt for: {}", form.action(), form.email());

    let rejected = |form_error: Option<&str>, errors: FieldErrors| AuthFormResponse {
        form_error: form_error.map(str::to_string),
        errors,
        fields: Some(form.echo()),
        form: Some(form.action().to_string()),
    };

    let errors = form.field_errors();
    if !errors.is_empty() {
        tracing::debug!("Validation failed: {:?}", errors);
        return Ok(rejected(None, errors).into_response());
    }

    match &form {
        AuthForm::Login(login) => {
            match state
                .credentials
                .verify_credentials(&login.email, &login.password)
                .await?
            {
                Some(user) => state.sessions.issue_session(&cookies, user.id, &redirect_to),
                None => Ok(rejected(Some(INCORRECT_CREDENTIALS), FieldErrors::new()).into_response()),
            }
        }
        AuthForm::Signup(signup) => {
            if state.credentials.user_exists_by_email(&signup.email).await? {
                tracing::warn!("❌ Signup with existing email");
                return Ok(rejected(Some(USER_EXISTS), FieldErrors::new()).into_response());
            }

            let created = state
                .credentials
                .create_user(Signup {
                    email: signup.email.clone(),
                    password: signup.password.clone(),
                    first_name: signup.first_name.clone(),
                    last_name: signup.last_name.clone(),
                })
                .await;

            match created {
                Ok(user) => state.sessions.issue_session(&cookies, user.id, &redirect_to),
                Err(AppError::Conflict(_)) => {
                    tracing::warn!("❌ Signup lost a race on email uniqueness");
                    Ok(rejected(Some(USER_EXISTS), FieldErrors::new()).into_response())
                }
                Err(e) => Err(e),
            }
        }
    }
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    state.sessions.destroy_session(&cookies)
}

/// `GET /logout` does nothing but send the caller home.
pub async fn logout_redirect() -> Response {
    found("/")
}
