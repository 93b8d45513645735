use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;

use crate::{
    services::session::{found, AuthGate},
    state::AppState,
};

/// A middleware that requires a logged-in user.
///
/// On success the `UserWithProfile` is inserted into the request extensions.
/// Otherwise the caller is redirected to `/login?redirectTo=<path>` and the
/// handler never runs.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let path = request.uri().path().to_string();

    match state.sessions.require_logged_in_user(&cookies, &path).await {
        Ok(AuthGate::Authenticated(user)) => {
            tracing::debug!("✅ User authenticated: {}", user.user.id);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(AuthGate::RedirectRequired(location)) => {
            tracing::debug!("🔒 No valid session for {}, redirecting", path);
            found(&location)
        }
        Err(e) => e.into_response(),
    }
}
