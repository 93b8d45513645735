use axum::{
    extract::State,
    response::{Html, Response},
    Extension,
};
use tower_cookies::Cookies;

use crate::{
    models::user::UserWithProfile,
    services::session::{found, AuthGate},
    state::AppState,
    views,
};

/// `GET /`: sends callers with a session to the home page, others to login.
///
/// Only the cookie is checked here; `/home` loads the user.
#[axum::debug_handler]
pub async fn index(State(state): State<AppState>, cookies: Cookies) -> Response {
    match state.sessions.require_user_id(&cookies, "/") {
        AuthGate::Authenticated(_) => found("/home"),
        AuthGate::RedirectRequired(location) => found(&location),
    }
}

/// `GET /home`: greets the logged-in user.
#[axum::debug_handler]
pub async fn home(Extension(user): Extension<UserWithProfile>) -> Html<String> {
    tracing::debug!("Rendering home for user: {}", user.user.id);
    Html(views::home_page(&user))
}
