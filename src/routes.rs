use axum::{
    Router,
    routing::get,
    middleware::from_fn_with_state,
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure};
use tracing::Level;

use crate::{handlers, middleware_layer, state::AppState};

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::home::index))
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/logout",
            get(handlers::auth::logout_redirect).post(handlers::auth::logout),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/home", get(handlers::home::home))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use zeroize::Zeroizing;

    use chrono::Utc;
    use uuid::Uuid;

    use crate::{
        config::Config,
        repositories::memory::{FailingUserRepository, MemoryUserRepository, StoreFailure},
    };

    const JANE_SIGNUP: &str =
        "_action=signup&email=a%40b.com&password=Secret123&firstName=Jane&lastName=Doe";

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            session_duration_days: 30,
            secure_cookies: false,
            session_secret: Zeroizing::new("router-test-secret".to_string()),
        }
    }

    fn app() -> (Router, Arc<MemoryUserRepository>) {
        let repo = Arc::new(MemoryUserRepository::new());
        let state = AppState::with_repository(&test_config(), repo.clone()).unwrap();
        (build_router(state), repo)
    }

    /// A router over a broken store, plus a session cookie it would accept.
    fn failing_app(failure: StoreFailure) -> (Router, String) {
        let repo = Arc::new(FailingUserRepository::new(failure));
        let state = AppState::with_repository(&test_config(), repo).unwrap();
        let token = state.sessions.seal(Uuid::new_v4(), Utc::now()).unwrap();
        (build_router(state), format!("auth-session={}", token))
    }

    const STORE_FAILURES: [(StoreFailure, StatusCode); 2] = [
        (StoreFailure::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
        (StoreFailure::Query, StatusCode::INTERNAL_SERVER_ERROR),
    ];

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    /// The `name=value` pair of the session cookie set by a response.
    fn session_cookie(response: &Response) -> Option<String> {
        set_cookies(response)
            .into_iter()
            .find(|c| c.starts_with("auth-session="))
            .and_then(|c| c.split(';').next().map(str::to_string))
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    async fn signup_jane(app: &Router) -> String {
        let response = send(app, post_form("/login", JANE_SIGNUP, None)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        session_cookie(&response).expect("signup sets a session cookie")
    }

    #[tokio::test]
    async fn signup_then_home_greets_the_user() {
        let (app, _) = app();

        let response = send(&app, post_form("/login", JANE_SIGNUP, None)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
        let set_cookie = set_cookies(&response).join("\n");
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=2592000"));
        let cookie = session_cookie(&response).unwrap();

        let response = send(&app, get("/home", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Jane Doe"));
    }

    #[tokio::test]
    async fn login_after_signup_issues_a_working_session() {
        let (app, _) = app();
        signup_jane(&app).await;

        let response = send(
            &app,
            post_form("/login", "_action=login&email=a%40b.com&password=Secret123", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
        let cookie = session_cookie(&response).unwrap();

        let response = send(&app, get("/home", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_unknown_email_is_rejected_without_cookie() {
        let (app, _) = app();

        let response = send(
            &app,
            post_form("/login", "_action=login&email=nobody%40b.com&password=Secret123", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&response).is_none());

        let body = body_json(response).await;
        assert_eq!(body["formError"], "Incorrect login credentials");
        assert_eq!(body["form"], "login");
    }

    #[tokio::test]
    async fn login_with_wrong_password_uses_the_same_message() {
        let (app, _) = app();
        signup_jane(&app).await;

        let response = send(
            &app,
            post_form("/login", "_formType=login&email=a%40b.com&password=Wrong1234", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&response).is_none());
        assert_eq!(body_json(response).await["formError"], "Incorrect login credentials");
    }

    #[tokio::test]
    async fn signup_with_registered_email_is_a_conflict() {
        let (app, _) = app();
        signup_jane(&app).await;

        let response = send(&app, post_form("/login", JANE_SIGNUP, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(session_cookie(&response).is_none());
        assert_eq!(
            body_json(response).await["formError"],
            "User already exists with that email"
        );
    }

    #[tokio::test]
    async fn invalid_fields_return_a_field_error_map() {
        let (app, _) = app();

        let response = send(
            &app,
            post_form(
                "/login",
                "_action=signup&email=nope&password=short&firstName=&lastName=Doe",
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert!(body["errors"]["email"].is_string());
        assert!(body["errors"]["password"].is_string());
        assert!(body["errors"]["firstName"].is_string());
        assert!(body["errors"].get("lastName").is_none());
        assert_eq!(body["fields"]["lastName"], "Doe");
        assert!(body["fields"].get("password").is_none());
    }

    #[tokio::test]
    async fn malformed_form_is_rejected() {
        let (app, _) = app();

        let response = send(&app, post_form("/login", "email=a%40b.com&password=Secret123", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["formError"], "Invalid Form Data");

        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["formError"], "Invalid Form Data");
    }

    #[tokio::test]
    async fn home_without_cookie_redirects_to_login() {
        let (app, _) = app();

        let response = send(&app, get("/home", None)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?redirectTo=%2Fhome");
    }

    #[tokio::test]
    async fn tampered_cookie_is_treated_as_logged_out() {
        let (app, _) = app();
        let cookie = signup_jane(&app).await;

        let mut tampered = cookie.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        let response = send(&app, get("/home", Some(&tampered))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?redirectTo=%2Fhome");
    }

    #[tokio::test]
    async fn session_for_deleted_user_forces_logout() {
        let (app, repo) = app();
        let cookie = signup_jane(&app).await;

        let user_id = {
            use crate::repositories::user::UserRepository;
            repo.find_by_email("a@b.com").await.unwrap().unwrap().id
        };
        repo.remove(user_id);

        let response = send(&app, get("/home", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?redirectTo=%2Fhome");
        let cleared = session_cookie(&response).unwrap();
        assert_eq!(cleared, "auth-session=");
        assert!(set_cookies(&response).join("\n").contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn store_failure_during_login_is_a_server_error() {
        for (failure, status) in STORE_FAILURES {
            let (app, _) = failing_app(failure);

            for body in ["_action=login&email=a%40b.com&password=Secret123", JANE_SIGNUP] {
                let response = send(&app, post_form("/login", body, None)).await;
                assert_eq!(response.status(), status);
                assert!(set_cookies(&response).is_empty());
                assert!(body_json(response).await["error"].is_string());
            }
        }
    }

    #[tokio::test]
    async fn store_failure_behind_a_valid_session_is_a_server_error() {
        for (failure, status) in STORE_FAILURES {
            let (app, cookie) = failing_app(failure);

            let response = send(&app, get("/home", Some(&cookie))).await;
            assert_eq!(response.status(), status);
            assert!(set_cookies(&response).is_empty());
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (app, _) = app();
        let cookie = signup_jane(&app).await;

        let first = send(&app, post_form("/logout", "", Some(&cookie))).await;
        let second = send(&app, post_form("/logout", "", None)).await;

        for response in [&first, &second] {
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(location(response), "/login");
            assert_eq!(session_cookie(response).as_deref(), Some("auth-session="));
            assert!(set_cookies(response).join("\n").contains("Max-Age=0"));
        }
    }

    #[tokio::test]
    async fn get_logout_redirects_home() {
        let (app, _) = app();

        let response = send(&app, get("/logout", None)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn login_page_redirects_logged_in_users() {
        let (app, _) = app();

        let response = send(&app, get("/login", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"_action\" value=\"login\""));

        let cookie = signup_jane(&app).await;
        let response = send(&app, get("/login", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn index_sends_logged_in_users_home() {
        let (app, _) = app();

        let response = send(&app, get("/", None)).await;
        assert_eq!(location(&response), "/login?redirectTo=%2F");

        let cookie = signup_jane(&app).await;
        let response = send(&app, get("/", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/home");
    }

    #[tokio::test]
    async fn local_redirect_target_is_followed_after_login() {
        let (app, _) = app();
        signup_jane(&app).await;

        let response = send(
            &app,
            post_form(
                "/login",
                "_action=login&email=a%40b.com&password=Secret123&redirectTo=%2Fhome",
                None,
            ),
        )
        .await;
        assert_eq!(location(&response), "/home");

        let response = send(
            &app,
            post_form(
                "/login",
                "_action=login&email=a%40b.com&password=Secret123&redirectTo=%2F%2Fevil.example",
                None,
            ),
        )
        .await;
        assert_eq!(location(&response), "/");
    }
}
