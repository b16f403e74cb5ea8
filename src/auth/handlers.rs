use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info, instrument};

use crate::{
    auth::{
        dto::{DashboardView, LoginRequest, RegisterRequest},
        guards::{CurrentUser, RequireAuth},
        services::{authenticate, register, start_session},
    },
    error::{AppError, FormError},
    render::render_page,
    state::AppState,
    web::{ApiResponse, Payload, ResponseFormat},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/login", get(login_page).post(login))
        .route("/users/register", get(register_page).post(register_user))
        .route("/users/logout", get(logout))
        .route("/users/check-auth", get(check_auth))
        .route("/users/dashboard", get(dashboard))
}

pub async fn home(CurrentUser(user): CurrentUser) -> Redirect {
    match user {
        Some(_) => Redirect::to("/users/dashboard"),
        None => Redirect::to("/users/login"),
    }
}

async fn login_page(State(state): State<AppState>) -> Result<Response, FormError> {
    Ok(render_page(state.renderer.as_ref(), "login", "Login", &json!({}))?.into_response())
}

async fn register_page(State(state): State<AppState>) -> Result<Response, FormError> {
    Ok(render_page(state.renderer.as_ref(), "register", "Register", &json!({}))?.into_response())
}

#[instrument(skip(state, session, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    format: ResponseFormat,
    session: Session,
    Payload(payload): Payload<LoginRequest>,
) -> Response {
    let user = match authenticate(state.users.as_ref(), &payload).await {
        Ok(user) => user,
        Err(e) => return format.error(e),
    };

    let identity = match start_session(&session, &user).await {
        Ok(identity) => identity,
        Err(e) => return format.error(AppError::from(e)),
    };

    match format {
        ResponseFormat::Json => ApiResponse::success("Login successful")
            .with_user(Some(identity))
            .into_response(),
        ResponseFormat::Html => Redirect::to("/users/dashboard").into_response(),
    }
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register_user(
    State(state): State<AppState>,
    format: ResponseFormat,
    Payload(payload): Payload<RegisterRequest>,
) -> Response {
    if let Err(e) = register(state.users.as_ref(), payload).await {
        return format.error(e);
    }

    match format {
        ResponseFormat::Json => (
            StatusCode::CREATED,
            ApiResponse::success("Registration successful"),
        )
            .into_response(),
        ResponseFormat::Html => Redirect::to("/users/login").into_response(),
    }
}

#[instrument(skip(session))]
pub async fn logout(format: ResponseFormat, session: Session) -> Response {
    if let Err(e) = session.flush().await {
        error!(error = %e, "session flush failed");
        return format.error(AppError::Internal {
            context: "Could not log out",
            reason: e.into(),
        });
    }

    info!("user logged out");
    match format {
        ResponseFormat::Json => ApiResponse::success("Logged out successfully").into_response(),
        ResponseFormat::Html => Redirect::to("/users/login").into_response(),
    }
}

pub async fn check_auth(CurrentUser(user): CurrentUser) -> ApiResponse {
    ApiResponse::empty()
        .with_authenticated(user.is_some())
        .with_user(user)
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn dashboard(
    State(state): State<AppState>,
    format: ResponseFormat,
    RequireAuth(user): RequireAuth,
) -> Result<Response, FormError> {
    let view = DashboardView::from(&user);
    match format {
        ResponseFormat::Json => Ok(ApiResponse::ok(view).into_response()),
        ResponseFormat::Html => {
            Ok(render_page(state.renderer.as_ref(), "dashboard", "Dashboard", &view)?.into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };

    use crate::{
        auth::repo_types::Role,
        testing::{body_json, body_text, get, get_json, post_form, post_json, TestApp},
    };

    #[tokio::test]
    async fn register_twice_with_same_username() {
        let app = TestApp::new();
        let body = r#"{"username":"erin","password":"pw","repeatPassword":"pw"}"#;

        let first = app.send(post_json("/users/register", body)).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(body_json(first).await["message"], "Registration successful");

        let second = app.send(post_json("/users/register", body)).await;
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        let json = body_json(second).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Username already exists");
    }

    #[tokio::test]
    async fn register_accepts_short_and_email_usernames() {
        let app = TestApp::new();
        for name in ["jo", "ann@example.com"] {
            let body = format!(r#"{{"username":"{name}","password":"pw","repeatPassword":"pw"}}"#);
            let res = app.send(post_json("/users/register", &body)).await;
            assert_eq!(res.status(), StatusCode::CREATED, "{name}");
        }
    }

    #[tokio::test]
    async fn register_ignores_a_client_supplied_role() {
        let app = TestApp::new();
        let res = app
            .send(post_json(
                "/users/register",
                r#"{"username":"mallory","password":"pw","repeatPassword":"pw","role":"admin"}"#,
            ))
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let cookie = app.login("mallory", "pw").await;
        let res = app.send(get_json("/users/check-auth", Some(&cookie))).await;
        assert_eq!(body_json(res).await["user"]["role"], "customer");
    }

    #[tokio::test]
    async fn register_form_redirects_to_login() {
        let app = TestApp::new();
        let res = app
            .send(post_form(
                "/users/register",
                "username=frank&password=pw&repeatPassword=pw",
                None,
            ))
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/users/login");
    }

    #[tokio::test]
    async fn password_mismatch_is_reported_inline_for_forms() {
        let app = TestApp::new();
        let res = app
            .send(post_form(
                "/users/register",
                "username=gina&password=a&repeatPassword=b",
                None,
            ))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(res).await, "Passwords do not match");
    }

    #[tokio::test]
    async fn login_establishes_session_with_stored_role() {
        let app = TestApp::new();
        app.users.seed("root", "toor", Role::Admin).await;

        let res = app
            .send(post_json("/users/login", r#"{"username":"root","password":"toor"}"#))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = crate::testing::session_cookie(&res).expect("session cookie");
        let json = body_json(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["user"]["role"], "admin");
        assert_eq!(json["user"]["username"], "root");

        let res = app.send(get_json("/users/check-auth", Some(&cookie))).await;
        let json = body_json(res).await;
        assert_eq!(json["authenticated"], true);
        assert_eq!(json["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn unreadable_login_body_is_answered_in_the_negotiated_format() {
        let app = TestApp::new();
        let login = |accept: Option<&'static str>| {
            let mut req = Request::builder()
                .method("POST")
                .uri("/users/login")
                .header(header::CONTENT_TYPE, "text/plain");
            if let Some(accept) = accept {
                req = req.header(header::ACCEPT, accept);
            }
            req.body(Body::from("username=root")).unwrap()
        };

        let res = app.send(login(None)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(serde_json::from_str::<serde_json::Value>(&body_text(res).await).is_err());

        let res = app.send(login(Some("application/json"))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["success"], false);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_generic() {
        let app = TestApp::new();
        app.users.seed("henry", "right", Role::Customer).await;

        let res = app
            .send(post_json("/users/login", r#"{"username":"henry","password":"wrong"}"#))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(crate::testing::session_cookie(&res).is_none());
        let json = body_json(res).await;
        assert_eq!(json["message"], "Invalid username or password");

        let res = app
            .send(post_form("/users/login", "username=henry&password=wrong", None))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(res).await, "Invalid username or password");
    }

    #[tokio::test]
    async fn form_login_redirects_to_dashboard() {
        let app = TestApp::new();
        app.users.seed("ivy", "pw", Role::Customer).await;

        let res = app
            .send(post_form("/users/login", "username=ivy&password=pw", None))
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/users/dashboard");
    }

    #[tokio::test]
    async fn check_auth_without_session() {
        let app = TestApp::new();
        let res = app.send(get("/users/check-auth", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["authenticated"], false);
        assert!(json.get("user").is_none());
    }

    #[tokio::test]
    async fn logout_destroys_the_session() {
        let app = TestApp::new();
        app.users.seed("jack", "pw", Role::Customer).await;
        let cookie = app.login("jack", "pw").await;

        let res = app.send(get_json("/users/logout", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["message"], "Logged out successfully");

        let res = app.send(get_json("/users/check-auth", Some(&cookie))).await;
        assert_eq!(body_json(res).await["authenticated"], false);
    }

    #[tokio::test]
    async fn dashboard_requires_login() {
        let app = TestApp::new();
        let res = app.send(get("/users/dashboard", None)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/users/login");

        let res = app.send(get_json("/users/dashboard", None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dashboard_shows_role() {
        let app = TestApp::new();
        app.users.seed("kate", "pw", Role::Admin).await;
        let cookie = app.login("kate", "pw").await;

        let res = app.send(get_json("/users/dashboard", Some(&cookie))).await;
        let json = body_json(res).await;
        assert_eq!(json["data"]["username"], "kate");
        assert_eq!(json["data"]["isAdmin"], true);

        let res = app.send(get("/users/dashboard", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("data-view=\"dashboard\""));
    }

    #[tokio::test]
    async fn root_redirects_by_session() {
        let app = TestApp::new();
        let res = app.send(get("/", None)).await;
        assert_eq!(res.headers()[header::LOCATION], "/users/login");

        app.users.seed("leo", "pw", Role::Customer).await;
        let cookie = app.login("leo", "pw").await;
        let res = app.send(get("/", Some(&cookie))).await;
        assert_eq!(res.headers()[header::LOCATION], "/users/dashboard");
    }
}
