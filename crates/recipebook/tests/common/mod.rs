//! Test utilities and common setup.
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use recipebook::api::{self, AppState};
use recipebook::auth::{AuthConfig, AuthState, DeploymentMode, FixedClock, PasswordHasher};
use recipebook::db::Database;
use recipebook::recipe::RecipeRepository;
use recipebook::user::{UserRepository, UserService};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Fixed start time for the token clock.
pub const NOW: i64 = 1_700_000_000;

pub const MULTIPART_BOUNDARY: &str = "recipebook-test-boundary";

/// A router wired to an in-memory database, a temp upload directory and a
/// hand-driven clock.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<FixedClock>,
    pub public_dir: TempDir,
}

/// Create a test AuthConfig with fixed secrets.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        mode: DeploymentMode::Development,
        access_token_secret: Some("integration-access-secret-0123456789abcdef".to_string()),
        refresh_token_secret: Some("integration-refresh-secret-0123456789abcdef".to_string()),
        bcrypt_cost: 4,
        ..AuthConfig::default()
    }
}

pub async fn test_app() -> TestApp {
    let clock = Arc::new(FixedClock::new(NOW));
    let auth = AuthState::new(test_auth_config())
        .expect("valid test auth config")
        .with_clock(clock.clone());

    let db = Database::in_memory().await.expect("in-memory database");
    let users = UserService::new(
        UserRepository::new(db.pool().clone()),
        PasswordHasher::new(4).expect("bcrypt cost 4"),
    );
    let recipes = RecipeRepository::new(db.pool().clone());

    let public_dir = tempfile::tempdir().expect("temp public dir");
    let state = AppState::new(auth, users, recipes, public_dir.path().to_path_buf());

    TestApp {
        router: api::create_router(state),
        clock,
        public_dir,
    }
}

/// Response pieces the tests care about.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// `name=value` pairs from every `Set-Cookie` header.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().expect("ascii cookie").to_string())
            .collect()
    }

    /// Value of the named cookie as set by this response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies().into_iter().find_map(|line| {
            let pair = line.split(';').next()?;
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name == name).then(|| value.to_string())
        })
    }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// One multipart part: either a text field or a file.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>], cookie: Option<&str>) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn register(app: &TestApp, email: &str, password: &str) -> TestResponse {
    send(
        app,
        json_request(
            Method::POST,
            "/auth/register",
            serde_json::json!({"email": email, "password": password}),
            None,
        ),
    )
    .await
}

pub async fn login(app: &TestApp, email: &str, password: &str) -> TestResponse {
    send(
        app,
        json_request(
            Method::POST,
            "/auth/login",
            serde_json::json!({"email": email, "password": password}),
            None,
        ),
    )
    .await
}

/// Register, log in and return a `Cookie` header value carrying the
/// access token.
pub async fn access_cookie_for(app: &TestApp, email: &str, password: &str) -> String {
    let registered = register(app, email, password).await;
    assert_eq!(registered.status, StatusCode::OK);

    let logged_in = login(app, email, password).await;
    assert_eq!(logged_in.status, StatusCode::OK);

    let token = logged_in.cookie("access_token").expect("access cookie");
    format!("access_token={token}")
}
