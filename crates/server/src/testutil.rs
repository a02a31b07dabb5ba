//! Shared router-test plumbing: a seeded in-memory application, token
//! minting for seeded principals, and a oneshot request helper.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use jansetu_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use jansetu_db::fixtures::{self, SeedDataset};
use jansetu_db::repositories::{AdminLogin, IdentityStore, SqlIdentityStore, UserLogin};
use jansetu_db::{connect_with_settings, migrations, DbPool};

use crate::bootstrap::{app_router, build_state};

pub const SUPERADMIN_CODE: &str = "setu-elevate-9";

pub async fn setup() -> (axum::Router, DbPool) {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    SeedDataset::load(&pool).await.expect("seed");

    let config = AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            superadmin_code: Some(SUPERADMIN_CODE.to_string()),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })
    .expect("config");

    let state = build_state(pool.clone(), &config);
    (app_router(state, pool.clone()), pool)
}

pub async fn user_token(pool: &DbPool, email: &str) -> String {
    let store = SqlIdentityStore::new(pool.clone(), 24);
    store
        .login_user(UserLogin {
            email: Some(email.to_string()),
            mobile: None,
            aadhaar: None,
            password: fixtures::SEED_PASSWORD.to_string(),
        })
        .await
        .expect("user login")
        .token
}

pub async fn admin_token(pool: &DbPool, admin_id: &str) -> String {
    let store = SqlIdentityStore::new(pool.clone(), 24);
    store
        .login_admin(AdminLogin {
            admin_id: Some(admin_id.to_string()),
            email: None,
            password: fixtures::SEED_PASSWORD.to_string(),
        })
        .await
        .expect("admin login")
        .token
}

pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn send(
    router: &axum::Router,
    req: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(req).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
