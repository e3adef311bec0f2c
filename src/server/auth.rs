//! Optional shared-passcode gate. When enabled, every request outside the
//! public paths must carry the auth cookie.

use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{PasscodeConfig, AUTH_COOKIE_MAX_AGE, AUTH_COOKIE_VALUE};
use crate::server::app::AppState;

const PUBLIC_PATHS: &[&str] = &["/health", "/api/auth"];

#[derive(Deserialize)]
pub struct LoginRequest {
    pub passcode: Option<String>,
}

/// Value of cookie `name` in the request's `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Exact match, or a sub-path of a public prefix.
fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path == *public
            || path
                .strip_prefix(public)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn is_authenticated(config: &PasscodeConfig, headers: &HeaderMap) -> bool {
    cookie_value(headers, &config.cookie_name) == Some(AUTH_COOKIE_VALUE)
}

pub async fn require_passcode(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let config = &state.passcode;
    if !config.enabled {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if is_public(path) {
        return next.run(request).await;
    }

    if !is_authenticated(config, request.headers()) {
        debug!("Rejecting unauthenticated request to {}", path);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required", "kind": "unauthorized" })),
        )
            .into_response();
    }

    next.run(request).await
}

fn auth_cookie(config: &PasscodeConfig, value: &str, max_age: u64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        config.cookie_name, value, max_age
    ))
    .ok()
}

fn with_cookie(cookie: Option<HeaderValue>) -> Response {
    let mut response = Json(json!({ "success": true })).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> Response {
    let config = &state.passcode;
    if !config.enabled {
        return Json(json!({ "success": true })).into_response();
    }

    let Some(passcode) = payload.passcode.filter(|value| !value.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Passcode is required" })),
        )
            .into_response();
    };

    if !config.verify(&passcode) {
        warn!("Rejected login with invalid passcode");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid passcode" })),
        )
            .into_response();
    }

    with_cookie(auth_cookie(config, AUTH_COOKIE_VALUE, AUTH_COOKIE_MAX_AGE))
}

pub async fn logout(State(state): State<AppState>) -> Response {
    with_cookie(auth_cookie(&state.passcode, "", 0))
}
