//! 认证中间件
//!
//! Resolves one credential per request and runs the guard chain for the
//! route's policy. On success the [`Principal`] is attached to the request
//! extensions, where handlers extract it by type.

use crate::{
    auth::{
        guard::{AccessPolicy, GuardChain},
        identity::Principal,
    },
    error::AppError,
};
use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use std::{collections::HashMap, sync::Arc};

const HEADER_NAMES: [&str; 2] = ["authorization", "x-access-token"];
const QUERY_NAMES: [&str; 3] = ["authorization", "access_token", "token"];
const COOKIE_NAMES: [&str; 3] = ["authToken", "token", "access_token"];

// 实现 FromRequestParts 以便在 handler 中直接提取 Principal
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Trims the value and drops a leading `Bearer` scheme (any case).
fn normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let token = match raw.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &raw[6..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                raw
            }
        }
        _ => raw,
    };

    (!token.is_empty()).then(|| token.to_string())
}

fn from_headers(headers: &HeaderMap) -> Option<String> {
    HEADER_NAMES.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(normalize)
    })
}

fn from_query(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    QUERY_NAMES
        .iter()
        .find_map(|name| params.get(*name).and_then(|v| normalize(v)))
}

fn from_cookies(headers: &HeaderMap) -> Option<String> {
    let cookies: HashMap<&str, &str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    COOKIE_NAMES
        .iter()
        .find_map(|name| cookies.get(name).and_then(|v| normalize(v)))
}

/// Resolves the request's credential: header, then query, then cookie.
pub fn extract_credential(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    from_headers(headers)
        .or_else(|| from_query(uri))
        .or_else(|| from_cookies(headers))
}

/// Middleware state: the shared chain plus the policy of the routes it wraps.
#[derive(Clone)]
pub struct RouteGuard {
    chain: Arc<GuardChain>,
    policy: Arc<AccessPolicy>,
}

impl RouteGuard {
    pub fn new(chain: Arc<GuardChain>, policy: AccessPolicy) -> Self {
        Self {
            chain,
            policy: Arc::new(policy),
        }
    }
}

/// 访问控制中间件
pub async fn guard_middleware(
    State(guard): State<RouteGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = extract_credential(req.headers(), req.uri());

    if let Some(principal) = guard
        .chain
        .authorize(credential.as_deref(), &guard.policy)
        .await?
    {
        req.extensions_mut().insert(principal);
    }

    Ok(next.run(req).await)
}
