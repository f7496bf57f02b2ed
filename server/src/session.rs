use std::collections::HashMap;
use std::sync::RwLock;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};

use galleria_core::GalleryError;

use crate::{app_state::SharedState, http_error::HttpError};

pub const SESSION_COOKIE: &str = "galleria_session";

pub const SESSION_TTL_HOURS: i64 = 24 * 7;

/// Live admin session tokens and when they expire. Kept in memory only,
/// a restart logs everyone out.
#[derive(Debug, Default)]
pub struct SessionStore {
    tokens: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    /// Starts a session. Expired sessions are dropped on the way.
    pub fn create(&self) -> String {
        self.create_at(Utc::now())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.contains_at(token, Utc::now())
    }

    fn create_at(&self, now: DateTime<Utc>) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut tokens = self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tokens.retain(|_, expires_at| *expires_at > now);
        tokens.insert(token.clone(), now + Duration::hours(SESSION_TTL_HOURS));
        token
    }

    fn contains_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .is_some_and(|expires_at| *expires_at > now)
    }

    pub fn remove(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(token);
    }
}

/// Session cookie that the browser drops together with the server side session.
pub fn session_cookie(token: &str) -> Result<Cookie<'static>, HttpError> {
    let max_age = Duration::hours(SESSION_TTL_HOURS).num_seconds();
    Cookie::parse(format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    ))
    .map_err(|err| {
        HttpError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("error building session cookie: {err}"),
        )
    })
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

pub fn is_logged_in(jar: &CookieJar, state: &SharedState) -> bool {
    jar.get(SESSION_COOKIE)
        .map(|cookie| state.sessions.contains(cookie.value()))
        .unwrap_or(false)
}

/// Extractor for handlers that require a logged in admin.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

#[async_trait]
impl FromRequestParts<SharedState> for AdminSession {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        if is_logged_in(&jar, state) {
            Ok(AdminSession)
        } else {
            Err(GalleryError::AuthRequired.into())
        }
    }
}
