use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    app_state::SharedState,
    http_error::{ApiJson, ApiResult, HttpError},
    schema::{ErrorResponse, MessageResponse},
    session::{is_logged_in, removal_cookie, session_cookie, SESSION_COOKIE},
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/status", get(status))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthStatusResponse {
    pub success: bool,
    pub logged_in: bool,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, body = MessageResponse),
        (status = 401, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state, jar, request))]
pub async fn login(
    State(app_state): State<SharedState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    if !app_state.check_admin_password(&request.password) {
        warn!("failed admin login");
        return Err(HttpError::new(
            axum::http::StatusCode::UNAUTHORIZED,
            "Invalid password",
        ));
    }
    let token = app_state.sessions.create();
    let cookie = session_cookie(&token)?;
    info!("admin logged in");
    Ok((
        jar.add(cookie),
        Json(MessageResponse::new("Login successful")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, body = MessageResponse)),
)]
#[tracing::instrument(skip(app_state, jar))]
pub async fn logout(
    State(app_state): State<SharedState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        app_state.sessions.remove(cookie.value());
    }
    (
        jar.remove(removal_cookie()),
        Json(MessageResponse::new("Logout successful")),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/status",
    responses((status = 200, body = AuthStatusResponse)),
)]
#[tracing::instrument(skip(app_state, jar))]
pub async fn status(
    State(app_state): State<SharedState>,
    jar: CookieJar,
) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        success: true,
        logged_in: is_logged_in(&jar, &app_state),
    })
}
