use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::MakeRequestUuid,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::error;

use crate::{app_state::SharedState, http_error::HttpError};

pub mod app_state;
pub mod http_error;
pub mod openapi;
pub mod routes;
pub mod schema;
pub mod session;

/// Builds the complete application: the JSON api under `/api`, local media
/// blobs under `/media` when configured, and envelope responses for unknown
/// routes and panics.
pub fn app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(AnyOrigin);
    let mut router = Router::new().nest("/api", routes::api_router());
    if let Some(media_root) = &state.media_root {
        router = router.nest_service("/media", ServeDir::new(media_root));
    }
    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(true))
                        .on_response(DefaultOnResponse::new().include_headers(true)),
                )
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "Not found")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!("handler panicked: {}", details);
    HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
