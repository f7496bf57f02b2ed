use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use galleria_core::GalleryError;

use crate::schema::ErrorResponse;

/// An error response in the `{"success": false, "error": ...}` envelope.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HttpError {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<GalleryError> for HttpError {
    fn from(err: GalleryError) -> Self {
        let status = match &err {
            GalleryError::Validation(_) => StatusCode::BAD_REQUEST,
            GalleryError::DuplicateName(_) => StatusCode::CONFLICT,
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::AuthRequired => StatusCode::UNAUTHORIZED,
            GalleryError::RemoteStore(_) | GalleryError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {:?}", err);
        }
        HttpError::new(status, err.to_string())
    }
}

impl From<eyre::Report> for HttpError {
    fn from(err: eyre::Report) -> Self {
        GalleryError::Persistence(err).into()
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        HttpError::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for HttpError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpError::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for HttpError {
    fn from(err: MultipartError) -> Self {
        HttpError::new(err.status(), err.body_text())
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

pub type ApiResult<T> = Result<T, HttpError>;

/// `axum::Json` whose rejection is reported in the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(HttpError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` whose rejection is reported in the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(HttpError))]
pub struct ApiQuery<T>(pub T);
