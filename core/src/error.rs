use crate::media::MediaError;

/// Failure categories of gallery operations.
///
/// Every variant maps to exactly one HTTP status in the server crate.
#[derive(thiserror::Error, Debug)]
pub enum GalleryError {
    #[error("{0}")]
    Validation(String),
    #[error("Collection with name '{0}' already exists")]
    DuplicateName(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Admin authentication required")]
    AuthRequired,
    #[error("media store error: {0}")]
    RemoteStore(#[from] MediaError),
    #[error(transparent)]
    Persistence(#[from] eyre::Report),
}

impl GalleryError {
    pub fn validation(msg: impl Into<String>) -> GalleryError {
        GalleryError::Validation(msg.into())
    }
}

impl From<diesel::result::Error> for GalleryError {
    fn from(err: diesel::result::Error) -> Self {
        GalleryError::Persistence(eyre::Report::new(err))
    }
}

pub type GalleryResult<T> = Result<T, GalleryError>;
