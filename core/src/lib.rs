pub mod catalog;
pub mod config;
pub mod error;
pub mod media;
pub mod model;
pub use deadpool_diesel;
pub use error::GalleryError;
