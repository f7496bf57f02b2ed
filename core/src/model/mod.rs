pub mod repository;

mod collection;
mod id_types;
mod photo;
mod remote_op;
pub use collection::*;
pub use id_types::*;
pub use photo::*;
pub use remote_op::*;

pub(crate) mod util;
