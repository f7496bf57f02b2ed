mod collection;
mod photo;
mod remote_op;

pub use collection::*;
pub use photo::*;
pub use remote_op::*;
