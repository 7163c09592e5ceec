pub mod entities;
pub mod value_objects;

pub use dispatch_errors::{DispatchError, DispatchResult};
pub use entities::*;
pub use value_objects::*;
