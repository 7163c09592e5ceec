pub mod app_config;
pub mod dispatcher;
pub mod fleet;
pub mod observability;

pub use app_config::*;
pub use dispatcher::*;
pub use fleet::*;
pub use observability::*;
