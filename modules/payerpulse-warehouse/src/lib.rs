pub mod error;
pub mod loader;
pub mod schema;

pub use error::{LoadError, Result};
pub use loader::WarehouseLoader;
