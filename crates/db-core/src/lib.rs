mod builder;
mod error;
mod schema;

pub use builder::{Database, DatabaseBuilder};
pub use error::Error;

pub use libsql;
