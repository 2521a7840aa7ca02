//! Output store schema and creation

pub mod init;
pub mod schema;

pub use init::*;
pub use schema::*;
