pub mod config;
pub mod error;
pub mod loader;
pub mod mysql;
pub mod parser;
pub mod schema;
pub mod utility;
