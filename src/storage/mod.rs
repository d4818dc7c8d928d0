//! Database storage for the resident directory

pub mod db;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool, Resident};
