//! Test helpers for database-backed integration tests
//!
//! NOTE: Creating full teloxide Message objects is complex and brittle
//! between versions, so the tests here drive the dialogue state machine and
//! the store directly instead of going through the dispatcher. The handler
//! layer around them only renders replies and resolves display handles.

#![allow(dead_code)]

use std::sync::Arc;

use domofon::storage::{create_pool, DbPool};
use tempfile::TempDir;

/// Telegram user ids used across the test files.
pub const USER_A: i64 = 111_111_111;
pub const USER_B: i64 = 222_222_222;

/// Creates a pool over a fresh database file in a temp directory.
///
/// The `TempDir` must be kept alive for the duration of the test; dropping
/// it deletes the database file.
pub fn make_test_pool() -> (Arc<DbPool>, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("residents.db");
    let pool = create_pool(path.to_str().expect("temp path is valid utf-8")).expect("failed to create pool");
    (Arc::new(pool), dir)
}
