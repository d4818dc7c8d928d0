//! Integration tests for the resident store across pool lifecycles

mod common;

use common::helpers::{make_test_pool, USER_A, USER_B};
use domofon::storage::db::{get_all_residents, get_resident, get_residents_by_apartment, upsert_resident};
use domofon::storage::{create_pool, get_connection};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn records_survive_pool_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("residents.db");

    {
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_resident(&conn, USER_A, 5, "+79991234567").unwrap();
    }

    let pool = create_pool(path.to_str().unwrap()).unwrap();
    let conn = get_connection(&pool).unwrap();
    let resident = get_resident(&conn, USER_A).unwrap().expect("record must survive reopen");
    assert_eq!(resident.apartment_number, 5);
    assert_eq!(resident.phone_number.as_deref(), Some("+79991234567"));
}

#[test]
fn legacy_two_column_database_is_migrated_additively() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.db");

    // A database written by the version that predates the phone column
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(
            "CREATE TABLE apartments (user_id INTEGER PRIMARY KEY, apartment_number INTEGER)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO apartments (user_id, apartment_number) VALUES (?1, ?2)",
            rusqlite::params![USER_A, 8],
        )
        .unwrap();
    }

    let pool = create_pool(path.to_str().unwrap()).unwrap();
    let conn = get_connection(&pool).unwrap();

    // Legacy row is intact, phone reads back as NULL
    let resident = get_resident(&conn, USER_A).unwrap().expect("legacy row must survive");
    assert_eq!(resident.apartment_number, 8);
    assert_eq!(resident.phone_number, None);

    // New registrations through the migrated schema work normally
    upsert_resident(&conn, USER_B, 8, "1234567890").unwrap();
    let residents = get_residents_by_apartment(&conn, 8).unwrap();
    assert_eq!(residents.len(), 2);
}

#[test]
fn full_listing_is_ordered_and_idempotent() {
    let (pool, _dir) = make_test_pool();
    let conn = get_connection(&pool).unwrap();

    upsert_resident(&conn, USER_A, 20, "+79991234567").unwrap();
    upsert_resident(&conn, USER_B, 3, "+79997654321").unwrap();

    let first = get_all_residents(&conn).unwrap();
    let apartments: Vec<i64> = first.iter().map(|r| r.apartment_number).collect();
    assert_eq!(apartments, vec![3, 20], "sorted ascending by apartment number");

    // No intervening writes: two listings must be identical
    let second = get_all_residents(&conn).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_store_is_a_valid_result() {
    let (pool, _dir) = make_test_pool();
    let conn = get_connection(&pool).unwrap();

    assert!(get_all_residents(&conn).unwrap().is_empty());
    assert!(get_residents_by_apartment(&conn, 1).unwrap().is_empty());
    assert!(get_resident(&conn, USER_A).unwrap().is_none());
}

#[test]
fn connections_from_the_pool_share_one_database() {
    let (pool, _dir) = make_test_pool();

    {
        let conn = get_connection(&pool).unwrap();
        upsert_resident(&conn, USER_A, 5, "+79991234567").unwrap();
    }

    // A different pooled connection sees the write
    let conn = get_connection(&pool).unwrap();
    let resident = get_resident(&conn, USER_A).unwrap();
    assert!(resident.is_some());
}
