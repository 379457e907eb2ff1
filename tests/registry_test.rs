//! Integration tests for the connection registry.
//!
//! These tests verify get-or-create registration, reuse of existing handles
//! and the failure modes of `open`, all against SQLite.

use dbtrans::db::{ConnectionRegistry, DEFAULT_MAX_CONNECTIONS};
use dbtrans::error::DbError;
use dbtrans::models::DriverKind;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_open_registers_handle() {
    let registry = ConnectionRegistry::new();
    let conn = registry.open("sqlite3", ":memory:", 5).await.unwrap();

    assert_eq!(conn.driver_id(), "sqlite3");
    assert!(registry.is_registered("sqlite3").await);
    assert_eq!(registry.len().await, 1);

    let handle = conn.handle().await.unwrap();
    assert_eq!(handle.kind(), DriverKind::SQLite);
    assert_eq!(handle.max_connections(), 5);
}

#[tokio::test]
async fn test_open_twice_returns_same_handle() {
    let registry = ConnectionRegistry::new();
    let first = registry.open("sqlite3", ":memory:", 5).await.unwrap();
    let second = registry.open("sqlite3", ":memory:", 5).await.unwrap();

    let a = first.handle().await.unwrap();
    let b = second.handle().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len().await, 1);

    // Data written through one reference is visible through the other
    first.exec("CREATE TABLE t(a INT)", &[]).await.unwrap();
    first.exec("INSERT INTO t VALUES (1)", &[]).await.unwrap();
    let columns = second.query_fetch("SELECT a FROM t", &[]).await.unwrap();
    assert_eq!(columns[0].values, vec!["1"]);
}

#[tokio::test]
async fn test_second_open_ignores_new_arguments() {
    let registry = ConnectionRegistry::new();
    registry.open("sqlite3", ":memory:", 2).await.unwrap();
    let conn = registry
        .open("sqlite3", "/this/path/is/never/used.db", 9)
        .await
        .unwrap();

    let handle = conn.handle().await.unwrap();
    assert_eq!(handle.max_connections(), 2);
}

#[tokio::test]
async fn test_open_zero_pool_size_uses_default() {
    let registry = ConnectionRegistry::new();
    let conn = registry.open("sqlite", ":memory:", 0).await.unwrap();
    let handle = conn.handle().await.unwrap();
    assert_eq!(handle.max_connections(), DEFAULT_MAX_CONNECTIONS);
}

#[tokio::test]
async fn test_open_unknown_driver() {
    let registry = ConnectionRegistry::new();
    let result = registry.open("oracle", "scott/tiger", 1).await;

    assert!(matches!(result, Err(DbError::Connection { .. })));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_open_unreachable_sqlite_path() {
    let registry = ConnectionRegistry::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing_dir").join("nested").join("db.sqlite");

    let result = registry
        .open("sqlite3", path.to_str().unwrap(), 1)
        .await;

    assert!(matches!(result, Err(DbError::Connection { .. })));
    assert!(!registry.is_registered("sqlite3").await);
}

#[tokio::test]
async fn test_failed_open_then_successful_open() {
    let registry = ConnectionRegistry::new();
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("nope").join("db.sqlite");

    assert!(registry.open("sqlite3", bad.to_str().unwrap(), 1).await.is_err());
    assert!(registry.open("sqlite3", ":memory:", 1).await.is_ok());
    assert!(registry.is_registered("sqlite3").await);
}

#[tokio::test]
async fn test_distinct_identifiers_get_distinct_handles() {
    let registry = ConnectionRegistry::new();
    let one = registry.open("sqlite3", ":memory:", 1).await.unwrap();
    let two = registry.open("sqlite", ":memory:", 1).await.unwrap();

    let a = one.handle().await.unwrap();
    let b = two.handle().await.unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(
        registry.drivers().await,
        vec!["sqlite".to_string(), "sqlite3".to_string()]
    );

    // Each :memory: identifier is its own database
    one.exec("CREATE TABLE only_here(a INT)", &[]).await.unwrap();
    let err = two
        .query_fetch("SELECT a FROM only_here", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Execution { .. }));
}

#[tokio::test]
async fn test_lookup_before_open() {
    let registry = ConnectionRegistry::new();
    let result = registry.lookup("postgres").await;
    assert!(matches!(result, Err(DbError::NotRegistered { .. })));
}

#[tokio::test]
async fn test_cloned_registry_shares_handles() {
    let registry = ConnectionRegistry::new();
    let clone = registry.clone();
    registry.open("sqlite3", ":memory:", 1).await.unwrap();

    assert!(clone.is_registered("sqlite3").await);
    let a = registry.lookup("sqlite3").await.unwrap();
    let b = clone.lookup("sqlite3").await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_open_registers_one_handle() {
    let registry = ConnectionRegistry::new();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.open("sqlite3", ":memory:", 2).await })
        })
        .collect();

    let mut refs = Vec::new();
    for task in tasks {
        refs.push(task.await.unwrap().unwrap());
    }

    assert_eq!(registry.len().await, 1);
    let registered = registry.lookup("sqlite3").await.unwrap();
    for conn in &refs {
        let handle = conn.handle().await.unwrap();
        assert!(Arc::ptr_eq(&handle, &registered));
    }

    // The surviving handle is usable
    refs[0].exec("CREATE TABLE t(a INT)", &[]).await.unwrap();
    refs[7].exec("INSERT INTO t VALUES (3)", &[]).await.unwrap();
    let columns = refs[3].query_fetch("SELECT a FROM t", &[]).await.unwrap();
    assert_eq!(columns[0].values, vec!["3"]);
}
