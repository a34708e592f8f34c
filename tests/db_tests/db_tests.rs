//! Tests for Db
//!
//! These tests verify:
//! - Basic get/set/delete operations on both engines
//! - Validation of keys and values
//! - Buffered and synced durability
//! - Persistence across reopen
//! - Lifecycle (close, use after close)
//! - Concurrent access

use std::sync::Arc;
use std::thread;

use bedrock_kv::config::Config;
use bedrock_kv::engine::{Durability, MemoryEngine, RedbEngine};
use bedrock_kv::{validate, Db, KvError};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Helper Functions
// =============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn test_config(dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(dir.path())
        .name("test")
        .report_stats(false)
        .build()
}

fn setup_temp_db() -> (TempDir, Db<RedbEngine>) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let db = Db::open(test_config(&temp_dir)).unwrap();
    (temp_dir, db)
}

fn setup_memory_db() -> Db<MemoryEngine> {
    init_tracing();
    Db::with_engine(
        MemoryEngine::new(),
        Config::builder().name("mem").report_stats(false).build(),
    )
    .unwrap()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_db_open_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("dir");

    let config = Config::builder()
        .data_dir(&data_dir)
        .name("mydb")
        .report_stats(false)
        .build();
    let db: Db<RedbEngine> = Db::open(config).unwrap();

    assert!(data_dir.join("mydb.db").exists());
    assert_eq!(db.path(), data_dir.join("mydb.db"));
    assert_eq!(db.name(), "mydb");
}

#[test]
fn test_db_set_get() {
    let (_temp, db) = setup_temp_db();

    db.set(b"hello", b"world").unwrap();

    assert_eq!(db.get(b"hello").unwrap(), Some(b"world".to_vec()));
}

#[test]
fn test_db_get_nonexistent_key() {
    let (_temp, db) = setup_temp_db();

    assert_eq!(db.get(b"nonexistent").unwrap(), None);
    assert!(!db.has(b"nonexistent").unwrap());
}

#[test]
fn test_db_has() {
    let (_temp, db) = setup_temp_db();

    db.set(b"key", b"value").unwrap();

    assert!(db.has(b"key").unwrap());
}

#[test]
fn test_db_set_overwrite() {
    let (_temp, db) = setup_temp_db();

    db.set(b"key", b"value1").unwrap();
    db.set(b"key", b"value2").unwrap();

    assert_eq!(db.get(b"key").unwrap(), Some(b"value2".to_vec()));
}

#[test]
fn test_db_empty_value_is_stored() {
    let (_temp, db) = setup_temp_db();

    db.set(b"key", b"").unwrap();

    assert_eq!(db.get(b"key").unwrap(), Some(Vec::new()));
    assert!(db.has(b"key").unwrap());
}

#[test]
fn test_db_delete() {
    let (_temp, db) = setup_temp_db();

    db.set(b"key", b"value").unwrap();
    db.delete(b"key").unwrap();

    assert_eq!(db.get(b"key").unwrap(), None);
}

#[test]
fn test_db_delete_nonexistent_key() {
    let (_temp, db) = setup_temp_db();

    // Should not error
    db.delete(b"nonexistent").unwrap();
    db.delete_sync(b"nonexistent").unwrap();

    assert_eq!(db.get(b"nonexistent").unwrap(), None);
}

#[test]
fn test_db_sync_variants() {
    let (_temp, db) = setup_temp_db();

    db.set_sync(b"a", b"1").unwrap();
    db.set_with(b"b", b"2", Durability::Synced).unwrap();
    db.set_with(b"c", b"3", Durability::Buffered).unwrap();

    assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(db.get(b"c").unwrap(), Some(b"3".to_vec()));

    db.delete_sync(b"a").unwrap();
    db.delete_with(b"b", Durability::Buffered).unwrap();

    assert_eq!(db.get(b"a").unwrap(), None);
    assert_eq!(db.get(b"b").unwrap(), None);
}

#[test]
fn test_db_binary_keys_and_values() {
    let (_temp, db) = setup_temp_db();

    let key = [0x00, 0xFF, 0x10, 0x00];
    let value = [0xDE, 0xAD, 0xBE, 0xEF, 0x00];
    db.set(&key, &value).unwrap();

    assert_eq!(db.get(&key).unwrap(), Some(value.to_vec()));
}

#[test]
fn test_db_large_value() {
    let (_temp, db) = setup_temp_db();

    let value = vec![0xAB; 1024 * 1024];
    db.set(b"large", &value).unwrap();

    assert_eq!(db.get(b"large").unwrap(), Some(value));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_db_empty_key_rejected() {
    let (_temp, db) = setup_temp_db();

    assert!(matches!(db.get(b""), Err(KvError::InvalidKey)));
    assert!(matches!(db.has(b""), Err(KvError::InvalidKey)));
    assert!(matches!(db.set(b"", b"value"), Err(KvError::InvalidKey)));
    assert!(matches!(db.set_sync(b"", b"value"), Err(KvError::InvalidKey)));
    assert!(matches!(db.delete(b""), Err(KvError::InvalidKey)));
    assert!(matches!(db.delete_sync(b""), Err(KvError::InvalidKey)));
}

#[test]
fn test_db_rejected_write_has_no_effect() {
    let (_temp, db) = setup_temp_db();

    let _ = db.set(b"", b"value");

    assert_eq!(db.stats().get("redb.num-entries").map(String::as_str), Some("0"));
    assert_eq!(db.iterator(None, None).unwrap().count(), 0);
}

#[test]
fn test_validate_nil_value() {
    assert!(matches!(validate::value(None), Err(KvError::InvalidValue)));
    assert_eq!(validate::value(Some(&b""[..])).unwrap(), b"");
    assert!(KvError::InvalidValue.is_validation());
    assert!(KvError::InvalidKey.is_validation());
    assert!(!KvError::Closed.is_validation());
}

#[test]
fn test_validate_bounds() {
    assert!(validate::bounds(None, None).is_ok());
    assert!(validate::bounds(Some(&b"a"[..]), Some(&b"b"[..])).is_ok());
    assert!(matches!(validate::bounds(Some(&b""[..]), None), Err(KvError::InvalidKey)));
    assert!(matches!(validate::bounds(None, Some(&b""[..])), Err(KvError::InvalidKey)));
}

#[test]
fn test_config_rejects_empty_name() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).name("").build();

    let result = Db::<RedbEngine>::open(config);

    assert!(matches!(result, Err(KvError::Config(_))));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_db_persists_across_reopen() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();

    {
        let db: Db<RedbEngine> = Db::open(test_config(&temp_dir)).unwrap();
        db.set_sync(b"key1", b"value1").unwrap();
        db.set_sync(b"key2", b"value2").unwrap();
        db.delete_sync(b"key1").unwrap();
        db.close().unwrap();
    }

    let db: Db<RedbEngine> = Db::open(test_config(&temp_dir)).unwrap();
    assert_eq!(db.get(b"key1").unwrap(), None);
    assert_eq!(db.get(b"key2").unwrap(), Some(b"value2".to_vec()));
}

#[test]
fn test_db_open_path() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();

    let db: Db<RedbEngine> = Db::open_path(temp_dir.path(), "named").unwrap();
    db.set(b"k", b"v").unwrap();
    db.close().unwrap();

    assert!(temp_dir.path().join("named.db").exists());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_db_operations_after_close() {
    let (_temp, db) = setup_temp_db();
    db.set(b"key", b"value").unwrap();

    db.close().unwrap();

    assert!(db.is_closed());
    assert!(matches!(db.get(b"key"), Err(KvError::Closed)));
    assert!(matches!(db.has(b"key"), Err(KvError::Closed)));
    assert!(matches!(db.set(b"key", b"v"), Err(KvError::Closed)));
    assert!(matches!(db.delete(b"key"), Err(KvError::Closed)));
    assert!(matches!(db.iterator(None, None), Err(KvError::Closed)));
    assert!(matches!(db.reverse_iterator(None, None), Err(KvError::Closed)));
    assert!(matches!(db.dump(&mut Vec::<u8>::new()), Err(KvError::Closed)));
}

#[test]
fn test_db_validation_precedes_closed_check() {
    let (_temp, db) = setup_temp_db();
    db.close().unwrap();

    assert!(matches!(db.get(b""), Err(KvError::InvalidKey)));
}

#[test]
fn test_db_double_close() {
    let (_temp, db) = setup_temp_db();

    db.close().unwrap();

    assert!(matches!(db.close(), Err(KvError::Closed)));
}

#[test]
fn test_db_drop_without_close() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .name("dropped")
        .build();

    let db: Db<RedbEngine> = Db::open(config.clone()).unwrap();
    db.set_sync(b"key", b"value").unwrap();
    // Stops the reporter without waiting for a tick
    drop(db);

    let db: Db<RedbEngine> = Db::open(config).unwrap();
    assert_eq!(db.get(b"key").unwrap(), Some(b"value".to_vec()));
}

// =============================================================================
// Memory Engine Tests
// =============================================================================

#[test]
fn test_memory_db_basic_operations() {
    let db = setup_memory_db();

    db.set(b"a", b"1").unwrap();
    db.set_sync(b"b", b"2").unwrap();
    db.delete(b"a").unwrap();

    assert_eq!(db.get(b"a").unwrap(), None);
    assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(db.engine().entry_count(), 1);
}

#[test]
fn test_memory_db_close() {
    let db = setup_memory_db();
    db.set(b"a", b"1").unwrap();

    db.close().unwrap();

    assert!(matches!(db.get(b"a"), Err(KvError::Closed)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_db_concurrent_writers_and_readers() {
    let (_temp, db) = setup_temp_db();
    let db = Arc::new(db);

    let mut handles = Vec::new();
    for t in 0..4 {
        let db = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let key = format!("t{t}-key{i:03}");
                let value = format!("value{i}");
                db.set(key.as_bytes(), value.as_bytes()).unwrap();
                assert_eq!(db.get(key.as_bytes()).unwrap(), Some(value.into_bytes()));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(db.iterator(None, None).unwrap().count(), 200);
}

#[test]
fn test_memory_db_concurrent_access() {
    let db = Arc::new(setup_memory_db());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("{t}:{i}");
                    db.set(key.as_bytes(), b"x").unwrap();
                    if i % 2 == 0 {
                        db.delete(key.as_bytes()).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(db.engine().entry_count(), 8 * 50);
}
