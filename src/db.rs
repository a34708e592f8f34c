//! Database handle
//!
//! The facade callers program against. Validates input, forwards to the
//! engine, and normalizes engine errors.
//!
//! ## Error normalization
//! - Empty keys and empty iterator bounds fail with `InvalidKey` before any
//!   engine call
//! - The engine's not-found signal becomes `Ok(None)`
//! - Every other engine error becomes `Storage` with the engine error as its source
//! - Anything after `close()` fails with `Closed`
//!
//! ## Concurrency
//! `Db` is `Send + Sync`; share it with `Arc<Db<E>>`. This layer adds no
//! locking of its own, the engine synchronizes internally.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::batch::Batch;
use crate::config::Config;
use crate::engine::{Durability, Engine, KeyRange};
use crate::error::{KvError, Result};
use crate::iterator::{Direction, RangeIter};
use crate::stats::{self, StatsReporter};
use crate::validate;

/// A key-value store over engine `E`
pub struct Db<E: Engine> {
    name: String,
    path: PathBuf,
    engine: Arc<E>,
    closed: AtomicBool,
    reporter: Mutex<Option<StatsReporter>>,
}

impl<E: Engine> Db<E> {
    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Open the engine at `{data_dir}/{name}.db`
    /// 3. Start the stats reporter, if enabled
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let path = config.db_path();
        tracing::info!(name = %config.name, path = %path.display(), "opening database");

        let engine = E::open(&config).map_err(KvError::storage)?;
        Self::with_engine(engine, config)
    }

    /// Wrap an already opened engine
    pub fn with_engine(engine: E, config: Config) -> Result<Self> {
        config.validate()?;
        let engine = Arc::new(engine);

        let reporter = if config.report_stats {
            Some(StatsReporter::spawn(
                config.name.clone(),
                Arc::clone(&engine),
                config.stats_interval,
            )?)
        } else {
            None
        };

        Ok(Self {
            path: config.db_path(),
            name: config.name,
            engine,
            closed: AtomicBool::new(false),
            reporter: Mutex::new(reporter),
        })
    }

    /// Open with a data directory and name (convenience method)
    ///
    /// Uses default config otherwise.
    pub fn open_path(dir: &Path, name: &str) -> Result<Self> {
        let config = Config::builder().data_dir(dir).name(name).build();
        Self::open(config)
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Get a value by key
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        validate::key(key)?;
        self.check_open()?;
        match self.engine.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if E::is_not_found(&err) => Ok(None),
            Err(err) => Err(KvError::storage(err)),
        }
    }

    /// Check whether a key is present
    pub fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Put a key-value pair, buffered
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.set_with(key, value, Durability::Buffered)
    }

    /// Put a key-value pair and wait until it is durable
    pub fn set_sync(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.set_with(key, value, Durability::Synced)
    }

    /// Put a key-value pair with an explicit durability
    pub fn set_with(&self, key: &[u8], value: &[u8], durability: Durability) -> Result<()> {
        tracing::trace!(
            name = %self.name,
            key = %hex::encode_upper(key),
            value_len = value.len(),
            ?durability,
            "set"
        );
        validate::entry(key, value)?;
        self.check_open()?;
        self.engine
            .put(key, value, durability)
            .map_err(KvError::storage)
    }

    /// Delete a key, buffered. Deleting an absent key is not an error.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.delete_with(key, Durability::Buffered)
    }

    /// Delete a key and wait until the deletion is durable
    pub fn delete_sync(&self, key: &[u8]) -> Result<()> {
        self.delete_with(key, Durability::Synced)
    }

    /// Delete a key with an explicit durability
    pub fn delete_with(&self, key: &[u8], durability: Durability) -> Result<()> {
        validate::key(key)?;
        self.check_open()?;
        self.engine
            .delete(key, durability)
            .map_err(KvError::storage)
    }

    // =========================================================================
    // Batches and Iteration
    // =========================================================================

    /// Start a batch of writes applied atomically on commit
    pub fn new_batch(&self) -> Batch<'_, E> {
        tracing::debug!(name = %self.name, "new batch");
        Batch::new(self.engine.as_ref())
    }

    /// Iterate `[start, end)` in ascending key order
    pub fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<RangeIter<E>> {
        self.range_iter(start, end, Direction::Forward)
    }

    /// Iterate `[start, end)` in descending key order
    pub fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<RangeIter<E>> {
        self.range_iter(start, end, Direction::Reverse)
    }

    /// Iterate `[start, end)` in the given direction
    ///
    /// `None` bounds are unbounded; an empty bound fails with `InvalidKey`.
    pub fn range_iter(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        direction: Direction,
    ) -> Result<RangeIter<E>> {
        validate::bounds(start, end)?;
        self.check_open()?;
        let range = KeyRange::new(start, end);
        let cursor = self.engine.cursor(&range).map_err(KvError::storage)?;
        Ok(RangeIter::new(cursor, range, direction))
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Sample the engine's properties
    ///
    /// Properties that fail to read are left out; this never errors.
    pub fn stats(&self) -> BTreeMap<String, String> {
        stats::collect(&*self.engine)
    }

    /// Dump engine stats and every entry, hex encoded, to stdout
    pub fn print(&self) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.dump(&mut out)
    }

    /// Dump engine stats and every entry, hex encoded, to `out`
    ///
    /// ```text
    /// <summary property>
    /// [6B6579]:	[76616C7565]
    /// ```
    pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
        self.check_open()?;
        stats::dump(&*self.engine, out)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the database
    ///
    /// Stops the stats reporter, then releases the engine. Every later
    /// operation, including a second `close`, fails with `Closed`.
    ///
    /// Release every live [`RangeIter`] first. An iterator that outlives
    /// `close` keeps reading its snapshot, and with the redb engine its read
    /// transaction holds the file lock, so reopening the same path fails
    /// until it is dropped.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(KvError::Closed);
        }
        if let Some(reporter) = self.reporter.lock().take() {
            reporter.stop();
        }
        tracing::info!(name = %self.name, "closing database");
        self.engine.close().map_err(KvError::storage)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(KvError::Closed);
        }
        Ok(())
    }
}
