//! Engine Module
//!
//! The contract the facade consumes from an embedded ordered engine.
//!
//! ## Responsibilities
//! - Point get/put/delete with a durability choice
//! - Range cursors over `[start, end)` that can be walked from either end
//! - Atomic application of a write batch
//! - Named property strings for diagnostics
//!
//! ## Backends
//! - [`RedbEngine`]: on-disk, backed by `redb`
//! - [`MemoryEngine`]: in-memory BTreeMap, for tests and ephemeral stores

mod memory;
mod redb;

pub use self::memory::{MemoryCursor, MemoryEngine};
pub use self::redb::{RedbCursor, RedbEngine};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::error::BoxError;

/// Whether a write must reach durable storage before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// May be acknowledged before it is durable
    #[default]
    Buffered,

    /// Flushed to the durable medium before returning
    Synced,
}

/// Errors reported by the built-in engines
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found")]
    NotFound,

    #[error("engine is closed")]
    Closed,

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("backend error: {0}")]
    Backend(#[source] BoxError),
}

/// Half-open key range: `start` inclusive, `end` exclusive, `None` unbounded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Option<Vec<u8>>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn new(start: Option<&[u8]>, end: Option<&[u8]>) -> Self {
        Self {
            start: start.map(<[u8]>::to_vec),
            end: end.map(<[u8]>::to_vec),
        }
    }

    /// True when no key can satisfy `start <= key < end`
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => start >= end,
            _ => false,
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = self.start.as_deref().map_or(true, |s| key >= s);
        let before_end = self.end.as_deref().map_or(true, |e| key < e);
        after_start && before_end
    }
}

/// A single pending write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Engine-side accumulator for batched writes
pub trait EngineBatch: Send {
    fn put(&mut self, key: &[u8], value: &[u8]);

    fn delete(&mut self, key: &[u8]);

    /// Number of queued operations
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered list of operations, used by both built-in engines
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

impl EngineBatch for WriteBatch {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    fn delete(&mut self, key: &[u8]) {
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
    }

    fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Cursor over a key range, walkable from the low end, the high end, or both
///
/// Yields entries in ascending order from `next` and descending order from
/// `next_back`. The two ends never cross.
pub trait EngineCursor: Send {
    type Error;

    fn next(&mut self) -> Option<Result<(Vec<u8>, Vec<u8>), Self::Error>>;

    fn next_back(&mut self) -> Option<Result<(Vec<u8>, Vec<u8>), Self::Error>>;
}

/// An embedded, ordered byte-key engine
pub trait Engine: Send + Sync + Sized + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type Cursor: EngineCursor<Error = Self::Error>;
    type Batch: EngineBatch;

    /// Properties sampled by `Db::stats`
    const PROPERTIES: &'static [&'static str];

    /// Multi-line summary printed by `Db::print` and the stats reporter
    const SUMMARY_PROPERTY: &'static str;

    fn open(config: &Config) -> Result<Self, Self::Error>;

    /// Point lookup. A missing key is reported as an error for which
    /// [`Engine::is_not_found`] returns true.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Whether `err` is this engine's not-found signal
    fn is_not_found(err: &Self::Error) -> bool;

    fn put(&self, key: &[u8], value: &[u8], durability: Durability) -> Result<(), Self::Error>;

    fn delete(&self, key: &[u8], durability: Durability) -> Result<(), Self::Error>;

    /// Open a cursor over a point-in-time view of `range`
    fn cursor(&self, range: &KeyRange) -> Result<Self::Cursor, Self::Error>;

    fn new_batch(&self) -> Self::Batch;

    /// Apply every operation in `batch`, in order, or none of them
    fn write(&self, batch: Self::Batch, durability: Durability) -> Result<(), Self::Error>;

    fn property(&self, name: &str) -> Result<String, Self::Error>;

    fn close(&self) -> Result<(), Self::Error>;
}

/// Wrap any backend error
pub(crate) fn backend<E>(err: E) -> EngineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    EngineError::Backend(Box::new(err))
}

/// Counts live cursors for the `*.alive-iterators` properties
#[derive(Debug)]
pub(crate) struct CursorGuard {
    live: Arc<AtomicUsize>,
}

impl CursorGuard {
    pub(crate) fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::Relaxed);
        Self {
            live: Arc::clone(live),
        }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}
