//! In-memory engine
//!
//! BTreeMap-based engine with RwLock for concurrency.
//!
//! ## Data Structure Choice
//! - Ordered keys (required for range cursors)
//! - One RwLock: many concurrent readers, one writer; a batch is applied
//!   under a single write guard, which makes it atomic
//! - Cursors copy their range at creation, which gives snapshot semantics

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;

use super::{
    BatchOp, CursorGuard, Durability, Engine, EngineCursor, EngineError, KeyRange, WriteBatch,
};

const STATS: &str = "memory.stats";
const NUM_ENTRIES: &str = "memory.num-entries";
const APPROXIMATE_SIZE: &str = "memory.approximate-size";
const ALIVE_ITERATORS: &str = "memory.alive-iterators";

/// Entries plus their approximate footprint
#[derive(Default)]
struct Table {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Sum of key and value lengths
    size: usize,
}

impl Table {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let (key_len, value_len) = (key.len(), value.len());
        match self.entries.insert(key, value) {
            // overwrite: the key is already counted
            Some(old) => self.size = self.size - old.len() + value_len,
            None => self.size += key_len + value_len,
        }
    }

    fn remove(&mut self, key: &[u8]) {
        if let Some(old) = self.entries.remove(key) {
            self.size -= key.len() + old.len();
        }
    }
}

/// Ordered in-memory engine
pub struct MemoryEngine {
    table: RwLock<Table>,
    closed: AtomicBool,
    live_cursors: Arc<AtomicUsize>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            closed: AtomicBool::new(false),
            live_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of stored entries
    pub fn entry_count(&self) -> usize {
        self.table.read().entries.len()
    }

    /// Approximate size in bytes (keys plus values)
    pub fn size(&self) -> usize {
        self.table.read().size
    }

    fn check_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    type Error = EngineError;
    type Cursor = MemoryCursor;
    type Batch = WriteBatch;

    const PROPERTIES: &'static [&'static str] =
        &[STATS, NUM_ENTRIES, APPROXIMATE_SIZE, ALIVE_ITERATORS];
    const SUMMARY_PROPERTY: &'static str = STATS;

    fn open(_config: &Config) -> Result<Self, EngineError> {
        Ok(Self::new())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.check_open()?;
        self.table
            .read()
            .entries
            .get(key)
            .cloned()
            .ok_or(EngineError::NotFound)
    }

    fn is_not_found(err: &EngineError) -> bool {
        matches!(err, EngineError::NotFound)
    }

    fn put(&self, key: &[u8], value: &[u8], _durability: Durability) -> Result<(), EngineError> {
        self.check_open()?;
        self.table.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8], _durability: Durability) -> Result<(), EngineError> {
        self.check_open()?;
        self.table.write().remove(key);
        Ok(())
    }

    /// Copies the range under the read lock; writers wait O(n) meanwhile
    fn cursor(&self, range: &KeyRange) -> Result<MemoryCursor, EngineError> {
        self.check_open()?;
        let entries = if range.is_empty() {
            VecDeque::new()
        } else {
            let lower = range.start.as_deref().map_or(Bound::Unbounded, Bound::Included);
            let upper = range.end.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
            self.table
                .read()
                .entries
                .range::<[u8], _>((lower, upper))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        Ok(MemoryCursor {
            entries,
            _guard: CursorGuard::new(&self.live_cursors),
        })
    }

    fn new_batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    fn write(&self, batch: WriteBatch, _durability: Durability) -> Result<(), EngineError> {
        self.check_open()?;
        let mut table = self.table.write();
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => table.insert(key.clone(), value.clone()),
                BatchOp::Delete { key } => table.remove(key),
            }
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Result<String, EngineError> {
        self.check_open()?;
        let (entries, size) = {
            let table = self.table.read();
            (table.entries.len(), table.size)
        };
        let alive = self.live_cursors.load(Ordering::Relaxed);
        match name {
            STATS => Ok(format!(
                "entries: {entries}\napproximate size: {size} bytes\nalive iterators: {alive}"
            )),
            NUM_ENTRIES => Ok(entries.to_string()),
            APPROXIMATE_SIZE => Ok(size.to_string()),
            ALIVE_ITERATORS => Ok(alive.to_string()),
            other => Err(EngineError::UnknownProperty(other.to_string())),
        }
    }

    fn close(&self) -> Result<(), EngineError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(EngineError::Closed);
        }
        let mut table = self.table.write();
        table.entries.clear();
        table.size = 0;
        Ok(())
    }
}

/// Cursor over a copied range of a [`MemoryEngine`]
pub struct MemoryCursor {
    entries: VecDeque<(Vec<u8>, Vec<u8>)>,
    _guard: CursorGuard,
}

impl EngineCursor for MemoryCursor {
    type Error = EngineError;

    fn next(&mut self) -> Option<Result<(Vec<u8>, Vec<u8>), EngineError>> {
        self.entries.pop_front().map(Ok)
    }

    fn next_back(&mut self) -> Option<Result<(Vec<u8>, Vec<u8>), EngineError>> {
        self.entries.pop_back().map(Ok)
    }
}
