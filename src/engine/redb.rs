//! On-disk engine backed by `redb`
//!
//! All entries live in one `&[u8] -> &[u8]` table inside `{data_dir}/{name}.db`.
//! Every point write is its own write transaction; a batch is one write
//! transaction, so it commits or aborts as a unit. Cursors hold a read
//! transaction and see the snapshot taken when they were created.

use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ::redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use parking_lot::RwLock;

use crate::config::Config;

use super::{
    backend, BatchOp, CursorGuard, Durability, Engine, EngineCursor, EngineError, KeyRange,
    WriteBatch,
};

type Table<'txn> = ::redb::Table<'txn, &'static [u8], &'static [u8]>;
type ReadTable = ReadOnlyTable<&'static [u8], &'static [u8]>;

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");

const STATS: &str = "redb.stats";
const NUM_ENTRIES: &str = "redb.num-entries";
const TREE_HEIGHT: &str = "redb.tree-height";
const LEAF_PAGES: &str = "redb.leaf-pages";
const BRANCH_PAGES: &str = "redb.branch-pages";
const STORED_BYTES: &str = "redb.stored-bytes";
const METADATA_BYTES: &str = "redb.metadata-bytes";
const FRAGMENTED_BYTES: &str = "redb.fragmented-bytes";
const ALIVE_ITERATORS: &str = "redb.alive-iterators";

/// Engine over a single redb database file
pub struct RedbEngine {
    /// `None` once closed
    db: RwLock<Option<Database>>,
    live_cursors: Arc<AtomicUsize>,
}

impl RedbEngine {
    fn begin_read(&self) -> Result<ReadTransaction, EngineError> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(EngineError::Closed)?;
        db.begin_read().map_err(backend)
    }

    fn begin_write(&self, durability: Durability) -> Result<WriteTransaction, EngineError> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(EngineError::Closed)?;
        let mut txn = db.begin_write().map_err(backend)?;
        txn.set_durability(match durability {
            Durability::Buffered => ::redb::Durability::Eventual,
            Durability::Synced => ::redb::Durability::Immediate,
        });
        Ok(txn)
    }

    fn read_table(&self) -> Result<(ReadTransaction, ReadTable), EngineError> {
        let txn = self.begin_read()?;
        let table = txn.open_table(TABLE).map_err(backend)?;
        Ok((txn, table))
    }

    /// Run `f` against the table inside one write transaction and commit
    fn write_with<F>(&self, durability: Durability, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Table<'_>) -> Result<(), ::redb::StorageError>,
    {
        let txn = self.begin_write(durability)?;
        {
            let mut table = txn.open_table(TABLE).map_err(backend)?;
            // dropping an uncommitted transaction aborts it
            f(&mut table).map_err(backend)?;
        }
        txn.commit().map_err(backend)
    }

    fn summary(&self) -> Result<String, EngineError> {
        let (_txn, table) = self.read_table()?;
        let stats = table.stats().map_err(backend)?;
        let entries = table.len().map_err(backend)?;
        Ok(format!(
            "entries: {}\ntree height: {}\nleaf pages: {}\nbranch pages: {}\n\
             stored bytes: {}\nmetadata bytes: {}\nfragmented bytes: {}\nalive iterators: {}",
            entries,
            stats.tree_height(),
            stats.leaf_pages(),
            stats.branch_pages(),
            stats.stored_bytes(),
            stats.metadata_bytes(),
            stats.fragmented_bytes(),
            self.live_cursors.load(Ordering::Relaxed),
        ))
    }
}

impl Engine for RedbEngine {
    type Error = EngineError;
    type Cursor = RedbCursor;
    type Batch = WriteBatch;

    const PROPERTIES: &'static [&'static str] = &[
        STATS,
        NUM_ENTRIES,
        TREE_HEIGHT,
        LEAF_PAGES,
        BRANCH_PAGES,
        STORED_BYTES,
        METADATA_BYTES,
        FRAGMENTED_BYTES,
        ALIVE_ITERATORS,
    ];
    const SUMMARY_PROPERTY: &'static str = STATS;

    /// Open or create `{data_dir}/{name}.db`
    fn open(config: &Config) -> Result<Self, EngineError> {
        let db = Database::builder()
            .set_cache_size(config.cache_size)
            .create(config.db_path())
            .map_err(backend)?;

        // Make sure the table exists so readers never see TableDoesNotExist
        let txn = db.begin_write().map_err(backend)?;
        txn.open_table(TABLE).map_err(backend)?;
        txn.commit().map_err(backend)?;

        Ok(Self {
            db: RwLock::new(Some(db)),
            live_cursors: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, EngineError> {
        let (_txn, table) = self.read_table()?;
        match table.get(key).map_err(backend)? {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(EngineError::NotFound),
        }
    }

    fn is_not_found(err: &EngineError) -> bool {
        matches!(err, EngineError::NotFound)
    }

    fn put(&self, key: &[u8], value: &[u8], durability: Durability) -> Result<(), EngineError> {
        self.write_with(durability, |table| table.insert(key, value).map(drop))
    }

    fn delete(&self, key: &[u8], durability: Durability) -> Result<(), EngineError> {
        self.write_with(durability, |table| table.remove(key).map(drop))
    }

    fn cursor(&self, range: &KeyRange) -> Result<RedbCursor, EngineError> {
        let (txn, table) = self.read_table()?;
        let bound = |key: &Option<Vec<u8>>, bound: fn(Vec<u8>) -> Bound<Vec<u8>>| {
            key.clone().map_or(Bound::Unbounded, bound)
        };
        Ok(RedbCursor {
            table: (!range.is_empty()).then_some(table),
            lower: bound(&range.start, Bound::Included),
            upper: bound(&range.end, Bound::Excluded),
            _txn: txn,
            _guard: CursorGuard::new(&self.live_cursors),
        })
    }

    fn new_batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    fn write(&self, batch: WriteBatch, durability: Durability) -> Result<(), EngineError> {
        self.write_with(durability, |table| {
            for op in batch.ops() {
                match op {
                    BatchOp::Put { key, value } => {
                        table.insert(key.as_slice(), value.as_slice())?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice())?;
                    }
                }
            }
            Ok(())
        })
    }

    fn property(&self, name: &str) -> Result<String, EngineError> {
        if name == STATS {
            return self.summary();
        }
        if name == ALIVE_ITERATORS {
            // still fails after close, like every other property
            self.begin_read()?;
            return Ok(self.live_cursors.load(Ordering::Relaxed).to_string());
        }

        let (_txn, table) = self.read_table()?;
        if name == NUM_ENTRIES {
            return Ok(table.len().map_err(backend)?.to_string());
        }
        let stats = table.stats().map_err(backend)?;
        let value = match name {
            TREE_HEIGHT => u64::from(stats.tree_height()),
            LEAF_PAGES => stats.leaf_pages(),
            BRANCH_PAGES => stats.branch_pages(),
            STORED_BYTES => stats.stored_bytes(),
            METADATA_BYTES => stats.metadata_bytes(),
            FRAGMENTED_BYTES => stats.fragmented_bytes(),
            other => return Err(EngineError::UnknownProperty(other.to_string())),
        };
        Ok(value.to_string())
    }

    fn close(&self) -> Result<(), EngineError> {
        match self.db.write().take() {
            Some(db) => {
                drop(db);
                Ok(())
            }
            None => Err(EngineError::Closed),
        }
    }
}

/// Cursor over a redb read snapshot
///
/// Each step seeks from the last key returned at that end, so the two ends
/// close in on each other and never cross.
pub struct RedbCursor {
    /// `None` once no key can remain between the bounds
    table: Option<ReadTable>,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    _txn: ReadTransaction,
    _guard: CursorGuard,
}

type Item = Result<(Vec<u8>, Vec<u8>), EngineError>;

fn borrow(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(key) => Bound::Included(key.as_slice()),
        Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn to_entry<'a>(
    item: Result<
        (
            ::redb::AccessGuard<'a, &'static [u8]>,
            ::redb::AccessGuard<'a, &'static [u8]>,
        ),
        ::redb::StorageError,
    >,
) -> Item {
    let (key, value) = item.map_err(backend)?;
    Ok((key.value().to_vec(), value.value().to_vec()))
}

impl RedbCursor {
    fn step(&mut self, back: bool) -> Option<Item> {
        let table = self.table.as_ref()?;
        let item = {
            let bounds = (borrow(&self.lower), borrow(&self.upper));
            match table.range::<&[u8]>(bounds) {
                Ok(mut range) => {
                    let item = if back { range.next_back() } else { range.next() };
                    item.map(to_entry)
                }
                Err(err) => Some(Err(backend(err))),
            }
        };

        match &item {
            Some(Ok((key, _))) => {
                if back {
                    self.upper = Bound::Excluded(key.clone());
                } else {
                    self.lower = Bound::Excluded(key.clone());
                }
                if self.crossed() {
                    self.table = None;
                }
            }
            Some(Err(_)) => {}
            None => self.table = None,
        }
        item
    }

    /// True when no key can satisfy both bounds
    fn crossed(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo) | Bound::Excluded(lo), Bound::Included(hi) | Bound::Excluded(hi)) => {
                lo >= hi
            }
            _ => false,
        }
    }
}

impl EngineCursor for RedbCursor {
    type Error = EngineError;

    fn next(&mut self) -> Option<Item> {
        self.step(false)
    }

    fn next_back(&mut self) -> Option<Item> {
        self.step(true)
    }
}
